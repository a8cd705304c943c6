//! Database-server profile
//!
//! MySQL `SHOW GLOBAL STATUS`-shaped metrics: query and transaction
//! rates, thread counts, slow-query and error counters, table cache
//! activity, the InnoDB buffer pool triad and an optional replica lag.

use super::MAX_RATE;
use crate::counters::accumulate;
use crate::engine::{Profile, Sample};
use crate::noise::{Noise, round_to};
use crate::overrides::{Nullable, lenient_f64, lenient_nullable_f64, lenient_u64};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_POOL_SIZE: u64 = 128 * 1024 * 1024;
/// Upper bound for `open_tables` (`table_open_cache`).
pub const TABLE_OPEN_CACHE: u32 = 2000;

const SPIKE_PROBABILITY: f64 = 0.02;
const DROP_PROBABILITY: f64 = 0.01;
const RATE_NOISE: f64 = 0.06;
const POOL_WALK_BYTES: f64 = 50.0 * 1024.0;
const LOCK_DECAY: f64 = 0.995;
const REPLICA_JUMP_PROBABILITY: f64 = 0.02;

pub const DEFAULT_DATABASES: [&str; 3] = ["shop", "analytics", "sessions"];

/// Accumulating counters for one logical database.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseCounters {
    pub queries: f64,
    pub rows_read: f64,
    pub rows_written: f64,
}

/// State of a simulated database server.
#[derive(Debug, Clone)]
pub struct DbServer {
    pub queries_per_sec: f64,
    pub transactions_per_sec: f64,
    pub total_queries: f64,
    pub total_transactions: f64,
    pub threads_connected: u32,
    pub threads_running: u32,
    pub slow_queries: u64,
    pub total_errors: u64,
    pub opened_tables: u64,
    pub open_tables: u32,
    pub table_locks_waited: f64,
    pub innodb_buffer_pool_size_bytes: u64,
    pub innodb_buffer_pool_used_bytes: u64,
    pub innodb_buffer_pool_free_bytes: u64,
    /// `None` means no replica is configured.
    pub replica_lag_seconds: Option<f64>,
    pub uptime_seconds: f64,
    pub databases: BTreeMap<String, DatabaseCounters>,
}

impl DbServer {
    pub fn new(base_rate: f64, databases: &[String]) -> Self {
        let base_rate = base_rate.clamp(0.0, MAX_RATE);
        let connected = (base_rate / 10.0).round() as u32;
        let mut server = Self {
            queries_per_sec: base_rate,
            transactions_per_sec: 0.0,
            total_queries: 0.0,
            total_transactions: 0.0,
            threads_connected: connected,
            threads_running: ((base_rate / 50.0).round() as u32).min(connected),
            slow_queries: 0,
            total_errors: 0,
            opened_tables: 120,
            open_tables: 120,
            table_locks_waited: 0.0,
            innodb_buffer_pool_size_bytes: DEFAULT_POOL_SIZE,
            innodb_buffer_pool_used_bytes: 0,
            innodb_buffer_pool_free_bytes: DEFAULT_POOL_SIZE,
            replica_lag_seconds: None,
            uptime_seconds: 0.0,
            databases: databases
                .iter()
                .map(|name| (name.clone(), DatabaseCounters::default()))
                .collect(),
        };
        server.set_pool_used(DEFAULT_POOL_SIZE / 10 * 6);
        server
    }

    /// Resize the pool. Used bytes are clamped to the new size before free
    /// is recomputed.
    pub fn set_pool_size(&mut self, size: u64) {
        self.innodb_buffer_pool_size_bytes = size;
        self.set_pool_used(self.innodb_buffer_pool_used_bytes);
    }

    pub fn set_pool_used(&mut self, used: u64) {
        let used = used.min(self.innodb_buffer_pool_size_bytes);
        self.innodb_buffer_pool_used_bytes = used;
        self.innodb_buffer_pool_free_bytes = self.innodb_buffer_pool_size_bytes - used;
    }

    fn set_threads(&mut self, connected: u32, running: u32) {
        self.threads_connected = connected;
        self.threads_running = running.min(connected);
    }

    /// Fraction of nominal capacity in use, drives event probabilities.
    fn load(&self) -> f64 {
        (self.queries_per_sec / 1000.0).min(1.0)
    }
}

/// Structured view of [`DbServer`].
#[derive(Debug, Clone, Serialize)]
pub struct DbStatus {
    pub queries_per_sec: f64,
    pub transactions_per_sec: f64,
    pub total_queries: f64,
    pub total_transactions: f64,
    pub threads_connected: u32,
    pub threads_running: u32,
    pub slow_queries: u64,
    pub total_errors: u64,
    pub opened_tables: u64,
    pub open_tables: u32,
    pub table_locks_waited: f64,
    pub innodb_buffer_pool_size_bytes: u64,
    pub innodb_buffer_pool_used_bytes: u64,
    pub innodb_buffer_pool_free_bytes: u64,
    pub replica_lag_seconds: Option<f64>,
    pub uptime_seconds: f64,
    pub databases: BTreeMap<String, DatabaseCounters>,
}

/// Subset returned after a reconfiguration.
#[derive(Debug, Clone, Serialize)]
pub struct DbPreview {
    pub queries_per_sec: f64,
    pub threads_connected: u32,
    pub threads_running: u32,
    pub innodb_buffer_pool_size_bytes: u64,
    pub innodb_buffer_pool_used_bytes: u64,
    pub innodb_buffer_pool_free_bytes: u64,
    pub replica_lag_seconds: Option<f64>,
}

/// Recognized `/admin/set` fields for the database profile.
#[derive(Debug, Default, Deserialize)]
pub struct DbOverrides {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub queries_per_sec: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub threads_connected: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub threads_running: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub open_tables: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub table_locks_waited: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub innodb_buffer_pool_size_bytes: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub innodb_buffer_pool_used_bytes: Option<u64>,
    #[serde(default, deserialize_with = "lenient_nullable_f64")]
    pub replica_lag_seconds: Option<Nullable<f64>>,
}

fn saturate_u32(v: u64) -> u32 {
    v.min(u32::MAX as u64) as u32
}

impl Profile for DbServer {
    type Overrides = DbOverrides;
    type Status = DbStatus;
    type Ack = DbPreview;

    fn name(&self) -> &'static str {
        "db"
    }

    fn step(&mut self, noise: &mut Noise, dt: f64) {
        let sigma = (self.queries_per_sec * RATE_NOISE).max(1.0);
        let mut rate = noise.gauss(self.queries_per_sec, sigma).max(0.0);
        if noise.chance(SPIKE_PROBABILITY) {
            rate *= noise.uniform(1.0, 4.0);
        }
        if noise.chance(DROP_PROBABILITY) {
            rate *= noise.uniform(0.1, 0.5);
        }
        let rate = if rate.is_finite() {
            round_to(rate.min(MAX_RATE), 2)
        } else {
            self.queries_per_sec
        };
        self.queries_per_sec = rate;

        // Re-rolled every tick, not smoothed.
        self.transactions_per_sec = round_to(rate * noise.uniform(0.15, 0.40), 2);

        accumulate(&mut self.total_queries, rate * dt);
        accumulate(&mut self.total_transactions, self.transactions_per_sec * dt);

        let connected = (rate / 10.0 + noise.gauss(0.0, 2.0)).round().max(0.0) as u32;
        let running = (rate / 50.0 + noise.gauss(0.0, 1.0)).round().max(0.0) as u32;
        self.set_threads(connected, running);

        let load = self.load();
        if noise.chance(0.01 + 0.05 * load) {
            self.slow_queries += noise.int(1, 3) as u64;
        }
        if noise.chance(0.002 + 0.01 * load) {
            self.total_errors += noise.int(1, 2) as u64;
        }

        if noise.chance(0.05) {
            self.opened_tables += noise.int(1, 3) as u64;
        }
        if noise.chance(0.05) {
            let next = self.open_tables as i64 + noise.int(-2, 2);
            self.open_tables = next.clamp(0, TABLE_OPEN_CACHE as i64) as u32;
        }

        if noise.chance(0.005) {
            self.table_locks_waited += noise.uniform(1.0, 5.0);
        } else {
            self.table_locks_waited *= LOCK_DECAY;
        }

        let size = self.innodb_buffer_pool_size_bytes as f64;
        let used = (self.innodb_buffer_pool_used_bytes as f64 + noise.gauss(0.0, POOL_WALK_BYTES))
            .clamp(0.0, size)
            .round();
        self.set_pool_used(used as u64);

        if let Some(lag) = self.replica_lag_seconds {
            let next = if noise.chance(REPLICA_JUMP_PROBABILITY) {
                lag + noise.uniform(1.0, 10.0)
            } else {
                (lag * 0.9 + noise.gauss(0.0, 0.1)).max(0.0)
            };
            self.replica_lag_seconds = Some(round_to(next, 3));
        }

        for counters in self.databases.values_mut() {
            let queries = rate * dt * noise.uniform(0.05, 0.5);
            accumulate(&mut counters.queries, queries);
            accumulate(&mut counters.rows_read, queries * noise.uniform(1.0, 20.0));
            accumulate(&mut counters.rows_written, queries * noise.uniform(0.0, 2.0));
        }

        self.uptime_seconds += dt;
    }

    fn status(&self) -> DbStatus {
        DbStatus {
            queries_per_sec: round_to(self.queries_per_sec, 4),
            transactions_per_sec: round_to(self.transactions_per_sec, 4),
            total_queries: round_to(self.total_queries, 3),
            total_transactions: round_to(self.total_transactions, 3),
            threads_connected: self.threads_connected,
            threads_running: self.threads_running,
            slow_queries: self.slow_queries,
            total_errors: self.total_errors,
            opened_tables: self.opened_tables,
            open_tables: self.open_tables,
            table_locks_waited: round_to(self.table_locks_waited, 4),
            innodb_buffer_pool_size_bytes: self.innodb_buffer_pool_size_bytes,
            innodb_buffer_pool_used_bytes: self.innodb_buffer_pool_used_bytes,
            innodb_buffer_pool_free_bytes: self.innodb_buffer_pool_free_bytes,
            replica_lag_seconds: self.replica_lag_seconds.map(|v| round_to(v, 3)),
            uptime_seconds: round_to(self.uptime_seconds, 3),
            databases: self.databases.clone(),
        }
    }

    fn apply(&mut self, overrides: DbOverrides) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Some(rate) = overrides.queries_per_sec.filter(|v| *v >= 0.0) {
            self.queries_per_sec = rate.min(MAX_RATE);
            applied.push("queries_per_sec");
        }
        if let Some(connected) = overrides.threads_connected {
            self.set_threads(saturate_u32(connected), self.threads_running);
            applied.push("threads_connected");
        }
        if let Some(running) = overrides.threads_running {
            self.set_threads(self.threads_connected, saturate_u32(running));
            applied.push("threads_running");
        }
        if let Some(open) = overrides.open_tables {
            self.open_tables = saturate_u32(open).min(TABLE_OPEN_CACHE);
            applied.push("open_tables");
        }
        if let Some(waited) = overrides.table_locks_waited.filter(|v| *v >= 0.0) {
            self.table_locks_waited = waited;
            applied.push("table_locks_waited");
        }
        // Size before used, so a combined update clamps against the new size.
        if let Some(size) = overrides.innodb_buffer_pool_size_bytes {
            self.set_pool_size(size);
            applied.push("innodb_buffer_pool_size_bytes");
        }
        if let Some(used) = overrides.innodb_buffer_pool_used_bytes {
            self.set_pool_used(used);
            applied.push("innodb_buffer_pool_used_bytes");
        }
        match overrides.replica_lag_seconds {
            Some(Nullable::Unset) => {
                self.replica_lag_seconds = None;
                applied.push("replica_lag_seconds");
            }
            Some(Nullable::Set(lag)) if lag >= 0.0 => {
                self.replica_lag_seconds = Some(lag);
                applied.push("replica_lag_seconds");
            }
            _ => {}
        }

        applied
    }

    fn acknowledgement(&self) -> DbPreview {
        DbPreview {
            queries_per_sec: round_to(self.queries_per_sec, 4),
            threads_connected: self.threads_connected,
            threads_running: self.threads_running,
            innodb_buffer_pool_size_bytes: self.innodb_buffer_pool_size_bytes,
            innodb_buffer_pool_used_bytes: self.innodb_buffer_pool_used_bytes,
            innodb_buffer_pool_free_bytes: self.innodb_buffer_pool_free_bytes,
            replica_lag_seconds: self.replica_lag_seconds.map(|v| round_to(v, 3)),
        }
    }

    fn legacy_text(&self) -> Option<String> {
        None
    }

    fn summary(&self) -> String {
        let replica = match self.replica_lag_seconds {
            Some(lag) => format!("{:.3} s behind source", lag),
            None => "not configured".to_string(),
        };
        format!(
            "<html><head><title>MySQL Status</title></head><body>\n\
             <h1>MySQL Server Status (simulated)</h1>\n\
             <p>Uptime: {:.0} seconds</p>\n\
             <p>Queries: {:.0} total, {:.2}/sec - Transactions: {:.2}/sec</p>\n\
             <p>Threads: {} connected, {} running</p>\n\
             <p>Slow queries: {} - Errors: {}</p>\n\
             <p>Open tables: {} (opened {})</p>\n\
             <p>Buffer pool: {} of {} bytes used</p>\n\
             <p>Replica: {}</p>\n\
             </body></html>\n",
            self.uptime_seconds,
            self.total_queries,
            self.queries_per_sec,
            self.transactions_per_sec,
            self.threads_connected,
            self.threads_running,
            self.slow_queries,
            self.total_errors,
            self.open_tables,
            self.opened_tables,
            self.innodb_buffer_pool_used_bytes,
            self.innodb_buffer_pool_size_bytes,
            replica,
        )
    }

    fn samples(&self) -> Vec<Sample> {
        let mut samples = vec![
            Sample::gauge(
                "mysql_fake_queries_per_second",
                "Current simulated query rate",
                self.queries_per_sec,
            ),
            Sample::gauge(
                "mysql_fake_transactions_per_second",
                "Current simulated transaction rate",
                self.transactions_per_sec,
            ),
            Sample::gauge(
                "mysql_fake_threads_connected",
                "Open client connections",
                self.threads_connected as f64,
            ),
            Sample::gauge(
                "mysql_fake_threads_running",
                "Threads executing a statement",
                self.threads_running as f64,
            ),
            Sample::gauge(
                "mysql_fake_open_tables",
                "Tables currently open",
                self.open_tables as f64,
            ),
            Sample::gauge(
                "mysql_fake_table_locks_waited",
                "Recent table lock waits",
                self.table_locks_waited,
            ),
            Sample::gauge(
                "mysql_fake_innodb_buffer_pool_size_bytes",
                "InnoDB buffer pool size",
                self.innodb_buffer_pool_size_bytes as f64,
            ),
            Sample::gauge(
                "mysql_fake_innodb_buffer_pool_used_bytes",
                "InnoDB buffer pool bytes in use",
                self.innodb_buffer_pool_used_bytes as f64,
            ),
            Sample::gauge(
                "mysql_fake_innodb_buffer_pool_free_bytes",
                "InnoDB buffer pool bytes free",
                self.innodb_buffer_pool_free_bytes as f64,
            ),
            Sample::gauge(
                "mysql_fake_uptime_seconds",
                "Simulated server uptime",
                self.uptime_seconds,
            ),
            Sample::counter(
                "mysql_fake_queries_total",
                "Total simulated queries",
                self.total_queries,
            ),
            Sample::counter(
                "mysql_fake_transactions_total",
                "Total simulated transactions",
                self.total_transactions,
            ),
            Sample::counter(
                "mysql_fake_slow_queries_total",
                "Total slow queries",
                self.slow_queries as f64,
            ),
            Sample::counter(
                "mysql_fake_errors_total",
                "Total query errors",
                self.total_errors as f64,
            ),
            Sample::counter(
                "mysql_fake_opened_tables_total",
                "Tables opened since start",
                self.opened_tables as f64,
            ),
        ];

        if let Some(lag) = self.replica_lag_seconds {
            samples.push(Sample::gauge(
                "mysql_fake_replica_lag_seconds",
                "Replication lag behind the source",
                lag,
            ));
        }

        for (database, counters) in &self.databases {
            samples.push(
                Sample::counter(
                    "mysql_fake_database_queries_total",
                    "Queries per database",
                    counters.queries,
                )
                .labeled("database", database.as_str()),
            );
            samples.push(
                Sample::counter(
                    "mysql_fake_database_rows_read_total",
                    "Rows read per database",
                    counters.rows_read,
                )
                .labeled("database", database.as_str()),
            );
            samples.push(
                Sample::counter(
                    "mysql_fake_database_rows_written_total",
                    "Rows written per database",
                    counters.rows_written,
                )
                .labeled("database", database.as_str()),
            );
        }

        samples
    }

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        let size = self.innodb_buffer_pool_size_bytes;
        let used = self.innodb_buffer_pool_used_bytes;
        let free = self.innodb_buffer_pool_free_bytes;
        if used > size || used + free != size {
            out.push(format!("pool used {} + free {} != size {}", used, free, size));
        }
        if self.threads_running > self.threads_connected {
            out.push(format!(
                "threads_running {} > threads_connected {}",
                self.threads_running, self.threads_connected
            ));
        }
        if self.open_tables > TABLE_OPEN_CACHE {
            out.push(format!("open_tables {} above cache", self.open_tables));
        }
        if let Some(lag) = self.replica_lag_seconds {
            if !(lag >= 0.0 && lag.is_finite()) {
                out.push(format!("replica_lag_seconds {} invalid", lag));
            }
        }
        if !(0.0..=MAX_RATE).contains(&self.queries_per_sec) {
            out.push(format!("queries_per_sec {} invalid", self.queries_per_sec));
        }
        out
    }

    fn usage(&self) -> &'static str {
        "Simulated MySQL database server\n\
         \n\
         GET  /api/status     structured JSON status\n\
         GET  /server-status  human-readable status page\n\
         GET  /metrics        prometheus exposition\n\
         POST /admin/set      override queries_per_sec, threads_connected, threads_running,\n\
         \x20                    open_tables, table_locks_waited, innodb_buffer_pool_size_bytes,\n\
         \x20                    innodb_buffer_pool_used_bytes, replica_lag_seconds (null clears)\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> DbServer {
        let databases: Vec<String> = DEFAULT_DATABASES.iter().map(|s| s.to_string()).collect();
        DbServer::new(200.0, &databases)
    }

    #[test]
    fn test_invariants_hold_over_many_ticks() {
        let mut db = server();
        db.replica_lag_seconds = Some(0.5);
        let mut noise = Noise::seeded(42);
        for _ in 0..5_000 {
            db.step(&mut noise, 1.0);
            assert!(db.violations().is_empty(), "{:?}", db.violations());
            assert_eq!(
                db.innodb_buffer_pool_used_bytes + db.innodb_buffer_pool_free_bytes,
                db.innodb_buffer_pool_size_bytes
            );
            assert!(db.threads_running <= db.threads_connected);
            assert!(db.replica_lag_seconds.unwrap() >= 0.0);
        }
    }

    #[test]
    fn test_counters_never_decrease() {
        let mut db = server();
        let mut noise = Noise::seeded(8);
        let mut prev = db.clone();
        for _ in 0..2_000 {
            db.step(&mut noise, 1.0);
            assert!(db.total_queries >= prev.total_queries);
            assert!(db.total_transactions >= prev.total_transactions);
            assert!(db.slow_queries >= prev.slow_queries);
            assert!(db.total_errors >= prev.total_errors);
            assert!(db.opened_tables >= prev.opened_tables);
            for (name, counters) in &db.databases {
                let before = &prev.databases[name];
                assert!(counters.queries >= before.queries);
                assert!(counters.rows_read >= before.rows_read);
                assert!(counters.rows_written >= before.rows_written);
            }
            prev = db.clone();
        }
    }

    #[test]
    fn test_transactions_are_a_fraction_of_queries() {
        let mut db = server();
        let mut noise = Noise::seeded(13);
        for _ in 0..500 {
            db.step(&mut noise, 1.0);
            let q = db.queries_per_sec;
            // Two-decimal rounding can push the ratio a hair past its band.
            assert!(db.transactions_per_sec >= q * 0.15 - 0.01);
            assert!(db.transactions_per_sec <= q * 0.40 + 0.01);
        }
    }

    #[test]
    fn test_pool_size_override_reclamps_used() {
        let mut db = server();
        assert!(db.innodb_buffer_pool_used_bytes > 1024);

        let applied = db.apply(DbOverrides {
            innodb_buffer_pool_size_bytes: Some(1024),
            ..Default::default()
        });
        assert_eq!(applied, vec!["innodb_buffer_pool_size_bytes"]);
        assert_eq!(db.innodb_buffer_pool_used_bytes, 1024);
        assert_eq!(db.innodb_buffer_pool_free_bytes, 0);

        let mut noise = Noise::seeded(4);
        for _ in 0..50 {
            db.step(&mut noise, 1.0);
            assert!(db.innodb_buffer_pool_used_bytes <= 1024);
            assert_eq!(
                db.innodb_buffer_pool_used_bytes + db.innodb_buffer_pool_free_bytes,
                1024
            );
        }
    }

    #[test]
    fn test_combined_pool_override_uses_new_size() {
        let mut db = server();
        db.apply(DbOverrides {
            innodb_buffer_pool_size_bytes: Some(4096),
            innodb_buffer_pool_used_bytes: Some(10_000),
            ..Default::default()
        });
        assert_eq!(db.innodb_buffer_pool_used_bytes, 4096);
        assert_eq!(db.innodb_buffer_pool_free_bytes, 0);
    }

    #[test]
    fn test_replica_lag_round_trip() {
        let mut db = server();
        let mut noise = Noise::seeded(21);
        db.step(&mut noise, 1.0);
        assert_eq!(db.replica_lag_seconds, None);

        db.apply(DbOverrides {
            replica_lag_seconds: Some(Nullable::Set(5.0)),
            ..Default::default()
        });
        db.step(&mut noise, 1.0);
        assert!(db.replica_lag_seconds.is_some());

        db.apply(DbOverrides {
            replica_lag_seconds: Some(Nullable::Unset),
            ..Default::default()
        });
        for _ in 0..20 {
            db.step(&mut noise, 1.0);
            assert_eq!(db.replica_lag_seconds, None);
        }
        assert!(
            !db.samples()
                .iter()
                .any(|s| s.name == "mysql_fake_replica_lag_seconds")
        );
    }

    #[test]
    fn test_huge_rate_override_keeps_counters_finite() {
        let mut db = server();
        db.apply(DbOverrides {
            queries_per_sec: Some(1e308),
            ..Default::default()
        });
        assert_eq!(db.queries_per_sec, MAX_RATE);

        let mut noise = Noise::seeded(23);
        let mut prev = db.clone();
        for _ in 0..200 {
            db.step(&mut noise, 1.0);
            assert!(db.violations().is_empty(), "{:?}", db.violations());
            assert!(db.total_queries.is_finite());
            assert!(db.total_transactions.is_finite());
            assert!(db.total_queries > prev.total_queries);
            for counters in db.databases.values() {
                assert!(counters.rows_read.is_finite());
                assert!(counters.rows_written.is_finite());
            }
            prev = db.clone();
        }
    }

    #[test]
    fn test_negative_replica_lag_is_ignored() {
        let mut db = server();
        let applied = db.apply(DbOverrides {
            replica_lag_seconds: Some(Nullable::Set(-1.0)),
            ..Default::default()
        });
        assert!(applied.is_empty());
        assert_eq!(db.replica_lag_seconds, None);
    }

    #[test]
    fn test_thread_overrides_keep_running_below_connected() {
        let mut db = server();
        db.apply(DbOverrides {
            threads_connected: Some(4),
            threads_running: Some(9),
            ..Default::default()
        });
        assert_eq!(db.threads_connected, 4);
        assert_eq!(db.threads_running, 4);
    }

    #[test]
    fn test_lock_waits_decay() {
        let mut db = server();
        db.table_locks_waited = 100.0;
        let mut noise = Noise::seeded(2);
        for _ in 0..200 {
            db.step(&mut noise, 1.0);
        }
        assert!(db.table_locks_waited < 100.0);
    }

    #[test]
    fn test_no_legacy_format() {
        assert!(server().legacy_text().is_none());
    }
}
