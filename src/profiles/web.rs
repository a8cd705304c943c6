//! Web-server profile
//!
//! Apache `mod_status`-shaped metrics: request rate, throughput, a worker
//! pool split into busy and idle slots, CPU load, an error counter and a
//! scoreboard string, plus per-virtual-host access counters.

use super::MAX_RATE;
use crate::counters::accumulate;
use crate::engine::{Profile, Sample};
use crate::noise::{Noise, round_to};
use crate::overrides::{lenient_f64, lenient_u64};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed size of the worker pool.
pub const TOTAL_WORKERS: u32 = 100;

/// Per-request payload size range, bytes.
const REQUEST_BYTES: (f64, f64) = (500.0, 5000.0);

const SPIKE_PROBABILITY: f64 = 0.02;
const DROP_PROBABILITY: f64 = 0.01;
const RATE_NOISE: f64 = 0.07;
const CPU_BOUNDS: (f64, f64) = (0.01, 0.99);
const WORKER_SMOOTHING: f64 = 0.2;
const ERROR_DECAY: f64 = 0.995;

/// Worker states drawn for the scoreboard, waiting dominant.
const SCOREBOARD_WEIGHTS: [(char, f64); 6] = [
    ('_', 0.70), // waiting for connection
    ('W', 0.10), // sending reply
    ('K', 0.10), // keep-alive
    ('R', 0.05), // reading request
    ('L', 0.03), // logging
    ('G', 0.02), // gracefully finishing
];

pub const DEFAULT_VHOSTS: [&str; 3] = ["www.example.com", "api.example.com", "static.example.com"];

/// Accumulating counters for one virtual host.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VhostCounters {
    pub accesses: f64,
    pub kbytes: f64,
}

/// State of a simulated web server.
#[derive(Debug, Clone)]
pub struct WebServer {
    pub req_per_sec: f64,
    pub bytes_per_sec: f64,
    pub bytes_per_req: f64,
    pub total_accesses: f64,
    pub total_kbytes: f64,
    pub cpu_load: f64,
    pub busy_workers: u32,
    pub idle_workers: u32,
    pub total_errors: u64,
    pub recent_error_rate: f64,
    pub uptime_seconds: f64,
    pub scoreboard: String,
    pub vhosts: BTreeMap<String, VhostCounters>,
}

impl WebServer {
    pub fn new(base_rate: f64, vhosts: &[String]) -> Self {
        let base_rate = base_rate.clamp(0.0, MAX_RATE);
        let mut server = Self {
            req_per_sec: base_rate,
            bytes_per_sec: 0.0,
            bytes_per_req: 0.0,
            total_accesses: 0.0,
            total_kbytes: 0.0,
            cpu_load: 0.15,
            busy_workers: 1,
            idle_workers: TOTAL_WORKERS - 1,
            total_errors: 0,
            recent_error_rate: 0.0,
            uptime_seconds: 0.0,
            scoreboard: "_".repeat(TOTAL_WORKERS as usize),
            vhosts: vhosts
                .iter()
                .map(|name| (name.clone(), VhostCounters::default()))
                .collect(),
        };
        server.set_busy_workers(ideal_workers(base_rate));
        server
    }

    /// Set the busy pool and recompute idle in the same update.
    fn set_busy_workers(&mut self, busy: f64) {
        let busy = busy.round().clamp(1.0, TOTAL_WORKERS as f64) as u32;
        self.busy_workers = busy;
        self.idle_workers = TOTAL_WORKERS - busy;
    }

    fn scoreboard_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (symbol, _) in SCOREBOARD_WEIGHTS {
            let n = self.scoreboard.chars().filter(|c| *c == symbol).count();
            counts.insert(scoreboard_state(symbol), n);
        }
        counts
    }
}

fn ideal_workers(rate: f64) -> f64 {
    (rate / 2.0).clamp(1.0, TOTAL_WORKERS as f64)
}

fn scoreboard_state(symbol: char) -> &'static str {
    match symbol {
        '_' => "waiting",
        'W' => "sending",
        'K' => "keepalive",
        'R' => "reading",
        'L' => "logging",
        'G' => "finishing",
        _ => "unknown",
    }
}

/// Structured view of [`WebServer`].
#[derive(Debug, Clone, Serialize)]
pub struct WebStatus {
    pub req_per_sec: f64,
    pub bytes_per_sec: f64,
    pub bytes_per_req: f64,
    pub total_accesses: f64,
    pub total_kbytes: f64,
    pub cpu_load: f64,
    pub busy_workers: u32,
    pub idle_workers: u32,
    pub total_workers: u32,
    pub total_errors: u64,
    pub recent_error_rate: f64,
    pub uptime_seconds: f64,
    pub scoreboard: String,
    pub vhosts: BTreeMap<String, VhostCounters>,
}

/// Recognized `/admin/set` fields for the web profile.
#[derive(Debug, Default, Deserialize)]
pub struct WebOverrides {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub req_per_sec: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpu_load: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub busy_workers: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub recent_error_rate: Option<f64>,
}

impl Profile for WebServer {
    type Overrides = WebOverrides;
    type Status = WebStatus;
    type Ack = WebStatus;

    fn name(&self) -> &'static str {
        "web"
    }

    fn step(&mut self, noise: &mut Noise, dt: f64) {
        // Request rate: noisy walk, then rare spikes and drops.
        let sigma = (self.req_per_sec * RATE_NOISE).max(1.0);
        let mut rate = noise.gauss(self.req_per_sec, sigma).max(0.0);
        if noise.chance(SPIKE_PROBABILITY) {
            rate *= noise.uniform(1.0, 4.0);
        }
        if noise.chance(DROP_PROBABILITY) {
            rate *= noise.uniform(0.1, 0.9);
        }
        // A non-finite draw keeps the previous rate.
        let rate = if rate.is_finite() {
            round_to(rate.min(MAX_RATE), 2)
        } else {
            self.req_per_sec
        };
        self.req_per_sec = rate;

        self.bytes_per_req = noise.uniform(REQUEST_BYTES.0, REQUEST_BYTES.1);
        self.bytes_per_sec = rate * self.bytes_per_req;

        accumulate(&mut self.total_accesses, rate * dt);
        accumulate(&mut self.total_kbytes, self.bytes_per_sec * dt / 1024.0);

        self.cpu_load = (self.cpu_load + noise.gauss(0.0, 0.01)).clamp(CPU_BOUNDS.0, CPU_BOUNDS.1);

        let busy = self.busy_workers as f64;
        let eased = busy + WORKER_SMOOTHING * (ideal_workers(rate) - busy) + noise.gauss(0.0, 1.0);
        self.set_busy_workers(eased);

        let error_probability = 0.0008 + self.cpu_load * 0.002;
        if noise.chance(error_probability) {
            let n = noise.int(1, 3) as u64;
            self.total_errors += n;
            self.recent_error_rate += 0.01 * n as f64;
        } else {
            self.recent_error_rate *= ERROR_DECAY;
        }

        // Illustrative split; vhosts do not have to add up to the total.
        let bytes_per_req = self.bytes_per_req;
        for counters in self.vhosts.values_mut() {
            let accesses = rate * dt * noise.uniform(0.1, 0.6);
            accumulate(&mut counters.accesses, accesses);
            accumulate(&mut counters.kbytes, accesses * bytes_per_req / 1024.0);
        }

        self.scoreboard = (0..TOTAL_WORKERS)
            .map(|_| noise.pick(&SCOREBOARD_WEIGHTS))
            .collect();

        self.uptime_seconds += dt;
    }

    fn status(&self) -> WebStatus {
        WebStatus {
            req_per_sec: round_to(self.req_per_sec, 4),
            bytes_per_sec: round_to(self.bytes_per_sec, 3),
            bytes_per_req: round_to(self.bytes_per_req, 3),
            total_accesses: round_to(self.total_accesses, 3),
            total_kbytes: round_to(self.total_kbytes, 3),
            cpu_load: round_to(self.cpu_load, 4),
            busy_workers: self.busy_workers,
            idle_workers: self.idle_workers,
            total_workers: TOTAL_WORKERS,
            total_errors: self.total_errors,
            recent_error_rate: round_to(self.recent_error_rate, 4),
            uptime_seconds: round_to(self.uptime_seconds, 3),
            scoreboard: self.scoreboard.clone(),
            vhosts: self.vhosts.clone(),
        }
    }

    fn apply(&mut self, overrides: WebOverrides) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Some(rate) = overrides.req_per_sec.filter(|v| *v >= 0.0) {
            self.req_per_sec = rate.min(MAX_RATE);
            applied.push("req_per_sec");
        }
        if let Some(load) = overrides.cpu_load {
            self.cpu_load = load.clamp(CPU_BOUNDS.0, CPU_BOUNDS.1);
            applied.push("cpu_load");
        }
        if let Some(busy) = overrides.busy_workers {
            self.set_busy_workers(busy as f64);
            applied.push("busy_workers");
        }
        if let Some(rate) = overrides.recent_error_rate.filter(|v| *v >= 0.0) {
            self.recent_error_rate = rate;
            applied.push("recent_error_rate");
        }

        applied
    }

    fn acknowledgement(&self) -> WebStatus {
        self.status()
    }

    fn legacy_text(&self) -> Option<String> {
        let lines = [
            format!("Total Accesses: {}", self.total_accesses.floor() as u64),
            format!("Total kBytes: {}", self.total_kbytes.floor() as u64),
            format!("CPULoad: {:.4}", self.cpu_load),
            format!("Uptime: {}", self.uptime_seconds.floor() as u64),
            format!("ReqPerSec: {:.2}", self.req_per_sec),
            format!("BytesPerSec: {:.2}", self.bytes_per_sec),
            format!("BytesPerReq: {:.2}", self.bytes_per_req),
            format!("BusyWorkers: {}", self.busy_workers),
            format!("IdleWorkers: {}", self.idle_workers),
            format!("Scoreboard: {}", self.scoreboard),
        ];
        Some(lines.join("\n") + "\n")
    }

    fn summary(&self) -> String {
        format!(
            "<html><head><title>Apache Status</title></head><body>\n\
             <h1>Apache Server Status (simulated)</h1>\n\
             <p>Server uptime: {:.0} seconds</p>\n\
             <p>Total accesses: {:.0} - Total traffic: {:.1} kB</p>\n\
             <p>CPU load: {:.2}%</p>\n\
             <p>{:.2} requests/sec - {:.1} B/second - {:.1} B/request</p>\n\
             <p>{} requests currently being processed, {} idle workers</p>\n\
             <pre>{}</pre>\n\
             </body></html>\n",
            self.uptime_seconds,
            self.total_accesses,
            self.total_kbytes,
            self.cpu_load * 100.0,
            self.req_per_sec,
            self.bytes_per_sec,
            self.bytes_per_req,
            self.busy_workers,
            self.idle_workers,
            self.scoreboard,
        )
    }

    fn samples(&self) -> Vec<Sample> {
        let mut samples = vec![
            Sample::gauge(
                "apache_fake_requests_per_second",
                "Current simulated request rate",
                self.req_per_sec,
            ),
            Sample::gauge(
                "apache_fake_bytes_per_second",
                "Current simulated throughput in bytes",
                self.bytes_per_sec,
            ),
            Sample::gauge(
                "apache_fake_bytes_per_request",
                "Average response size of the last tick",
                self.bytes_per_req,
            ),
            Sample::gauge("apache_fake_cpu_load", "CPU load fraction", self.cpu_load),
            Sample::gauge(
                "apache_fake_busy_workers",
                "Workers serving requests",
                self.busy_workers as f64,
            ),
            Sample::gauge(
                "apache_fake_idle_workers",
                "Idle workers",
                self.idle_workers as f64,
            ),
            Sample::gauge(
                "apache_fake_recent_error_rate",
                "Smoothed recent error rate",
                self.recent_error_rate,
            ),
            Sample::gauge(
                "apache_fake_uptime_seconds",
                "Simulated server uptime",
                self.uptime_seconds,
            ),
            Sample::counter(
                "apache_fake_accesses_total",
                "Total simulated accesses",
                self.total_accesses,
            ),
            Sample::counter(
                "apache_fake_kbytes_total",
                "Total simulated kilobytes served",
                self.total_kbytes,
            ),
            Sample::counter(
                "apache_fake_errors_total",
                "Total simulated errors",
                self.total_errors as f64,
            ),
        ];

        for (state, count) in self.scoreboard_counts() {
            samples.push(
                Sample::gauge(
                    "apache_fake_scoreboard",
                    "Workers per scoreboard state",
                    count as f64,
                )
                .labeled("state", state),
            );
        }

        for (vhost, counters) in &self.vhosts {
            samples.push(
                Sample::counter(
                    "apache_fake_vhost_accesses_total",
                    "Accesses per virtual host",
                    counters.accesses,
                )
                .labeled("vhost", vhost.as_str()),
            );
            samples.push(
                Sample::counter(
                    "apache_fake_vhost_kbytes_total",
                    "Kilobytes served per virtual host",
                    counters.kbytes,
                )
                .labeled("vhost", vhost.as_str()),
            );
        }

        samples
    }

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.busy_workers + self.idle_workers != TOTAL_WORKERS {
            out.push(format!(
                "busy {} + idle {} != {}",
                self.busy_workers, self.idle_workers, TOTAL_WORKERS
            ));
        }
        if !(CPU_BOUNDS.0..=CPU_BOUNDS.1).contains(&self.cpu_load) {
            out.push(format!("cpu_load {} out of bounds", self.cpu_load));
        }
        if !(0.0..=MAX_RATE).contains(&self.req_per_sec) {
            out.push(format!("req_per_sec {} is not a valid rate", self.req_per_sec));
        }
        if self.scoreboard.chars().count() != TOTAL_WORKERS as usize {
            out.push(format!(
                "scoreboard length {} != {}",
                self.scoreboard.chars().count(),
                TOTAL_WORKERS
            ));
        }
        out
    }

    fn usage(&self) -> &'static str {
        "Simulated Apache web server\n\
         \n\
         GET  /api/status          structured JSON status\n\
         GET  /server-status?auto  mod_status machine-readable text\n\
         GET  /server-status       human-readable status page\n\
         GET  /metrics             prometheus exposition\n\
         POST /admin/set           override req_per_sec, cpu_load, busy_workers, recent_error_rate\n"
    }
}
