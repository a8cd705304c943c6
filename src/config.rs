//! Command-line and environment configuration.

use crate::error::{Result, ServsimError};
use crate::profiles::{MAX_RATE, db, web};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "servsim")]
#[command(about = "Simulated web-server and database-server telemetry endpoints")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, env = "SERVSIM_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate an Apache-style web server
    Web {
        #[command(flatten)]
        args: ServeArgs,
    },
    /// Simulate a MySQL-style database server
    Db {
        #[command(flatten)]
        args: ServeArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "SERVSIM_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on (profile default when omitted)
    #[arg(short, long, env = "SERVSIM_PORT")]
    pub port: Option<u16>,

    /// Initial requests/sec (web) or queries/sec (db)
    #[arg(long, env = "SERVSIM_BASE_RATE")]
    pub base_rate: Option<f64>,

    /// Tick period in milliseconds
    #[arg(long, env = "SERVSIM_TICK_MS", default_value_t = 1000)]
    pub tick_ms: u64,

    /// Partition names (virtual hosts or databases), comma separated
    #[arg(long, env = "SERVSIM_PARTITIONS", value_delimiter = ',')]
    pub partitions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Web,
    Db,
}

impl ProfileKind {
    pub fn default_port(self) -> u16 {
        match self {
            ProfileKind::Web => 8080,
            ProfileKind::Db => 8090,
        }
    }

    pub fn default_base_rate(self) -> f64 {
        match self {
            ProfileKind::Web => 50.0,
            ProfileKind::Db => 200.0,
        }
    }

    pub fn default_partitions(self) -> Vec<String> {
        let names: &[&str] = match self {
            ProfileKind::Web => &web::DEFAULT_VHOSTS,
            ProfileKind::Db => &db::DEFAULT_DATABASES,
        };
        names.iter().map(|s| s.to_string()).collect()
    }
}

/// Resolved server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    pub profile: ProfileKind,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port to listen on (default: 8080 web, 8090 db)
    pub port: u16,
    /// Initial base rate
    pub base_rate: f64,
    /// Tick interval in milliseconds (default: 1000)
    pub tick_interval_ms: u64,
    pub partitions: Vec<String>,
}

impl ApiConfig {
    pub fn defaults(profile: ProfileKind) -> Self {
        Self {
            profile,
            host: "0.0.0.0".to_string(),
            port: profile.default_port(),
            base_rate: profile.default_base_rate(),
            tick_interval_ms: 1000,
            partitions: profile.default_partitions(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl ServeArgs {
    /// Fill profile defaults and validate.
    pub fn resolve(&self, profile: ProfileKind) -> Result<ApiConfig> {
        let defaults = ApiConfig::defaults(profile);

        if self.tick_ms == 0 {
            return Err(ServsimError::InvalidConfig(
                "tick interval must be positive".to_string(),
            ));
        }

        let base_rate = self.base_rate.unwrap_or(defaults.base_rate);
        if !(0.0..=MAX_RATE).contains(&base_rate) {
            return Err(ServsimError::InvalidConfig(format!(
                "base rate must be between 0 and {}, got {}",
                MAX_RATE, base_rate
            )));
        }

        let partitions: Vec<String> = self
            .partitions
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(ApiConfig {
            profile,
            host: self.host.clone(),
            port: self.port.unwrap_or(defaults.port),
            base_rate,
            tick_interval_ms: self.tick_ms,
            partitions: if partitions.is_empty() {
                defaults.partitions
            } else {
                partitions
            },
        })
    }
}

impl Command {
    pub fn resolve(&self) -> Result<ApiConfig> {
        match self {
            Command::Web { args } => args.resolve(ProfileKind::Web),
            Command::Db { args } => args.resolve(ProfileKind::Db),
        }
    }
}
