//! # servsim - Stochastic Server Telemetry Simulator
//!
//! Mocks the operational telemetry of a running web server or database
//! server so scraping, monitoring and dashboard pipelines can be exercised
//! without a real backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            servsim                               │
//! │                                                                  │
//! │   ┌──────────┐   every tick    ┌──────────────────────────────┐  │
//! │   │  Ticker  │ ──────────────► │         Engine<P>            │  │
//! │   └──────────┘                 │  Profile state + Noise       │  │
//! │                                └──────────────────────────────┘  │
//! │                                   ▲            │                 │
//! │                    /admin/set     │            │ read-only       │
//! │                    (overrides) ───┘            ▼                 │
//! │                                ┌──────────────────────────────┐  │
//! │                                │  /api/status   JSON          │  │
//! │                                │  /server-status text / html  │  │
//! │                                │  /metrics      prometheus    │  │
//! │                                └──────────────────────────────┘  │
//! │                                                                  │
//! │   Profiles:                                                      │
//! │   ├── web (Apache-style workers, vhosts, scoreboard)             │
//! │   └── db  (MySQL-style threads, buffer pool, replica lag)        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use servsim::{Engine, Profile, WebServer};
//! use std::time::Duration;
//!
//! let vhosts = vec!["www.example.com".to_string()];
//! let mut engine = Engine::new(WebServer::new(50.0, &vhosts), Duration::from_secs(1));
//! engine.tick().unwrap();
//! println!("{}", engine.profile().legacy_text().unwrap());
//! ```

pub mod api;
pub mod config;
pub mod counters;
pub mod engine;
pub mod error;
pub mod exporter;
pub mod noise;
pub mod overrides;
pub mod profiles;
pub mod scheduler;

pub use api::{AppState, router, serve};
pub use config::{ApiConfig, Cli, ProfileKind};
pub use engine::{Engine, Profile, Sample, SampleKind, SharedEngine, StatusEnvelope};
pub use error::{Result, ServsimError};
pub use exporter::MetricsExporter;
pub use noise::Noise;
pub use profiles::{DbServer, WebServer};
pub use scheduler::Ticker;
