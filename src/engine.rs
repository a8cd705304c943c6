//! Simulation Engine
//!
//! Owns the single mutable record of metric values for one profile and
//! advances it one step per tick. Everything that reads or writes the
//! state goes through an [`Engine`] handle.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Engine<P>                          │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐ │
//! │  │   Profile   │  │    Noise    │  │   EngineStats   │ │
//! │  │  (schema)   │──│  (uniform → │──│  (ticks, faults)│ │
//! │  │             │  │   normal)   │  │                 │ │
//! │  └─────────────┘  └─────────────┘  └─────────────────┘ │
//! │         │                                               │
//! │         ├──► status()   structured view                 │
//! │         ├──► samples()  pull-metrics view               │
//! │         └──► apply()    reconfiguration                 │
//! └─────────────────────────────────────────────────────────┘
//! ```

use crate::error::{Result, ServsimError};
use crate::noise::Noise;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Whether a sample is a point-in-time value or a monotonic total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Gauge,
    Counter,
}

/// One numeric reading handed to the pull-metrics exporter.
#[derive(Debug, Clone)]
pub struct Sample {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: SampleKind,
    /// Partition label as `(label name, label value)`.
    pub label: Option<(&'static str, String)>,
    pub value: f64,
}

impl Sample {
    pub fn gauge(name: &'static str, help: &'static str, value: f64) -> Self {
        Self {
            name,
            help,
            kind: SampleKind::Gauge,
            label: None,
            value,
        }
    }

    pub fn counter(name: &'static str, help: &'static str, value: f64) -> Self {
        Self {
            name,
            help,
            kind: SampleKind::Counter,
            label: None,
            value,
        }
    }

    pub fn labeled(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.label = Some((key, value.into()));
        self
    }
}

/// A metric schema plus its per-tick update rule.
///
/// Implementations hold their own state; the engine clones it before each
/// step so a failed step can be rolled back.
pub trait Profile: Clone + Send + 'static {
    /// Partial record of recognized override fields.
    type Overrides: DeserializeOwned + Default + Send;
    /// Structured view.
    type Status: Serialize + Send;
    /// Payload returned after a reconfiguration.
    type Ack: Serialize + Send;

    /// Short profile name (`web`, `db`).
    fn name(&self) -> &'static str;

    /// Advance the state by one tick of `dt` seconds.
    fn step(&mut self, noise: &mut Noise, dt: f64);

    fn status(&self) -> Self::Status;

    /// Apply overrides and return the names of the fields that changed.
    fn apply(&mut self, overrides: Self::Overrides) -> Vec<&'static str>;

    fn acknowledgement(&self) -> Self::Ack;

    /// `Key: value` machine-readable status, if the profile has one.
    fn legacy_text(&self) -> Option<String>;

    /// Human-readable status page.
    fn summary(&self) -> String;

    fn samples(&self) -> Vec<Sample>;

    /// Descriptions of any broken invariants. Empty when consistent.
    fn violations(&self) -> Vec<String>;

    /// Static text served at `/`.
    fn usage(&self) -> &'static str;
}

/// Structured view plus engine bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEnvelope<S> {
    pub profile: &'static str,
    pub tick: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub failed_ticks: u64,
    pub reconfigurations: u64,
    #[serde(flatten)]
    pub status: S,
}

/// Engine statistics
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub tick_count: u64,
    pub failed_ticks: u64,
    pub reconfigurations: u64,
}

/// Owner of one profile's state.
pub struct Engine<P: Profile> {
    profile: P,
    noise: Noise,
    /// Tick period in seconds.
    dt: f64,
    last_tick_at: Option<DateTime<Utc>>,
    stats: EngineStats,
}

/// Thread-safe handle to an engine. Every read-modify-write happens under
/// this one lock so paired fields are never observed half-updated.
pub type SharedEngine<P> = Arc<Mutex<Engine<P>>>;

impl<P: Profile> Engine<P> {
    pub fn new(profile: P, tick_period: Duration) -> Self {
        Self::with_noise(profile, tick_period, Noise::from_entropy())
    }

    pub fn with_noise(profile: P, tick_period: Duration, noise: Noise) -> Self {
        Self {
            profile,
            noise,
            dt: tick_period.as_secs_f64(),
            last_tick_at: None,
            stats: EngineStats::default(),
        }
    }

    pub fn into_shared(self) -> SharedEngine<P> {
        Arc::new(Mutex::new(self))
    }

    /// Run one simulation step.
    ///
    /// A panicking step leaves the state exactly as it was before the call
    /// and is reported as [`ServsimError::StepPanicked`].
    pub fn tick(&mut self) -> Result<()> {
        let before = self.profile.clone();
        let dt = self.dt;

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.profile.step(&mut self.noise, dt)));

        match outcome {
            Ok(()) => {
                self.stats.tick_count += 1;
                self.last_tick_at = Some(Utc::now());
                self.report_violations("tick");
                Ok(())
            }
            Err(payload) => {
                self.profile = before;
                self.stats.failed_ticks += 1;
                Err(ServsimError::StepPanicked(panic_message(payload.as_ref())))
            }
        }
    }

    /// Apply a reconfiguration between ticks.
    pub fn apply(&mut self, overrides: P::Overrides) -> Vec<&'static str> {
        let applied = self.profile.apply(overrides);
        if !applied.is_empty() {
            self.stats.reconfigurations += 1;
        }
        self.report_violations("reconfiguration");
        applied
    }

    pub fn status(&self) -> StatusEnvelope<P::Status> {
        StatusEnvelope {
            profile: self.profile.name(),
            tick: self.stats.tick_count,
            last_tick_at: self.last_tick_at,
            failed_ticks: self.stats.failed_ticks,
            reconfigurations: self.stats.reconfigurations,
            status: self.profile.status(),
        }
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    fn report_violations(&self, phase: &'static str) {
        for violation in self.profile.violations() {
            warn!(
                profile = self.profile.name(),
                phase,
                tick = self.stats.tick_count,
                "invariant violated: {}",
                violation
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
