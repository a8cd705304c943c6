//! Tick Scheduler
//!
//! Drives [`Engine::tick`](crate::engine::Engine::tick) on a fixed period
//! from a dedicated task, independent of request traffic. Late ticks are
//! delayed, never bunched up, and a step is never re-entered because it
//! runs to completion under the engine lock.

use crate::engine::{Profile, SharedEngine};
use crate::error::Result;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info, trace};

/// Handle to a running tick loop.
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Start ticking `engine` every `period`. The first scheduled step
    /// fires one period from now; call [`prime`] beforehand so the state is
    /// already populated.
    pub fn spawn<P: Profile>(engine: SharedEngine<P>, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                run_step(&engine);
            }
        });

        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
        info!("Tick loop stopped.");
    }
}

/// Run the first step synchronously, before any request can be served.
pub fn prime<P: Profile>(engine: &SharedEngine<P>) -> Result<()> {
    let mut engine = engine.lock();
    engine.tick()?;
    info!(
        profile = engine.profile().name(),
        "Initial simulation step complete."
    );
    Ok(())
}

fn run_step<P: Profile>(engine: &SharedEngine<P>) {
    let mut engine = engine.lock();
    match engine.tick() {
        Ok(()) => trace!(tick = engine.stats().tick_count, "tick"),
        Err(e) => error!(
            profile = engine.profile().name(),
            failed_ticks = engine.stats().failed_ticks,
            error = %e,
            "Simulation step failed; previous state kept."
        ),
    }
}
