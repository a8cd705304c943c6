//! Simulation Profiles
//!
//! Concrete schemas driven by the shared [`Engine`](crate::engine::Engine):
//! - **web**: Apache-style request/worker metrics with virtual hosts
//! - **db**: MySQL-style query/thread/buffer-pool metrics with databases

/// Ceiling for request and query rates, from overrides or spikes. Keeps
/// every product and running total finite.
pub const MAX_RATE: f64 = 1e9;

pub mod db;
pub mod web;

pub use db::{DbOverrides, DbServer, DbStatus};
pub use web::{WebOverrides, WebServer, WebStatus};
