//! HTTP API
//!
//! Exposes one profile's engine over HTTP:
//! - `GET  /`               usage text
//! - `GET  /api/status`     structured JSON view
//! - `GET  /server-status`  legacy `?auto` text or summary page
//! - `GET  /metrics`        prometheus exposition
//! - `POST /admin/set`      field overrides

use crate::config::ApiConfig;
use crate::engine::{Engine, Profile, SharedEngine, StatusEnvelope};
use crate::error::Result;
use crate::exporter::MetricsExporter;
use crate::overrides::parse_body;
use crate::scheduler::{self, Ticker};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{RawQuery, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Application state shared by every handler.
pub struct AppState<P: Profile> {
    pub engine: SharedEngine<P>,
    pub exporter: Arc<Mutex<MetricsExporter>>,
}

impl<P: Profile> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            exporter: self.exporter.clone(),
        }
    }
}

impl<P: Profile> AppState<P> {
    pub fn new(engine: SharedEngine<P>) -> Result<Self> {
        Ok(Self {
            engine,
            exporter: Arc::new(Mutex::new(MetricsExporter::new()?)),
        })
    }

    /// Snapshot the engine and render it as one unit.
    ///
    /// Lock order is exporter, then engine. Holding the exporter across the
    /// snapshot keeps concurrent scrapes from folding in older samples
    /// after newer ones.
    pub fn scrape(&self) -> Result<String> {
        let mut exporter = self.exporter.lock();
        let samples = self.engine.lock().profile().samples();
        exporter.render(&samples)
    }
}

/// Response to `POST /admin/set`.
#[derive(Debug, Clone, Serialize)]
pub struct AdminAck<A> {
    pub status: &'static str,
    pub applied: Vec<&'static str>,
    pub state: A,
}

pub fn router<P: Profile>(state: AppState<P>) -> Router {
    Router::new()
        .route("/", get(usage_handler::<P>))
        .route("/api/status", get(status_handler::<P>))
        .route("/server-status", get(server_status_handler::<P>))
        .route("/metrics", get(metrics_handler::<P>))
        .route("/admin/set", post(admin_set_handler::<P>))
        .with_state(state)
}

/// API routes definition for documentation/logging
pub fn api_routes() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        ("GET", "/", "Usage text"),
        ("GET", "/api/status", "Structured JSON status"),
        ("GET", "/server-status", "Status page (?auto for key: value text)"),
        ("GET", "/metrics", "Prometheus metrics"),
        ("POST", "/admin/set", "Override simulation fields"),
    ]
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn usage_handler<P: Profile>(State(state): State<AppState<P>>) -> &'static str {
    state.engine.lock().profile().usage()
}

async fn status_handler<P: Profile>(
    State(state): State<AppState<P>>,
) -> Json<StatusEnvelope<P::Status>> {
    Json(state.engine.lock().status())
}

async fn server_status_handler<P: Profile>(
    State(state): State<AppState<P>>,
    RawQuery(query): RawQuery,
) -> Response {
    let engine = state.engine.lock();
    let profile = engine.profile();

    if wants_auto(query.as_deref()) {
        if let Some(text) = profile.legacy_text() {
            return ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], text).into_response();
        }
    }
    Html(profile.summary()).into_response()
}

async fn metrics_handler<P: Profile>(State(state): State<AppState<P>>) -> Response {
    match state.scrape() {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Metrics export failed.");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn admin_set_handler<P: Profile>(
    State(state): State<AppState<P>>,
    body: Bytes,
) -> Json<AdminAck<P::Ack>> {
    let overrides: P::Overrides = parse_body(&body);

    let mut engine = state.engine.lock();
    let applied = engine.apply(overrides);
    info!(
        profile = engine.profile().name(),
        applied = ?applied,
        "Applied overrides."
    );

    Json(AdminAck {
        status: "ok",
        applied,
        state: engine.profile().acknowledgement(),
    })
}

/// `?auto`, `?auto=1` and `?x&auto` all select the legacy format.
fn wants_auto(query: Option<&str>) -> bool {
    query
        .map(|q| q.split('&').any(|pair| pair.split('=').next() == Some("auto")))
        .unwrap_or(false)
}

// ============================================================================
// SERVER
// ============================================================================

/// Build the engine, run the first step, start ticking and serve until
/// Ctrl-C.
pub async fn serve<P: Profile>(profile: P, config: &ApiConfig) -> Result<()> {
    let engine = Engine::new(profile, config.tick_period()).into_shared();
    scheduler::prime(&engine)?;
    let ticker = Ticker::spawn(engine.clone(), config.tick_period());

    let app = router(AppState::new(engine)?);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!(
        addr = %addr,
        profile = ?config.profile,
        tick_ms = config.tick_interval_ms,
        "Simulator listening."
    );
    info!("Endpoints:");
    for (method, path, description) in api_routes() {
        info!("  {:4} {:14} - {}", method, path, description);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ticker.stop();
    info!("Goodbye.");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => {
            warn!(error = %e, "Could not install Ctrl-C handler; running until killed.");
            std::future::pending::<()>().await;
        }
    }
}
