use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use servsim::engine::Engine;
use servsim::scheduler;
use servsim::{AppState, DbServer, Profile, SharedEngine, WebServer, router};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn primed<P: Profile>(profile: P) -> (SharedEngine<P>, Router) {
    let engine = Engine::new(profile, Duration::from_secs(1)).into_shared();
    scheduler::prime(&engine).unwrap();
    let app = router(AppState::new(engine.clone()).unwrap());
    (engine, app)
}

fn web_app() -> Router {
    primed(WebServer::new(50.0, &names(&["www.example.com", "api.example.com"]))).1
}

fn db_app() -> Router {
    primed(DbServer::new(200.0, &names(&["shop", "analytics"]))).1
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, String) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, String) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap();
    let (status, _, body) = send(app, request).await;
    (status, body)
}

async fn status_json(app: &Router) -> Value {
    let (status, _, body) = get(app, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_str(&body).unwrap()
}

/// Value of an unlabeled or fully-labeled series in exposition text.
fn metric(text: &str, series: &str) -> Option<f64> {
    text.lines()
        .find(|line| line.starts_with(series) && line[series.len()..].starts_with(' '))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|v| v.parse().ok())
}

#[tokio::test]
async fn test_first_read_sees_one_completed_tick() {
    let app = web_app();
    let status = status_json(&app).await;

    assert_eq!(status["profile"], "web");
    assert_eq!(status["tick"], 1);
    assert_eq!(status["failed_ticks"], 0);
    assert_eq!(status["reconfigurations"], 0);
    assert!(status["last_tick_at"].is_string());
    assert_eq!(status["total_accesses"], status["req_per_sec"]);
    assert_eq!(status["uptime_seconds"], 1.0);
    assert_eq!(status["total_workers"], 100);
    assert_eq!(
        status["busy_workers"].as_u64().unwrap() + status["idle_workers"].as_u64().unwrap(),
        100
    );
    assert_eq!(status["scoreboard"].as_str().unwrap().len(), 100);
}

#[tokio::test]
async fn test_reads_do_not_advance_state() {
    let app = web_app();
    let first = status_json(&app).await;
    get(&app, "/metrics").await;
    get(&app, "/server-status?auto").await;
    let second = status_json(&app).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_rate_override_is_visible_immediately() {
    let app = web_app();
    let (status, body) = post(&app, "/admin/set", r#"{"req_per_sec": 100}"#).await;
    assert_eq!(status, StatusCode::OK);

    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["status"], "ok");
    assert_eq!(ack["applied"], json!(["req_per_sec"]));
    assert_eq!(ack["state"]["req_per_sec"], 100.0);

    let status = status_json(&app).await;
    assert_eq!(status["req_per_sec"], 100.0);
    assert_eq!(status["tick"], 1);
    assert_eq!(status["reconfigurations"], 1);
}

#[tokio::test]
async fn test_string_numbers_are_coerced() {
    let app = web_app();
    let (_, body) = post(&app, "/admin/set", r#"{"cpu_load": "0.5", "busy_workers": "30"}"#).await;
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["state"]["cpu_load"], 0.5);
    assert_eq!(ack["state"]["busy_workers"], 30);
    assert_eq!(ack["state"]["idle_workers"], 70);
}

#[tokio::test]
async fn test_invalid_fields_are_ignored() {
    let app = web_app();
    let before = status_json(&app).await;

    let (status, body) = post(
        &app,
        "/admin/set",
        r#"{"req_per_sec": "fast", "cpu_load": [1], "total_accesses": 0, "bogus": true}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["applied"], json!([]));

    assert_eq!(status_json(&app).await, before);
}

#[tokio::test]
async fn test_malformed_body_is_an_empty_update() {
    let app = web_app();
    for body in ["not json", "[1, 2]", ""] {
        let (status, text) = post(&app, "/admin/set", body).await;
        assert_eq!(status, StatusCode::OK, "body {:?}", body);
        let ack: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(ack["applied"], json!([]));
    }
}

#[tokio::test]
async fn test_json_and_metrics_agree() {
    let app = web_app();
    let status = status_json(&app).await;
    let (code, content_type, text) = get(&app, "/metrics").await;

    assert_eq!(code, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));
    assert_eq!(
        metric(&text, "apache_fake_requests_per_second"),
        status["req_per_sec"].as_f64()
    );
    assert_eq!(
        metric(&text, "apache_fake_accesses_total"),
        status["total_accesses"].as_f64()
    );
    assert_eq!(
        metric(&text, "apache_fake_busy_workers"),
        status["busy_workers"].as_f64()
    );
    assert!(text.contains("# TYPE apache_fake_accesses_total counter"));
    assert!(metric(&text, r#"apache_fake_vhost_accesses_total{vhost="api.example.com"}"#).is_some());
    assert!(metric(&text, r#"apache_fake_scoreboard{state="waiting"}"#).is_some());
}

#[tokio::test]
async fn test_legacy_text_and_summary() {
    let app = web_app();
    let status = status_json(&app).await;

    let (code, content_type, text) = get(&app, "/server-status?auto").await;
    assert_eq!(code, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));
    assert!(text.starts_with("Total Accesses: "));
    let rate_line = format!("ReqPerSec: {:.2}", status["req_per_sec"].as_f64().unwrap());
    assert!(text.lines().any(|l| l == rate_line), "{}", text);

    let (code, content_type, html) = get(&app, "/server-status").await;
    assert_eq!(code, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(html.contains("Apache Server Status"));
}

#[tokio::test]
async fn test_usage_lists_endpoints() {
    let (code, _, text) = get(&web_app(), "/").await;
    assert_eq!(code, StatusCode::OK);
    assert!(text.contains("/admin/set"));

    let (_, _, text) = get(&db_app(), "/").await;
    assert!(text.contains("replica_lag_seconds"));
}

#[tokio::test]
async fn test_db_pool_resize_reclamps_used() {
    let app = db_app();
    let (_, body) = post(&app, "/admin/set", r#"{"innodb_buffer_pool_size_bytes": 1024}"#).await;
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["state"]["innodb_buffer_pool_size_bytes"], 1024);
    assert_eq!(ack["state"]["innodb_buffer_pool_used_bytes"], 1024);
    assert_eq!(ack["state"]["innodb_buffer_pool_free_bytes"], 0);

    let status = status_json(&app).await;
    assert_eq!(status["innodb_buffer_pool_used_bytes"], 1024);
}

#[tokio::test]
async fn test_db_replica_lag_can_be_cleared() {
    let (engine, app) = primed(DbServer::new(200.0, &names(&["shop"])));

    assert!(status_json(&app).await["replica_lag_seconds"].is_null());

    let (_, body) = post(&app, "/admin/set", r#"{"replica_lag_seconds": 5}"#).await;
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["state"]["replica_lag_seconds"], 5.0);
    let (_, _, text) = get(&app, "/metrics").await;
    assert_eq!(metric(&text, "mysql_fake_replica_lag_seconds"), Some(5.0));

    engine.lock().tick().unwrap();

    let (_, body) = post(&app, "/admin/set", r#"{"replica_lag_seconds": null}"#).await;
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["applied"], json!(["replica_lag_seconds"]));
    assert!(ack["state"]["replica_lag_seconds"].is_null());

    engine.lock().tick().unwrap();
    let status = status_json(&app).await;
    assert!(status["replica_lag_seconds"].is_null());
    assert_eq!(status["tick"], 3);

    let (_, _, text) = get(&app, "/metrics").await;
    assert!(metric(&text, "mysql_fake_replica_lag_seconds").is_none());
}

#[tokio::test]
async fn test_db_server_status_is_summary_even_with_auto() {
    let app = db_app();
    let (code, content_type, html) = get(&app, "/server-status?auto").await;
    assert_eq!(code, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(html.contains("MySQL Server Status"));
}

#[tokio::test]
async fn test_counters_in_metrics_never_decrease() {
    let (engine, app) = primed(WebServer::new(80.0, &names(&["www.example.com"])));
    let mut previous = 0.0;
    for _ in 0..20 {
        engine.lock().tick().unwrap();
        let (_, _, text) = get(&app, "/metrics").await;
        let total = metric(&text, "apache_fake_accesses_total").unwrap();
        assert!(total >= previous);
        previous = total;
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_process_metrics_exported() {
    let (_, _, text) = get(&web_app(), "/metrics").await;
    assert!(text.contains("process_"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (code, _, _) = get(&web_app(), "/nope").await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_huge_rate_override_keeps_totals_numeric() {
    let (engine, app) = primed(WebServer::new(50.0, &names(&["www.example.com"])));
    let (_, body) = post(&app, "/admin/set", r#"{"req_per_sec": 1e308}"#).await;
    let ack: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(ack["applied"], json!(["req_per_sec"]));
    assert_eq!(ack["state"]["req_per_sec"], 1e9);

    let mut previous = 0.0;
    for _ in 0..3 {
        engine.lock().tick().unwrap();
        let status = status_json(&app).await;
        let accesses = status["total_accesses"].as_f64().unwrap();
        assert!(status["total_kbytes"].as_f64().unwrap().is_finite());
        assert!(status["bytes_per_sec"].as_f64().unwrap().is_finite());

        let (_, _, text) = get(&app, "/metrics").await;
        let exported = metric(&text, "apache_fake_accesses_total").unwrap();
        assert!(exported > previous);
        assert!((exported - accesses).abs() <= accesses * 1e-9);
        previous = exported;
    }

    let (db_engine, db) = primed(DbServer::new(200.0, &names(&["shop"])));
    post(&db, "/admin/set", r#"{"queries_per_sec": "1e308"}"#).await;
    db_engine.lock().tick().unwrap();
    let status = status_json(&db).await;
    assert!(status["queries_per_sec"].as_f64().unwrap() <= 1e9);
    assert!(status["total_queries"].as_f64().unwrap().is_finite());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scrapes_render_one_snapshot() {
    let (engine, app) = primed(WebServer::new(80.0, &names(&["www.example.com"])));

    // uptime -> total_accesses for every completed tick.
    let history: Arc<Mutex<HashMap<u64, f64>>> = Arc::new(Mutex::new(HashMap::new()));
    {
        let guard = engine.lock();
        let web = guard.profile();
        history.lock().insert(web.uptime_seconds as u64, web.total_accesses);
    }

    let ticking = {
        let engine = engine.clone();
        let history = history.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                {
                    let mut guard = engine.lock();
                    guard.tick().unwrap();
                    let web = guard.profile();
                    history.lock().insert(web.uptime_seconds.round() as u64, web.total_accesses);
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let scrapers: Vec<_> = (0..4)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let mut bodies = Vec::new();
                for _ in 0..50 {
                    bodies.push(get(&app, "/metrics").await.2);
                }
                bodies
            })
        })
        .collect();

    ticking.await.unwrap();
    for scraper in scrapers {
        for text in scraper.await.unwrap() {
            let uptime = metric(&text, "apache_fake_uptime_seconds").unwrap().round() as u64;
            let exported = metric(&text, "apache_fake_accesses_total").unwrap();
            let expected = history.lock()[&uptime];
            assert!(
                (exported - expected).abs() <= expected * 1e-9,
                "uptime {} exported {} expected {}",
                uptime,
                exported,
                expected
            );
        }
    }
}
