//! Integration tests driving the full scenario against an in-process
//! mock gateway.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

use loadgen_node::config::LoadgenConfig;
use loadgen_node::metrics::{all_passed, evaluate_assertions};
use loadgen_node::runner::ScenarioRunner;
use loadgen_node::target;

/// Bind a router on an ephemeral port and serve it in the background
async fn spawn_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Small, fast run profile pointed at the given target
fn test_config(addr: SocketAddr, users: u32) -> LoadgenConfig {
    let mut config = LoadgenConfig::default();
    config.target.base_url = format!("http://{}", addr);
    config.injection.users = users;
    config.injection.ramp_up_seconds = 1;
    config.scenario.pool_size = users.max(1);
    config.scenario.inter_phase_pause_seconds = 0;
    config
}

#[tokio::test]
async fn test_small_run_passes_global_assertions() {
    let addr = spawn_router(target::router()).await;
    let config = test_config(addr, 10);

    let runner = ScenarioRunner::new(config.clone()).unwrap();
    let report = runner.run().await.unwrap();

    // 10 users, 4 HTTP steps each
    assert_eq!(report.total_requests, 40);
    assert_eq!(report.failed_requests, 0);
    assert_eq!(report.users_started, 10);
    assert_eq!(report.users_completed, 10);

    let outcomes = evaluate_assertions(&config.assertions, &report);
    assert!(all_passed(&outcomes), "expected clean run to pass: {:?}", outcomes);
}

#[tokio::test]
async fn test_feeder_wraps_when_users_exceed_pool() {
    let addr = spawn_router(target::router()).await;
    let mut config = test_config(addr, 6);
    config.scenario.pool_size = 3;

    let runner = ScenarioRunner::new(config.clone()).unwrap();
    let report = runner.run().await.unwrap();

    // Credentials repeat after the pool wraps; every flow still succeeds
    assert_eq!(report.total_requests, 24);
    assert_eq!(report.failed_requests, 0);
    assert_eq!(report.users_completed, 6);
}

#[tokio::test]
async fn test_failing_login_breaks_success_rate_assertion() {
    // Gateway variant where registration works but login always answers 404
    let router = Router::new()
        .route(
            "/adduser",
            post(|Json(_): Json<Value>| async {
                (StatusCode::CREATED, Json(json!({"message": "created"})))
            }),
        )
        .route("/login", post(|| async { StatusCode::NOT_FOUND }))
        .layer(CorsLayer::very_permissive());
    let addr = spawn_router(router).await;

    let config = test_config(addr, 4);
    let runner = ScenarioRunner::new(config.clone()).unwrap();
    let report = runner.run().await.unwrap();

    // Both preflights and the register step pass, every login fails
    assert_eq!(report.total_requests, 16);
    assert_eq!(report.failed_requests, 4);

    let outcomes = evaluate_assertions(&config.assertions, &report);
    assert!(outcomes[0].passed, "latency assertion should still pass");
    assert!(!outcomes[1].passed, "75% success must breach the 95% floor");
    assert!(!all_passed(&outcomes));
}

#[tokio::test]
async fn test_failing_preflight_counts_against_success_rate() {
    // Gateway variant whose OPTIONS endpoints error out while the POST
    // endpoints behave; no CORS layer, the routes answer preflights directly
    let router = Router::new()
        .route(
            "/adduser",
            post(|Json(_): Json<Value>| async {
                (StatusCode::CREATED, Json(json!({"message": "created"})))
            })
            .options(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route(
            "/login",
            post(|Json(_): Json<Value>| async {
                (StatusCode::OK, Json(json!({"token": "abc123"})))
            })
            .options(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
    let addr = spawn_router(router).await;

    let config = test_config(addr, 4);
    let runner = ScenarioRunner::new(config.clone()).unwrap();
    let report = runner.run().await.unwrap();

    // Both preflights fail per user; register and login still pass
    assert_eq!(report.total_requests, 16);
    assert_eq!(report.failed_requests, 8);

    let outcomes = evaluate_assertions(&config.assertions, &report);
    assert!(!outcomes[1].passed, "50% success must breach the 95% floor");
}

#[tokio::test]
async fn test_unreachable_target_fails_every_request_without_aborting() {
    // Nothing is listening on this address once the listener is dropped
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = test_config(addr, 2);
    config.target.request_timeout_seconds = 2;

    let runner = ScenarioRunner::new(config.clone()).unwrap();
    let report = runner.run().await.unwrap();

    // Transport failures are data points, not aborts: all flows complete
    assert_eq!(report.total_requests, 8);
    assert_eq!(report.failed_requests, 8);
    assert_eq!(report.users_completed, 2);

    let outcomes = evaluate_assertions(&config.assertions, &report);
    assert!(!all_passed(&outcomes));
}

#[tokio::test]
async fn test_register_message_absent_is_tolerated() {
    // Register answers 200 with no message field; login returns a token
    let router = Router::new()
        .route(
            "/adduser",
            post(|Json(_): Json<Value>| async { (StatusCode::OK, Json(json!({"ok": true}))) }),
        )
        .route(
            "/login",
            post(|Json(_): Json<Value>| async {
                (StatusCode::OK, Json(json!({"token": "abc123"})))
            }),
        )
        .layer(CorsLayer::very_permissive());
    let addr = spawn_router(router).await;

    let config = test_config(addr, 3);
    let runner = ScenarioRunner::new(config.clone()).unwrap();
    let report = runner.run().await.unwrap();

    // Missing optional field is not an error of any kind
    assert_eq!(report.failed_requests, 0);
    assert!(all_passed(&evaluate_assertions(&config.assertions, &report)));
}
