//! Local mock of the registration/login gateway, for development runs and
//! integration tests. Served standalone by the `test-target` binary.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::Result;

/// Credentials payload accepted by both endpoints
#[derive(Debug, Deserialize)]
pub struct CredentialsPayload {
    pub username: String,
    pub password: String,
}

async fn add_user(Json(payload): Json<CredentialsPayload>) -> (StatusCode, Json<Value>) {
    if payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing password"})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({"message": format!("User {} created", payload.username)})),
    )
}

async fn login(Json(payload): Json<CredentialsPayload>) -> (StatusCode, Json<Value>) {
    if payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing password"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"token": format!("tok-{}", payload.username)})),
    )
}

/// Router serving the two gateway endpoints. The permissive CORS layer
/// answers the OPTIONS preflights the scenario issues.
pub fn router() -> Router {
    Router::new()
        .route("/adduser", post(add_user))
        .route("/login", post(login))
        .layer(CorsLayer::very_permissive())
}

/// Serve the mock target on the given address until the process exits
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(listen_addr = %addr, "Test target server started");
    axum::serve(listener, router()).await?;
    Ok(())
}
