// SPDX-FileCopyrightText: 2026 Curo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. The health endpoint is
//! public; everything under `/v1/` requires the bearer token.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};
use curo_core::CuroError;
use curo_engine::JobRunner;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The automation runner behind every route.
    pub runner: Arc<JobRunner>,
    /// Process start time for uptime reporting.
    pub started_at: Instant,
}

/// Gateway server configuration (mirrors `GatewayConfig` from curo-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Bearer token for auth (`None` rejects all `/v1/` requests).
    pub bearer_token: Option<String>,
}

/// Build the gateway router.
///
/// Split out of [`start_server`] so tests can drive it without a socket.
pub fn router(state: GatewayState, auth: AuthConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/runs/{family}", post(handlers::post_run))
        .route("/v1/runs/{family}/pending", get(handlers::get_pending))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server and serve until the process exits.
pub async fn start_server(config: &ServerConfig, runner: Arc<JobRunner>) -> Result<(), CuroError> {
    let state = GatewayState {
        runner,
        started_at: Instant::now(),
    };
    let auth = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };
    let app = router(state, auth);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CuroError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| CuroError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
