//! HTTP front door for mission map creation

pub mod auth;
pub mod rate_limit;

use crate::caltopo::composer::{MissionMapComposer, MissionMapRequest};
use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub use auth::{AuthenticatedUser, IdentityVerifier, PocketBaseVerifier, StaticVerifier};
pub use rate_limit::{ClientRateLimiter, RateLimits};

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred while creating the map.";

/// Shared state behind every request
pub struct AppState {
    pub composer: MissionMapComposer,
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Per-client limits on `/create-map`; `/health` is never limited
    pub limits: RateLimits,
}

pub struct MissionServer {
    state: Arc<AppState>,
    bind: String,
}

impl MissionServer {
    pub fn new(state: AppState, bind: impl Into<String>) -> Self {
        Self {
            state: Arc::new(state),
            bind: bind.into(),
        }
    }

    /// Start the server and serve until the process stops
    pub async fn start(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind).await?;
        info!("Starting mission map server on {}", listener.local_addr()?);
        let app = build_router(self.state);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

/// Serve with `into_make_service_with_connect_info::<SocketAddr>()` so
/// clients are told apart by peer address when no proxy header is present.
pub fn build_router(state: Arc<AppState>) -> Router {
    let limiter = Arc::new(ClientRateLimiter::new(&state.limits));
    Router::new()
        .route("/health", get(health))
        .route(
            "/create-map",
            post(create_map).layer(middleware::from_fn_with_state(
                limiter,
                rate_limit::limit_requests,
            )),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct CreateMapResponse {
    success: bool,
    map_id: String,
    map_url: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn create_map(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: std::result::Result<Json<MissionMapRequest>, JsonRejection>,
) -> Response {
    let Some(authorization) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return error_response(StatusCode::UNAUTHORIZED, "Missing Authorization Header");
    };

    let Some(user) = state.verifier.verify(authorization).await else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "Invalid Token or Authentication Failed",
        );
    };

    if !user.is_admin() {
        return error_response(StatusCode::FORBIDDEN, "Forbidden: Admin Access Required");
    }

    let Ok(Json(request)) = body else {
        return error_response(StatusCode::BAD_REQUEST, "No JSON payload provided");
    };

    info!(
        "Received request from {} ({}) to create map: {:?} at {:?} with LKP: {:?}",
        user.email, user.id, request.title, request.location, request.lkp
    );

    match state.composer.create_from_request(&request).await {
        Ok(result) => Json(CreateMapResponse {
            success: true,
            map_id: result.map_id,
            map_url: result.map_url,
        })
        .into_response(),
        Err(e) if e.is_validation() => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            error!("Error creating map: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
        }
    }
}
