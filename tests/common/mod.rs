//! Common test utilities and helpers
//!
//! A stand-in CalTopo server that checks request signatures the same way
//! the real service does.

#![allow(dead_code)]

use axum::{
    extract::{Form, Query, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use caltopo_mission::caltopo::{Credentials, RequestSigner};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CRED_ID: &str = "WIRECRED";
/// base64 of "secret"
pub const CRED_SECRET: &str = "c2VjcmV0";
pub const TEAM_ID: &str = "TEAM1";
pub const TEMPLATE_ID: &str = "TMPL9";
/// Template id the fake server answers slowly
pub const SLOW_TEMPLATE_ID: &str = "SLOW";
/// Team id the fake server rejects with a 500
pub const FAILING_TEAM_ID: &str = "FAIL";

/// One request as seen by the fake server
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub params: HashMap<String, String>,
    pub signature_valid: bool,
}

#[derive(Clone)]
struct FakeState {
    signer: Arc<RequestSigner>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

pub struct FakeCalTopo {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl FakeCalTopo {
    pub async fn start() -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            signer: Arc::new(RequestSigner::from_base64(CRED_ID, CRED_SECRET).unwrap()),
            seen: seen.clone(),
        };

        let app = Router::new()
            .route("/api/v1/map/{id}/since/0", any(handle_get))
            .route("/api/v1/acct/{team}/CollaborativeMap", any(handle_post))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, seen }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

pub fn credentials(team: &str, template: Option<&str>) -> Credentials {
    Credentials::new(CRED_ID, CRED_SECRET, team, template.map(String::from)).unwrap()
}

pub fn template_state() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "tmpl-feature-1",
                "geometry": {"type": "Point", "coordinates": [-149.9, 61.2]},
                "properties": {"title": "Staging", "folderId": "folder-1", "class": "Marker"}
            },
            {
                "type": "Feature",
                "id": "tmpl-feature-2",
                "folderId": "folder-2",
                "geometry": {"type": "LineString", "coordinates": [[-149.9, 61.2], [-149.8, 61.3]]},
                "properties": {"title": "Access road"}
            }
        ]
    })
}

fn record(
    state: &FakeState,
    method: &Method,
    uri: &Uri,
    params: HashMap<String, String>,
) -> bool {
    let payload = params.get("json").cloned().unwrap_or_default();
    let expires: i64 = params
        .get("expires")
        .and_then(|e| e.parse().ok())
        .unwrap_or_default();
    let expected = state
        .signer
        .sign(method.as_str(), uri.path(), expires, &payload)
        .unwrap();
    let signature_valid = params.get("id").map(String::as_str) == Some(CRED_ID)
        && params.get("signature") == Some(&expected);

    state.seen.lock().unwrap().push(SeenRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        params,
        signature_valid,
    });
    signature_valid
}

async fn handle_get(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !record(&state, &method, &uri, params) {
        return (StatusCode::UNAUTHORIZED, "bad signature").into_response();
    }
    if uri.path().contains(SLOW_TEMPLATE_ID) {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    Json(json!({"status": "ok", "result": {"state": template_state()}})).into_response()
}

async fn handle_post(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    if !record(&state, &method, &uri, params) {
        return (StatusCode::UNAUTHORIZED, "bad signature").into_response();
    }
    if uri.path().contains(FAILING_TEAM_ID) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "kaboom").into_response();
    }
    Json(json!({"status": "ok", "result": {"id": "WIREMAP"}})).into_response()
}
