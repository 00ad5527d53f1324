//! Signed HTTP access to the CalTopo API
//!
//! [`MapApi`] is the seam the template fetcher and composer depend on;
//! [`HttpMapApiClient`] talks to caltopo.com and [`MockMapApi`] stands in
//! for it in tests.

use crate::caltopo::credentials::Credentials;
use crate::caltopo::signer::RequestSigner;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const CALTOPO_BASE_URL: &str = "https://caltopo.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
}

impl ApiMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMethod::Get => "GET",
            ApiMethod::Post => "POST",
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-method request timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub get: Duration,
    pub post: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            get: Duration::from_secs(15),
            post: Duration::from_secs(20),
        }
    }
}

impl Timeouts {
    fn for_method(&self, method: ApiMethod) -> Duration {
        match method {
            ApiMethod::Get => self.get,
            ApiMethod::Post => self.post,
        }
    }
}

/// Signed request/response access to the mapping API
#[async_trait]
pub trait MapApi: Send + Sync {
    /// Send one signed request and return the parsed JSON body.
    ///
    /// Non-2xx responses come back as [`Error::Api`]; nothing is retried.
    async fn send(&self, method: ApiMethod, endpoint: &str, payload: Option<&Value>)
        -> Result<Value>;
}

/// Ensure the endpoint has exactly one leading slash
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{endpoint}")
    }
}

pub struct HttpMapApiClient {
    client: Client,
    signer: RequestSigner,
    base_url: String,
    timeouts: Timeouts,
}

impl HttpMapApiClient {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, credentials))
    }

    /// Reuse an existing connection pool
    pub fn with_client(client: Client, credentials: &Credentials) -> Self {
        Self {
            client,
            signer: RequestSigner::new(credentials),
            base_url: CALTOPO_BASE_URL.to_string(),
            timeouts: Timeouts::default(),
        }
    }

    /// Point the client somewhere other than caltopo.com
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, method: ApiMethod, endpoint: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(format!(
                "{method} {endpoint} exceeded {:?}",
                self.timeouts.for_method(method)
            ))
        } else {
            Error::Request(err)
        }
    }

    async fn read_response(
        &self,
        method: ApiMethod,
        endpoint: &str,
        response: Response,
    ) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(method, endpoint, e))?;

        if !status.is_success() {
            warn!(
                "CalTopo request failed: {} {} -> {} {}",
                method,
                endpoint,
                status.as_u16(),
                body
            );
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl MapApi for HttpMapApiClient {
    async fn send(
        &self,
        method: ApiMethod,
        endpoint: &str,
        payload: Option<&Value>,
    ) -> Result<Value> {
        let endpoint = normalize_endpoint(endpoint);

        // Serialized once: the signature covers these exact bytes
        let payload_str = match payload {
            Some(value) => serde_json::to_string(value)?,
            None => String::new(),
        };

        let signed = self.signer.signed_params(
            method.as_str(),
            &endpoint,
            Utc::now().timestamp_millis(),
            &payload_str,
        )?;

        let mut params: Vec<(&str, String)> = vec![
            ("id", signed.id),
            ("expires", signed.expires.to_string()),
            ("signature", signed.signature),
        ];

        let url = format!("{}{}", self.base_url, endpoint);
        let timeout = self.timeouts.for_method(method);
        debug!("CalTopo {} {} (timeout {:?})", method, endpoint, timeout);

        let request = match method {
            ApiMethod::Post => {
                if payload.is_some() {
                    params.push(("json", payload_str));
                }
                self.client.post(&url).form(&params)
            }
            ApiMethod::Get => self.client.get(&url).query(&params),
        };

        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(method, &endpoint, e))?;

        self.read_response(method, &endpoint, response).await
    }
}

/// A recorded call made against [`MockMapApi`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: ApiMethod,
    pub endpoint: String,
    pub payload: Option<Value>,
}

type RecordedCalls = Arc<Mutex<Vec<RecordedCall>>>;

/// Mock implementation of [`MapApi`] for testing
#[derive(Default)]
pub struct MockMapApi {
    /// Responses handed out in order, one per call
    pub responses: Arc<Mutex<Vec<Result<Value>>>>,
    /// Every call made, in order
    pub calls: RecordedCalls,
}

impl MockMapApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_response(&self, response: Result<Value>) {
        self.responses.lock().await.push(response);
    }

    pub async fn add_success_response(&self, body: Value) {
        self.add_response(Ok(body)).await;
    }

    pub async fn add_api_error(&self, status: u16, body: &str) {
        self.add_response(Err(Error::Api {
            status,
            body: body.to_string(),
        }))
        .await;
    }

    pub async fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl MapApi for MockMapApi {
    async fn send(
        &self,
        method: ApiMethod,
        endpoint: &str,
        payload: Option<&Value>,
    ) -> Result<Value> {
        self.calls.lock().await.push(RecordedCall {
            method,
            endpoint: normalize_endpoint(endpoint),
            payload: payload.cloned(),
        });

        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            return Err(Error::UnexpectedResponse(
                "No mock response configured".to_string(),
            ));
        }
        responses.remove(0)
    }
}
