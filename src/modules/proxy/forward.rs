//! Request forwarding to the external backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    body::{to_bytes, Body},
    extract::{OriginalUri, Request, State},
    http::{header, HeaderMap, HeaderName},
    response::Response,
    Json,
};
use bookstore_http::error::AppError;
use bookstore_kernel::settings::BackendSettings;
use serde::Serialize;

use super::supervisor::BackendHealth;

/// Largest request body relayed to the backend.
const MAX_FORWARD_BODY: usize = 10 * 1024 * 1024;

/// Headers meaningful only for a single connection.
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove the fixed hop-by-hop set plus every header named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(&HOP_BY_HOP) {
        headers.remove(name);
    }
}

/// Shared state of the forwarding handlers.
#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    backend_url: String,
    health: Arc<BackendHealth>,
}

impl ProxyState {
    pub fn new(settings: &BackendSettings, health: Arc<BackendHealth>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to create proxy client")?;

        Ok(Self {
            client,
            backend_url: settings.url.trim_end_matches('/').to_string(),
            health,
        })
    }
}

/// Relay the request to the backend and its answer back to the caller.
pub async fn forward(
    State(state): State<ProxyState>,
    OriginalUri(uri): OriginalUri,
    request: Request,
) -> Result<Response, AppError> {
    if !state.health.is_healthy() {
        return Err(AppError::unavailable(
            "Backend is not running yet. Please wait.",
        ));
    }

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = format!("{}{}", state.backend_url, path_and_query);

    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_FORWARD_BODY)
        .await
        .map_err(|err| AppError::bad_request(format!("unreadable request body: {err}")))?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    tracing::debug!(method = %parts.method, %url, "forwarding request");

    let upstream = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|err| {
            tracing::warn!(%url, error = %err, "backend request failed");
            AppError::unavailable(format!("Error connecting to backend: {err}"))
        })?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    let bytes = upstream.bytes().await.map_err(|err| {
        tracing::warn!(%url, error = %err, "backend response body failed");
        AppError::unavailable(format!("Error reading backend response: {err}"))
    })?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

#[derive(Debug, Serialize)]
pub struct ApiStatus {
    pub status: &'static str,
    pub message: &'static str,
}

/// Report whether the backend is reachable.
pub async fn api_status(State(state): State<ProxyState>) -> Json<ApiStatus> {
    let status = if state.health.is_healthy() {
        ApiStatus {
            status: "running",
            message: "Backend is running. The API is available under /api/books.",
        }
    } else {
        ApiStatus {
            status: "starting",
            message: "Backend is starting up, please wait...",
        }
    };
    Json(status)
}
