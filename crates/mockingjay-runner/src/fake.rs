//! Fake server: answers requests from the endpoint expectation set
//!
//! The same contract file the checker replays against a real service is
//! served here as a stand-in for it.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use mockingjay_core::Endpoint;

/// Request bodies above this are rejected
pub const MAX_REQUEST_BODY: usize = 1024 * 1024;

/// Router that answers each request with the first matching endpoint's response.
pub fn router(endpoints: Vec<Endpoint>) -> Router {
    Router::new()
        .fallback(serve_endpoint)
        .with_state(Arc::new(endpoints))
}

/// Serve `router` on an already-bound listener until the future is dropped
/// or the server fails.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "fake server listening");
    }
    axum::serve(listener, router).await
}

async fn serve_endpoint(State(endpoints): State<Arc<Vec<Endpoint>>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let uri = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());

    let body = match to_bytes(body, MAX_REQUEST_BODY).await {
        Ok(body) => body,
        Err(e) => {
            warn!(method = %parts.method, %uri, "unreadable request body: {e}");
            return (StatusCode::BAD_REQUEST, format!("unreadable request body: {e}")).into_response();
        }
    };
    let body = String::from_utf8_lossy(&body);

    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let Some(endpoint) = endpoints
        .iter()
        .find(|e| e.request.matches(parts.method.as_str(), &uri, &body, header))
    else {
        debug!(method = %parts.method, %uri, "no endpoint matches");
        return (
            StatusCode::NOT_FOUND,
            format!("no endpoint matches {} {uri}", parts.method),
        )
            .into_response();
    };

    debug!(endpoint = %endpoint.name, method = %parts.method, %uri, "serving endpoint");
    respond(endpoint)
}

fn respond(endpoint: &Endpoint) -> Response {
    let status =
        StatusCode::from_u16(endpoint.response.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(endpoint.response.body.clone()));
    *response.status_mut() = status;

    for (name, value) in &endpoint.response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(endpoint = %endpoint.name, header = %name, "skipping invalid response header"),
        }
    }
    response
}
