//! Connection log recording

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum::middleware::Next;
use axum::response::Response;

use pyshare_core::ConnectionLogEntry;

use crate::net::PeerAddr;
use crate::state::SharedState;

/// Client address as reported by a proxy, else the socket peer
fn client_ip(headers: &HeaderMap, peer: PeerAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.to_string())
}

/// Record tracked requests before handing them on
pub async fn log_requests(State(state): State<SharedState>, peer: PeerAddr, request: Request, next: Next) -> Response {
    let headers = request.headers();
    let entry = ConnectionLogEntry::request(
        client_ip(headers, peer),
        request.method().as_str(),
        request.uri().path(),
        headers.get(USER_AGENT).and_then(|v| v.to_str().ok()),
    );

    tracing::debug!(ip = %entry.ip, method = %entry.method, path = %entry.path, "request");
    state.session.record_request(entry).await;

    next.run(request).await
}
