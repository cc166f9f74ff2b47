#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, header},
    response::Response,
};
use http_body_util::BodyExt;
use tempfile::TempDir;

use pyshare_core::config::ResolverConfig;
use pyshare_core::{ConnectionLog, FileManifestStore, RemoteListingResolver, SharingSession};
use pyshare_server::{AppContext, SharedState, router};

pub const TEST_PORT: u16 = 8000;
pub const BOUNDARY: &str = "pyshare-test-boundary";

/// A LAN client that is not this machine
pub fn remote_peer() -> SocketAddr {
    "192.0.2.10:50000".parse().expect("valid address")
}

pub fn loopback_peer() -> SocketAddr {
    "127.0.0.1:50000".parse().expect("valid address")
}

pub struct TestApp {
    pub dir: TempDir,
    pub state: SharedState,
    pub app: Router,
}

pub async fn test_app() -> TestApp {
    test_app_with_upload_limit(16 * 1024 * 1024).await
}

pub async fn test_app_with_upload_limit(max_upload_bytes: usize) -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store = FileManifestStore::open(dir.path().join("shared"))
        .await
        .expect("Failed to open store");
    let resolver = RemoteListingResolver::new(&ResolverConfig::default()).expect("Failed to build resolver");

    let state = Arc::new(AppContext::new(
        SharingSession::new(store, ConnectionLog::default()),
        resolver,
        TEST_PORT,
        max_upload_bytes,
    ));
    let app = router(state.clone());

    TestApp { dir, state, app }
}

/// Build a request as if it arrived over a socket from `peer`
pub fn request_from(peer: SocketAddr, method: Method, uri: &str, body: Body) -> Request<Body> {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .expect("Failed to build request");
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

pub fn get(uri: &str) -> Request<Body> {
    request_from(remote_peer(), Method::GET, uri, Body::empty())
}

pub fn post(uri: &str) -> Request<Body> {
    request_from(remote_peer(), Method::POST, uri, Body::empty())
}

pub fn post_json(uri: &str, value: serde_json::Value) -> Request<Body> {
    let mut request = request_from(remote_peer(), Method::POST, uri, Body::from(value.to_string()));
    request
        .headers_mut()
        .insert(header::CONTENT_TYPE, "application/json".parse().expect("valid header"));
    request
}

/// Multipart body with a single part named `field`
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut request = request_from(
        remote_peer(),
        Method::POST,
        "/api/upload",
        Body::from(multipart_body(field, filename, content)),
    );
    request.headers_mut().insert(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY)
            .parse()
            .expect("valid header"),
    );
    request
}

pub async fn extract_json(response: Response) -> serde_json::Value {
    let bytes = extract_bytes(response).await;
    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

pub async fn extract_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect body")
        .to_bytes()
        .to_vec()
}

pub async fn extract_text(response: Response) -> String {
    String::from_utf8(extract_bytes(response).await).expect("Body is not UTF-8")
}
