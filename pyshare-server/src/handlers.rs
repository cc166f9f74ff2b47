//! HTTP handlers

use std::net::{IpAddr, Ipv4Addr};

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Request, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use pyshare_core::protocol::{
    FetchRequest, FetchResponse, MessageResponse, ScanResponse, ServerInfo, ToggleResponse, UploadResponse,
    UploadedFile,
};
use pyshare_core::{ConnectionLogEntry, FileRecord, StoreError};

use crate::error::{ApiError, Result};
use crate::index;
use crate::net::{self, PeerAddr};
use crate::state::SharedState;

/// Body of the 503 served while sharing is off
pub const INACTIVE_MESSAGE: &str = "Sharing is currently inactive";

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pyshare-server"
    }))
}

/// Browser landing page
pub async fn index_handler(State(state): State<SharedState>) -> Result<Html<String>> {
    let files = state.session.store().list().await?;
    let is_active = state.session.is_active().await;
    Ok(Html(index::render_index(&files, is_active)))
}

pub async fn info_handler(State(state): State<SharedState>) -> Json<ServerInfo> {
    Json(ServerInfo {
        ip: net::local_ip_string(),
        port: state.port,
        hostname: net::hostname(),
        is_active: state.session.is_active().await,
    })
}

pub async fn logs_handler(State(state): State<SharedState>) -> Json<Vec<ConnectionLogEntry>> {
    Json(state.session.logs().await)
}

pub async fn toggle_handler(State(state): State<SharedState>) -> Json<ToggleResponse> {
    let outcome = state.session.toggle().await;
    if outcome.purge_failures > 0 {
        tracing::warn!(failures = outcome.purge_failures, "some shared files survived the purge");
    }

    Json(ToggleResponse {
        is_active: outcome.state.is_active(),
        message: outcome.message,
    })
}

pub async fn list_handler(State(state): State<SharedState>) -> Result<Json<Vec<FileRecord>>> {
    Ok(Json(state.session.store().list().await?))
}

/// Store the multipart field `file`, streaming it to disk
pub async fn upload_handler(State(state): State<SharedState>, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        let mut reader = std::pin::pin!(reader);
        let record = state
            .session
            .store()
            .put_reader(&original_name, &mut reader)
            .await
            .map_err(upload_error)?;
        tracing::info!(name = %record.name, size = record.size, "file uploaded");

        return Ok(Json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            file: UploadedFile {
                name: record.name,
                original_name,
                size: record.size,
            },
        }));
    }

    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

/// Surface a broken request body as the multipart error it started as
fn upload_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Io(e) if e.get_ref().is_some_and(|inner| inner.is::<MultipartError>()) => e
            .into_inner()
            .and_then(|inner| inner.downcast::<MultipartError>().ok())
            .map(|multipart| ApiError::Multipart(*multipart))
            .unwrap_or_else(|| ApiError::BadRequest("Upload interrupted".to_string())),
        other => other.into(),
    }
}

pub async fn delete_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.session.store().delete(&name).await?;
    tracing::info!(name = %name, "file deleted");

    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}

/// Zip of every shared file, streamed from a spooled temp file
pub async fn download_all_handler(State(state): State<SharedState>) -> Result<Response> {
    let archive = state
        .session
        .store()
        .export_archive(state.exporter.clone())
        .await?;

    let filename = format!("PyShare-{}.zip", chrono::Utc::now().format("%Y-%m-%d"));
    let len = archive.len();
    tracing::info!(size = len, filename = %filename, "archive exported");

    let file = tokio::fs::File::from_std(archive.into_file());
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, state.exporter.content_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        body,
    )
        .into_response())
}

/// Raw file content, gated by the sharing session
pub async fn serve_file_handler(
    State(state): State<SharedState>,
    peer: PeerAddr,
    Path(name): Path<String>,
    request: Request,
) -> Result<Response> {
    let referer = request
        .headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let caller = peer.ip().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.session.allows_file_access(caller, referer.as_deref()).await {
        tracing::debug!(peer = %peer, name = %name, "file request refused, sharing inactive");
        return Ok((StatusCode::SERVICE_UNAVAILABLE, INACTIVE_MESSAGE).into_response());
    }

    let path = state.session.store().resolve(&name).await?;
    Ok(ServeFile::new(path).oneshot(request).await.into_response())
}

/// Resolve a remote peer's manifest on behalf of the UI
pub async fn fetch_handler(
    State(state): State<SharedState>,
    Json(req): Json<FetchRequest>,
) -> Result<Json<FetchResponse>> {
    let manifest = state.resolver.resolve(&req.url).await?;
    Ok(Json(manifest.into()))
}

/// Discovery placeholder; never scans
pub async fn scan_handler(State(state): State<SharedState>) -> Json<ScanResponse> {
    let ip = net::local_ip_string();

    Json(ScanResponse {
        message: "Scan initiated".to_string(),
        info: format!("Scanning {}.1-254 on port {}", net::subnet_prefix(&ip), state.port),
    })
}
