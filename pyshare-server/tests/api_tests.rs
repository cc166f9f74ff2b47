mod common;

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{Method, StatusCode, header},
};
use serde_json::json;
use tower::ServiceExt;

use common::*;
use pyshare_server::handlers::INACTIVE_MESSAGE;

//===================
// Identity
//===================

#[tokio::test]
async fn test_health_check() {
    let t = test_app().await;

    let response = t.app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "pyshare-server");
}

#[tokio::test]
async fn test_info_reports_port_and_inactive_state() {
    let t = test_app().await;

    let response = t.app.oneshot(get("/api/info")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["port"], TEST_PORT);
    assert_eq!(body["isActive"], false);
    assert!(body["ip"].as_str().is_some_and(|ip| !ip.is_empty()));
    assert!(body["hostname"].is_string());
}

#[tokio::test]
async fn test_scan_stub() {
    let t = test_app().await;

    let response = t.app.oneshot(post("/api/scan")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["message"], "Scan initiated");
    let info = body["info"].as_str().unwrap();
    assert!(info.starts_with("Scanning "));
    assert!(info.ends_with(&format!(".1-254 on port {}", TEST_PORT)));
}

//===================
// Session
//===================

#[tokio::test]
async fn test_toggle_is_an_involution() {
    let t = test_app().await;

    let first = extract_json(t.app.clone().oneshot(post("/api/toggle-server")).await.unwrap()).await;
    assert_eq!(first["isActive"], true);
    assert_eq!(first["message"], "Sharing activated");

    let second = extract_json(t.app.clone().oneshot(post("/api/toggle-server")).await.unwrap()).await;
    assert_eq!(second["isActive"], false);
    assert_eq!(second["message"], "Sharing deactivated");

    let info = extract_json(t.app.oneshot(get("/api/info")).await.unwrap()).await;
    assert_eq!(info["isActive"], false);
}

#[tokio::test]
async fn test_deactivate_purges_files_and_log() {
    let t = test_app().await;

    t.app.clone().oneshot(post("/api/toggle-server")).await.unwrap();
    t.app
        .clone()
        .oneshot(upload_request("file", "a.txt", b"alpha"))
        .await
        .unwrap();
    t.app.clone().oneshot(get("/api/files")).await.unwrap();
    assert!(t.state.session.logs().await.len() > 1);

    t.app.clone().oneshot(post("/api/toggle-server")).await.unwrap();

    let files = extract_json(t.app.clone().oneshot(get("/api/files")).await.unwrap()).await;
    assert_eq!(files.as_array().unwrap().len(), 0);

    // Only the synthetic entry survives, plus the listing made after the purge
    let logs = t.state.session.logs().await;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].path, "/api/files");
    assert!(logs[1].is_system());
    assert_eq!(logs[1].user_agent, "Sharing deactivated");
}

//===================
// Files
//===================

#[tokio::test]
async fn test_upload_then_list() {
    let t = test_app().await;

    let response = t
        .app
        .clone()
        .oneshot(upload_request("file", "hello.txt", b"hello world"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["file"]["name"], "hello.txt");
    assert_eq!(body["file"]["originalName"], "hello.txt");
    assert_eq!(body["file"]["size"], 11);

    let files = extract_json(t.app.oneshot(get("/api/files")).await.unwrap()).await;
    let files = files.as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "hello.txt");
    assert_eq!(files[0]["size"], 11);
    assert_eq!(files[0]["url"], "/files/hello.txt");
}

#[tokio::test]
async fn test_upload_collision_keeps_both_files() {
    let t = test_app().await;

    t.app
        .clone()
        .oneshot(upload_request("file", "dup.txt", b"one"))
        .await
        .unwrap();
    let second = extract_json(
        t.app
            .clone()
            .oneshot(upload_request("file", "dup.txt", b"two"))
            .await
            .unwrap(),
    )
    .await;

    let stored = second["file"]["name"].as_str().unwrap();
    assert_ne!(stored, "dup.txt");
    assert!(stored.ends_with("-dup.txt"));
    assert_eq!(second["file"]["originalName"], "dup.txt");

    let files = extract_json(t.app.oneshot(get("/api/files")).await.unwrap()).await;
    assert_eq!(files.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_large_upload_is_streamed_intact() {
    let t = test_app().await;
    let content: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

    let response = t
        .app
        .oneshot(upload_request("file", "big.bin", &content))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response).await["file"]["size"], content.len());

    let stored = tokio::fs::read(t.state.session.store().root().join("big.bin")).await.unwrap();
    assert_eq!(stored, content);
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected_without_leftovers() {
    let t = test_app_with_upload_limit(1024).await;

    let response = t
        .app
        .oneshot(upload_request("file", "huge.bin", &[9u8; 64 * 1024]))
        .await
        .unwrap();
    assert!(response.status().is_client_error(), "status {}", response.status());

    let root = t.state.session.store().root();
    assert_eq!(std::fs::read_dir(root).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let t = test_app().await;

    let response = t
        .app
        .oneshot(upload_request("other", "x.txt", b"data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response).await;
    assert_eq!(body["error"], "No file uploaded");
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_delete_file() {
    let t = test_app().await;
    t.state.session.store().put("gone.txt", b"bye").await.unwrap();

    let request = request_from(remote_peer(), Method::DELETE, "/api/files/gone.txt", Body::empty());
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response).await["message"], "File deleted successfully");

    let request = request_from(remote_peer(), Method::DELETE, "/api/files/gone.txt", Body::empty());
    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(extract_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_encoded_name() {
    let t = test_app().await;
    t.state.session.store().put("my file.txt", b"x").await.unwrap();

    let request = request_from(remote_peer(), Method::DELETE, "/api/files/my%20file.txt", Body::empty());
    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(t.state.session.store().list().await.unwrap().is_empty());
}

//===================
// File serving gate
//===================

#[tokio::test]
async fn test_remote_file_request_refused_while_inactive() {
    let t = test_app().await;
    t.state.session.store().put("doc.txt", b"secret").await.unwrap();

    let response = t.app.oneshot(get("/files/doc.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(extract_text(response).await, INACTIVE_MESSAGE);
}

#[tokio::test]
async fn test_loopback_file_request_allowed_while_inactive() {
    let t = test_app().await;
    t.state.session.store().put("doc.txt", b"local").await.unwrap();

    let request = request_from(loopback_peer(), Method::GET, "/files/doc.txt", Body::empty());
    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_bytes(response).await, b"local");
}

#[tokio::test]
async fn test_referer_file_request_allowed_while_inactive() {
    let t = test_app().await;
    t.state.session.store().put("doc.txt", b"ui").await.unwrap();

    let mut request = get("/files/doc.txt");
    request
        .headers_mut()
        .insert(header::REFERER, "http://192.0.2.1:8000/".parse().unwrap());
    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_bytes(response).await, b"ui");
}

#[tokio::test]
async fn test_remote_file_request_allowed_while_active() {
    let t = test_app().await;
    t.state.session.store().put("doc.txt", b"shared").await.unwrap();
    t.app.clone().oneshot(post("/api/toggle-server")).await.unwrap();

    let response = t.app.oneshot(get("/files/doc.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_bytes(response).await, b"shared");
}

#[tokio::test]
async fn test_missing_and_traversal_names_are_not_found() {
    let t = test_app().await;
    tokio::fs::write(t.dir.path().join("outside.txt"), b"no").await.unwrap();

    for uri in ["/files/missing.txt", "/files/..%2Foutside.txt"] {
        let request = request_from(loopback_peer(), Method::GET, uri, Body::empty());
        let response = t.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

//===================
// Bulk download
//===================

#[tokio::test]
async fn test_download_all_empty_manifest() {
    let t = test_app().await;

    let response = t.app.oneshot(get("/api/download-all")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response).await;
    assert_eq!(body["code"], "EMPTY_MANIFEST");
    assert_eq!(body["error"], "No files to download");
}

#[tokio::test]
async fn test_download_all_returns_zip_attachment() {
    let t = test_app().await;
    t.state.session.store().put("a.txt", b"alpha").await.unwrap();
    t.state.session.store().put("b.txt", b"beta").await.unwrap();

    let response = t.app.oneshot(get("/api/download-all")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");

    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"PyShare-"));
    assert!(disposition.ends_with(".zip\""));

    let declared: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let bytes = extract_bytes(response).await;
    assert!(bytes.starts_with(b"PK"));
    assert_eq!(bytes.len(), declared);
}

//===================
// Connection log
//===================

#[tokio::test]
async fn test_only_tracked_paths_are_logged() {
    let t = test_app().await;

    t.app.clone().oneshot(get("/health")).await.unwrap();
    t.app.clone().oneshot(get("/")).await.unwrap();

    let mut request = get("/api/files");
    request.headers_mut().insert(header::USER_AGENT, "test-agent/1.0".parse().unwrap());
    t.app.clone().oneshot(request).await.unwrap();

    let logs = t.state.session.logs().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].path, "/api/files");
    assert_eq!(logs[0].method, "GET");
    assert_eq!(logs[0].ip, "192.0.2.10");
    assert_eq!(logs[0].user_agent, "test-agent/1.0");
}

#[tokio::test]
async fn test_logs_newest_first_with_forwarded_ip() {
    let t = test_app().await;

    let mut request = get("/api/info");
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.5".parse().unwrap());
    t.app.clone().oneshot(request).await.unwrap();

    let response = t.app.oneshot(get("/api/logs")).await.unwrap();
    let logs = extract_json(response).await;
    let logs = logs.as_array().unwrap();

    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["path"], "/api/logs");
    assert_eq!(logs[1]["path"], "/api/info");
    assert_eq!(logs[1]["ip"], "203.0.113.5");
    assert_eq!(logs[1]["userAgent"], "Unknown");
}

#[tokio::test]
async fn test_log_is_bounded() {
    let t = test_app().await;

    for _ in 0..60 {
        t.app.clone().oneshot(get("/api/info")).await.unwrap();
    }

    assert_eq!(t.state.session.logs().await.len(), pyshare_core::MAX_LOG_ENTRIES);
}

//===================
// Index page
//===================

#[tokio::test]
async fn test_index_lists_files() {
    let t = test_app().await;
    t.state.session.store().put("report.pdf", &[0u8; 2048]).await.unwrap();

    let response = t.app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    let html = extract_text(response).await;
    assert!(html.contains("href=\"/files/report.pdf\""));
    assert!(html.contains("2 KB"));
}

//===================
// Remote fetch
//===================

#[tokio::test]
async fn test_fetch_rejects_invalid_url() {
    let t = test_app().await;

    let response = t
        .app
        .oneshot(post_json("/api/fetch", json!({ "url": "ftp://192.0.2.1/" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(extract_json(response).await["code"], "INVALID_URL");
}

#[tokio::test]
async fn test_fetch_unreachable_peer_is_bad_gateway() {
    let t = test_app().await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let response = t
        .app
        .oneshot(post_json("/api/fetch", json!({ "url": format!("http://{}", addr) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(extract_json(response).await["code"], "NETWORK_FAILURE");
}

#[tokio::test]
async fn test_fetch_structured_peer() {
    let peer = test_app().await;
    peer.state.session.store().put("notes.txt", b"12345").await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let peer_app = peer.app.clone();
    tokio::spawn(async move {
        axum::serve(listener, peer_app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });

    let t = test_app().await;
    let response = t
        .app
        .oneshot(post_json("/api/fetch", json!({ "url": format!("http://{}/", addr) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["source"], "structured");
    assert_eq!(body["supportsBulkDownload"], true);

    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "notes.txt");
    assert_eq!(files[0]["size"], 5);
    assert_eq!(files[0]["url"], "/files/notes.txt");
}
