//! Tests for the HTTP transport against a local server.
//!
//! The server honors `Range: bytes=<start>-` on `/data.bin`, ignores it on
//! `/plain.bin`, refuses every range without saying why on `/strict.bin`,
//! echoes the user agent on `/agent.txt` and never finishes `/endless.bin`.

use trawl::download::DownloadRequest;
use trawl::http::DEFAULT_USER_AGENT;
use trawl::{DownloadRegistry, RegistryBuilder};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

mod common;
use common::helpers::*;

const SIZE: usize = 4096;

fn range_start(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::RANGE)?
        .to_str()
        .ok()?
        .strip_prefix("bytes=")?
        .trim_end_matches('-')
        .parse()
        .ok()
}

async fn ranged(State(body): State<Arc<Vec<u8>>>, headers: HeaderMap) -> Response {
    let len = body.len();
    match range_start(&headers) {
        None => (StatusCode::OK, body.to_vec()).into_response(),
        Some(start) if start >= len => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{}", len))],
        )
            .into_response(),
        Some(start) => (
            StatusCode::PARTIAL_CONTENT,
            [(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, len - 1, len),
            )],
            body[start..].to_vec(),
        )
            .into_response(),
    }
}

async fn plain(State(body): State<Arc<Vec<u8>>>) -> Response {
    (StatusCode::OK, body.to_vec()).into_response()
}

async fn strict(State(body): State<Arc<Vec<u8>>>, headers: HeaderMap) -> Response {
    match range_start(&headers) {
        Some(_) => StatusCode::RANGE_NOT_SATISFIABLE.into_response(),
        None => (StatusCode::OK, body.to_vec()).into_response(),
    }
}

async fn agent(headers: HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn endless() -> Response {
    let first = futures::stream::once(async { Ok::<_, std::io::Error>(vec![7u8; 100]) });
    let stream = futures::StreamExt::chain(first, futures::stream::pending());
    (
        [(header::CONTENT_LENGTH, SIZE.to_string())],
        Body::from_stream(stream),
    )
        .into_response()
}

async fn serve() -> (SocketAddr, Vec<u8>) {
    let body = create_test_content(SIZE);
    let app = Router::new()
        .route("/data.bin", get(ranged))
        .route("/plain.bin", get(plain))
        .route("/strict.bin", get(strict))
        .route("/agent.txt", get(agent))
        .route("/endless.bin", get(endless))
        .with_state(Arc::new(body.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, body)
}

fn registry(dir: &Path) -> DownloadRegistry {
    RegistryBuilder::new()
        .directory(dir.to_path_buf())
        .retries(0)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_full_download() {
    let (addr, body) = serve().await;
    let dir = create_temp_dir();
    let registry = registry(dir.path());
    let url = format!("http://{}/data.bin", addr);
    let (callbacks, mut seen) = recorder();

    registry.request(DownloadRequest::new(&url).directory("out"), callbacks);

    let (updates, terminal) = seen.until_terminal().await;
    let path = dir.path().join("out").join("data.bin");
    assert_eq!(terminal, Seen::Complete(url.clone(), path.clone()));
    assert_eq!(updates.first(), Some(&Seen::Progress(url.clone(), 0.0)));
    assert!(updates.contains(&Seen::Progress(url.clone(), 1.0)));
    assert_eq!(fs::read(&path).unwrap(), body);
    assert!(!registry.is_downloading(&url));
    assert!(registry.file_exists_for_url(&url, Some("out")));
}

#[tokio::test]
async fn test_resume_with_range_request() {
    let (addr, body) = serve().await;
    let dir = create_temp_dir();
    let registry = registry(dir.path());
    let url = format!("http://{}/data.bin", addr);
    create_temp_file(dir.path(), "data.bin.part", &body[..1024]);
    let (callbacks, mut seen) = recorder();

    registry.download(&url, callbacks);

    let (updates, terminal) = seen.until_terminal().await;
    assert!(matches!(terminal, Seen::Complete(..)));
    assert_eq!(updates.first(), Some(&Seen::Progress(url.clone(), 0.25)));
    assert_eq!(fs::read(dir.path().join("data.bin")).unwrap(), body);
    assert!(!dir.path().join("data.bin.part").exists());
}

#[tokio::test]
async fn test_server_ignoring_range_starts_over() {
    let (addr, body) = serve().await;
    let dir = create_temp_dir();
    let registry = registry(dir.path());
    let url = format!("http://{}/plain.bin", addr);
    create_temp_file(dir.path(), "plain.bin.part", &[0xff; 100]);
    let (callbacks, mut seen) = recorder();

    registry.download(&url, callbacks);

    let (_, terminal) = seen.until_terminal().await;
    assert!(matches!(terminal, Seen::Complete(..)));
    assert_eq!(fs::read(dir.path().join("plain.bin")).unwrap(), body);
}

#[tokio::test]
async fn test_partial_already_complete() {
    let (addr, body) = serve().await;
    let dir = create_temp_dir();
    let registry = registry(dir.path());
    let url = format!("http://{}/data.bin", addr);
    create_temp_file(dir.path(), "data.bin.part", &body);
    let (callbacks, mut seen) = recorder();

    registry.download(&url, callbacks);

    let (updates, terminal) = seen.until_terminal().await;
    assert!(matches!(terminal, Seen::Complete(..)));
    assert_eq!(updates, vec![Seen::Progress(url.clone(), 1.0)]);
    assert_file_size(&dir.path().join("data.bin"), SIZE as u64);
}

#[tokio::test]
async fn test_unsatisfiable_range_starts_over() {
    let (addr, body) = serve().await;
    let dir = create_temp_dir();
    let registry = registry(dir.path());
    let url = format!("http://{}/strict.bin", addr);
    create_temp_file(dir.path(), "strict.bin.part", &[0xff; SIZE + 10]);
    let (callbacks, mut seen) = recorder();

    registry.download(&url, callbacks);

    let (updates, terminal) = seen.until_terminal().await;
    assert!(matches!(terminal, Seen::Complete(..)));
    assert_eq!(updates.first(), Some(&Seen::Progress(url.clone(), 0.0)));
    assert_eq!(fs::read(dir.path().join("strict.bin")).unwrap(), body);
}

#[tokio::test]
async fn test_missing_file_reports_http_error() {
    let (addr, _) = serve().await;
    let dir = create_temp_dir();
    let registry = registry(dir.path());
    let url = format!("http://{}/missing.bin", addr);
    let (callbacks, mut seen) = recorder();

    registry.download(&url, callbacks);

    match seen.next().await {
        Seen::Error(id, message) => {
            assert_eq!(id, url);
            assert!(message.contains("404"), "unexpected message {}", message);
        }
        other => panic!("expected an error, got {:?}", other),
    }
    assert!(!registry.is_downloading(&url));
    assert!(!dir.path().join("missing.bin").exists());
}

#[tokio::test]
async fn test_user_agent_header() {
    let (addr, _) = serve().await;
    let dir = create_temp_dir();
    let registry = registry(dir.path());
    let url = format!("http://{}/agent.txt", addr);

    let (callbacks, mut seen) = recorder();
    registry.request(DownloadRequest::new(&url).file_name("default.txt"), callbacks);
    seen.until_terminal().await;
    assert_eq!(
        fs::read_to_string(dir.path().join("default.txt")).unwrap(),
        DEFAULT_USER_AGENT
    );

    registry.set_user_agent(Some(TEST_USER_AGENT.into()));
    let (callbacks, mut seen) = recorder();
    registry.request(DownloadRequest::new(&url).file_name("custom.txt"), callbacks);
    seen.until_terminal().await;
    assert_eq!(
        fs::read_to_string(dir.path().join("custom.txt")).unwrap(),
        TEST_USER_AGENT
    );
}

#[tokio::test]
async fn test_cancel_running_transfer_keeps_partial() {
    let (addr, _) = serve().await;
    let dir = create_temp_dir();
    let registry = registry(dir.path());
    let url = format!("http://{}/endless.bin", addr);
    let (callbacks, mut seen) = recorder();

    registry.download(&url, callbacks);
    loop {
        if let Seen::Progress(_, fraction) = seen.next().await {
            if fraction > 0.0 {
                break;
            }
        }
    }
    registry.cancel(&url);
    assert!(!registry.is_downloading(&url));

    let (_, terminal) = seen.until_terminal().await;
    assert_eq!(terminal, Seen::Cancel(url.clone()));
    let partial = dir.path().join("endless.bin.part");
    wait_until(|| fs::metadata(&partial).map(|m| m.len()).unwrap_or(0) == 100).await;
    assert!(!dir.path().join("endless.bin").exists());
}
