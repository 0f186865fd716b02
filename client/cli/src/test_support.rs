//! In-process stand-in for the file service, plus a recording downloader.

use crate::api::{is_text_type, FileMetadata, TransferClient, TransferError};
use crate::config::ServiceConfig;
use crate::download::Downloader;
use async_trait::async_trait;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use reqwest::Url;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SEED_UPLOAD_TIME: &str = "2024-03-01T10:05:00Z";

struct StoredFile {
    metadata: FileMetadata,
    bytes: Vec<u8>,
}

#[derive(Clone, Default)]
struct MockState {
    files: Arc<Mutex<Vec<StoredFile>>>,
    list_requests: Arc<AtomicUsize>,
    upload_requests: Arc<AtomicUsize>,
    content_requests: Arc<AtomicUsize>,
    fail_listing: Arc<AtomicBool>,
    upload_rejection: Arc<Mutex<Option<String>>>,
}

impl MockState {
    fn insert(&self, original: &str, file_type: &str, bytes: Vec<u8>, upload_time: &str) -> FileMetadata {
        let mut files = self.files.lock().unwrap();
        let id = files.len() as i64 + 1;
        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), file_type);
        let metadata = FileMetadata {
            id,
            file_name: file_name.clone(),
            original_file_name: original.to_string(),
            file_type: file_type.to_string(),
            file_size: bytes.len() as u64,
            file_path: format!("uploads/{}", file_name),
            upload_time: upload_time.to_string(),
        };
        files.push(StoredFile {
            metadata: metadata.clone(),
            bytes,
        });
        metadata
    }

    fn find(&self, file_name: &str) -> Option<(FileMetadata, Vec<u8>)> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.metadata.file_name == file_name)
            .map(|f| (f.metadata.clone(), f.bytes.clone()))
    }
}

pub struct MockFileService {
    base_url: Url,
    state: MockState,
}

impl MockFileService {
    pub async fn spawn() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/api/files", get(list_files))
            .route("/api/files/upload", post(upload_file))
            .route("/api/files/content/:file_name", get(file_content))
            .route("/api/files/metadata/:file_name", get(file_metadata))
            .route("/api/files/download/:file_name", get(download_file))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{}/api/files", addr)).unwrap(),
            state,
        }
    }

    pub fn config(&self) -> ServiceConfig {
        ServiceConfig::from_url(self.base_url.as_str()).unwrap()
    }

    pub fn client(&self) -> TransferClient {
        TransferClient::new(&self.config()).unwrap()
    }

    pub fn seed(&self, original: &str, file_type: &str, bytes: &[u8]) -> FileMetadata {
        self.state
            .insert(original, file_type, bytes.to_vec(), SEED_UPLOAD_TIME)
    }

    pub fn fail_listing(&self, fail: bool) {
        self.state.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn reject_uploads(&self, message: &str) {
        *self.state.upload_rejection.lock().unwrap() = Some(message.to_string());
    }

    pub fn list_requests(&self) -> usize {
        self.state.list_requests.load(Ordering::SeqCst)
    }

    pub fn upload_requests(&self) -> usize {
        self.state.upload_requests.load(Ordering::SeqCst)
    }

    pub fn content_requests(&self) -> usize {
        self.state.content_requests.load(Ordering::SeqCst)
    }
}

async fn list_files(State(state): State<MockState>) -> Response {
    state.list_requests.fetch_add(1, Ordering::SeqCst);
    if state.fail_listing.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "listing unavailable").into_response();
    }

    let files: Vec<FileMetadata> = state
        .files
        .lock()
        .unwrap()
        .iter()
        .map(|f| f.metadata.clone())
        .collect();
    Json(files).into_response()
}

async fn upload_file(State(state): State<MockState>, mut multipart: Multipart) -> Response {
    state.upload_requests.fetch_add(1, Ordering::SeqCst);
    let rejection = state.upload_rejection.lock().unwrap().clone();
    if let Some(message) = rejection {
        return (StatusCode::BAD_REQUEST, message).into_response();
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("").to_string();
            let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            upload = Some((name, bytes));
        }
    }

    let Some((name, bytes)) = upload else {
        return (StatusCode::BAD_REQUEST, "Please select a file to upload").into_response();
    };
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    let metadata = state.insert(&name, extension, bytes, "2024-03-02T09:00:00.000001");

    Json(serde_json::json!({
        "message": "File uploaded successfully",
        "file": metadata,
    }))
    .into_response()
}

async fn file_content(State(state): State<MockState>, Path(file_name): Path<String>) -> Response {
    state.content_requests.fetch_add(1, Ordering::SeqCst);
    let Some((metadata, bytes)) = state.find(&file_name) else {
        return (StatusCode::NOT_FOUND, format!("File not found: {}", file_name)).into_response();
    };
    if !is_text_type(&metadata.file_type) {
        return (
            StatusCode::BAD_REQUEST,
            format!("Cannot display content for file type: {}", metadata.file_type),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "content": String::from_utf8_lossy(&bytes),
        "metadata": metadata,
    }))
    .into_response()
}

async fn file_metadata(State(state): State<MockState>, Path(file_name): Path<String>) -> Response {
    match state.find(&file_name) {
        Some((metadata, _)) => Json(metadata).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn download_file(State(state): State<MockState>, Path(file_name): Path<String>) -> Response {
    match state.find(&file_name) {
        Some((metadata, bytes)) => (
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", metadata.original_file_name),
                ),
            ],
            bytes,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Base URL of a server that accepts connections and never answers.
pub async fn spawn_silent_server() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    Url::parse(&format!("http://{}/api/files", addr)).unwrap()
}

/// Base URL of a server whose responses promise 100 bytes, send `body`,
/// then hang up.
pub async fn spawn_truncating_server(body: &'static [u8]) -> Url {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nContent-Type: application/octet-stream\r\n\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body).await;
            let _ = socket.shutdown().await;
        }
    });
    Url::parse(&format!("http://{}/api/files", addr)).unwrap()
}

/// Downloader that only remembers what it was asked to fetch.
#[derive(Clone, Default)]
pub struct RecordingDownloader {
    requests: Arc<Mutex<Vec<(Url, String)>>>,
}

impl RecordingDownloader {
    pub fn requests(&self) -> Vec<(Url, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for RecordingDownloader {
    async fn trigger_download(
        &self,
        url: &Url,
        suggested_name: &str,
    ) -> Result<PathBuf, TransferError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.clone(), suggested_name.to_string()));
        Ok(PathBuf::from("/downloads").join(suggested_name))
    }
}
