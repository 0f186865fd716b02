mod error;
mod types;

pub use error::TransferError;
pub use types::{is_text_type, FileContentResponse, FileMetadata};

use crate::config::ServiceConfig;
use error::error_message;
use reqwest::{
    multipart::{Form, Part},
    StatusCode, Url,
};
use std::path::Path;
use std::time::Duration;
use types::UploadResponse;

/// REST client for the file service rooted at `ServiceConfig::base_url`.
#[derive(Debug, Clone)]
pub struct TransferClient {
    base_url: Url,
    download_timeout: Duration,
    client: reqwest::Client,
}

impl TransferClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            base_url: config.base_url.clone(),
            download_timeout: config.download_timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL extended with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Check response status; on error, read body for detail message.
    async fn ensure_ok(resp: reqwest::Response) -> Result<reqwest::Response, TransferError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = error_message(&body);
        if status == StatusCode::NOT_FOUND {
            Err(TransferError::NotFound { message })
        } else {
            Err(TransferError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }

    pub async fn list_files(&self) -> Result<Vec<FileMetadata>, TransferError> {
        let resp = self.client.get(self.endpoint(&[])).send().await?;
        let files: Vec<FileMetadata> = Self::ensure_ok(resp).await?.json().await?;
        tracing::debug!(count = files.len(), "fetched file listing");
        Ok(files)
    }

    /// Upload one local file as multipart field `file`. The server assigns
    /// the storage key.
    pub async fn upload_file(&self, path: &Path) -> Result<FileMetadata, TransferError> {
        let data = tokio::fs::read(path).await.map_err(TransferError::io(path))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let part = Part::bytes(data)
            .file_name(file_name.clone())
            .mime_str(mime.as_ref())?;
        let form = Form::new().part("file", part);

        let resp = self
            .client
            .post(self.endpoint(&["upload"]))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = Self::ensure_ok(resp).await?.json().await?;
        let metadata = body.into_metadata();

        tracing::info!(
            original = %file_name,
            file_name = %metadata.file_name,
            size = metadata.file_size,
            "file uploaded"
        );
        Ok(metadata)
    }

    pub async fn fetch_content(&self, file_name: &str) -> Result<FileContentResponse, TransferError> {
        let resp = self
            .client
            .get(self.endpoint(&["content", file_name]))
            .send()
            .await?;
        Ok(Self::ensure_ok(resp).await?.json().await?)
    }

    pub async fn fetch_metadata(&self, file_name: &str) -> Result<FileMetadata, TransferError> {
        let resp = self
            .client
            .get(self.endpoint(&["metadata", file_name]))
            .send()
            .await?;
        Ok(Self::ensure_ok(resp).await?.json().await?)
    }

    /// Where the raw bytes of `file_name` can be fetched. No request is made.
    pub fn download_url(&self, file_name: &str) -> Url {
        self.endpoint(&["download", file_name])
    }

    /// Start a download and return the response once its status is known to
    /// be good. The body is left for the caller to stream.
    pub async fn open_download(&self, url: &Url) -> Result<reqwest::Response, TransferError> {
        let resp = self
            .client
            .get(url.clone())
            .timeout(self.download_timeout)
            .send()
            .await?;
        Self::ensure_ok(resp).await
    }
}
