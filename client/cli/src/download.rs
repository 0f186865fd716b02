//! Download capability.
//!
//! The listing and viewer only describe a download as a URL plus the name
//! the user should see; a [`Downloader`] decides what "downloading" means on
//! the current platform.

use crate::api::{TransferClient, TransferError};
use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// A download the user asked for: where the bytes live and the save-as name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: Url,
    pub suggested_name: String,
}

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch `url` and hand it to the user under `suggested_name`. Returns
    /// where the file ended up.
    async fn trigger_download(
        &self,
        url: &Url,
        suggested_name: &str,
    ) -> Result<PathBuf, TransferError>;
}

/// Saves downloads into a local directory.
pub struct FileSaver {
    client: TransferClient,
    dir: PathBuf,
}

impl FileSaver {
    pub fn new(client: TransferClient, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }
}

#[async_trait]
impl Downloader for FileSaver {
    async fn trigger_download(
        &self,
        url: &Url,
        suggested_name: &str,
    ) -> Result<PathBuf, TransferError> {
        let mut resp = self.client.open_download(url).await?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(TransferError::io(&self.dir))?;
        let path = unique_path(&self.dir, &sanitize_file_name(suggested_name));
        let partial = partial_path(&path);

        let written = match write_body(&mut resp, &partial).await {
            Ok(written) => written,
            Err(err) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(err);
            }
        };
        if let Err(err) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(TransferError::io(&path)(err));
        }

        tracing::info!(path = %path.display(), bytes = written, "download saved");
        Ok(path)
    }
}

/// Stream the response body into `path`, returning the byte count.
async fn write_body(resp: &mut reqwest::Response, path: &Path) -> Result<u64, TransferError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(TransferError::io(path))?;

    let mut written = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await.map_err(TransferError::io(path))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(TransferError::io(path))?;
    Ok(written)
}

/// Hidden sibling the body is written to until it is complete.
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.part", name))
}

/// Reduce a server-supplied name to a single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        "download".to_string()
    } else {
        base.to_string()
    }
}

/// First free path for `name` in `dir`, inserting " (n)" before the
/// extension on collision.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut n = 1;
    loop {
        let numbered = match ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(numbered);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
