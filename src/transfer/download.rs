//! Streaming HTTP download engine.
//!
//! Streams a remote resource into a per-transfer staging directory,
//! enforcing the configured size limit and reporting progress through the
//! shared [`ProgressReporter`].

use super::filename;
use super::progress::ProgressReporter;
use super::transport::RelayTransport;
use super::TransferError;
use crate::config::{
    Settings, DOWNLOAD_BUFFER_SIZE, DOWNLOAD_CONNECT_TIMEOUT_SECS, DOWNLOAD_READ_TIMEOUT_SECS,
};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;
use uuid::Uuid;

/// A file produced by a completed download.
///
/// Exclusively owned by the orchestrator, which removes the backing file
/// once the transfer reaches a terminal state.
#[derive(Debug)]
pub struct DownloadedArtifact {
    /// Final path of the staged file on disk.
    pub path: PathBuf,
    /// Number of bytes written.
    pub size: u64,
}

/// Streaming downloader, configured once at startup and shared by all
/// transfers.
pub struct Downloader {
    client: reqwest::Client,
    download_dir: PathBuf,
    max_file_size: u64,
}

impl Downloader {
    /// Build a downloader from the application settings.
    ///
    /// The HTTP client follows redirects and bounds the connect and
    /// per-read times; there is no total-transfer deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(settings: &Settings) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(DOWNLOAD_CONNECT_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(DOWNLOAD_READ_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            download_dir: PathBuf::from(&settings.download_dir),
            max_file_size: settings.max_file_size,
        })
    }

    /// Stream `url` into the staging directory.
    ///
    /// Progress is reported after each received chunk when the total size
    /// is known from the `Content-Length` header.
    ///
    /// # Errors
    ///
    /// - [`TransferError::InvalidResponse`] on a non-2xx status.
    /// - [`TransferError::SizeLimitExceeded`] when the declared length is
    ///   over the limit (before any byte is written) or the stream runs
    ///   past it.
    /// - [`TransferError::Connection`] / [`TransferError::Io`] on network
    ///   or filesystem failures. No partial file survives an error.
    pub async fn download(
        &self,
        url: &str,
        transport: &dyn RelayTransport,
        progress: &mut ProgressReporter,
    ) -> Result<DownloadedArtifact, TransferError> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransferError::InvalidResponse {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        // 0 means the server did not declare a length
        let total = resp.content_length().unwrap_or(0);
        if total > self.max_file_size {
            return Err(TransferError::SizeLimitExceeded {
                size: total,
                limit: self.max_file_size,
            });
        }

        let name = filename::resolve(resp.headers(), url);
        // Each transfer stages into its own subdirectory so concurrent
        // downloads of the same resource cannot clobber each other.
        let dir = self.download_dir.join(Uuid::new_v4().simple().to_string());
        fs::create_dir_all(&dir).await?;
        let path = dir.join(&name);

        info!(url, file = %path.display(), total, "Starting download");

        match self
            .stream_to_file(resp, &path, total, transport, progress)
            .await
        {
            Ok(size) => Ok(DownloadedArtifact { path, size }),
            Err(e) => {
                // Never leave a partial file behind
                let _ = fs::remove_file(&path).await;
                let _ = fs::remove_dir(&dir).await;
                Err(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        resp: reqwest::Response,
        path: &Path,
        total: u64,
        transport: &dyn RelayTransport,
        progress: &mut ProgressReporter,
    ) -> Result<u64, TransferError> {
        let file = fs::File::create(path).await?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_BUFFER_SIZE, file);
        let mut stream = resp.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            // Enforced even when the server declared no length
            if downloaded > self.max_file_size {
                return Err(TransferError::SizeLimitExceeded {
                    size: downloaded,
                    limit: self.max_file_size,
                });
            }

            if total > 0 {
                progress
                    .maybe_notify(transport, "Downloading", downloaded, total)
                    .await;
            }
        }
        writer.flush().await?;

        Ok(downloaded)
    }
}
