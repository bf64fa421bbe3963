//! The streaming relay pipeline.
//!
//! A transfer downloads a remote resource into a per-transfer staging
//! directory, re-uploads it to the originating chat as a document, and
//! removes the staged file on every exit path. Progress for both phases
//! flows through one throttled status-message reporter.

/// Streaming HTTP download engine.
pub mod download;
/// Destination filename resolution.
pub mod filename;
/// Progress rendering and edit throttling.
pub mod progress;
/// End-to-end transfer orchestration.
pub mod relay;
/// Transport seam between the pipeline and the chat platform.
pub mod transport;
/// Upload phase with in-flight progress sampling.
pub mod upload;

pub use download::{DownloadedArtifact, Downloader};
pub use progress::ProgressReporter;
pub use transport::RelayTransport;

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the relay pipeline.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The remote server answered with a non-success status.
    #[error("HTTP {status} {reason}")]
    InvalidResponse {
        /// HTTP status code.
        status: u16,
        /// Canonical reason phrase for the status.
        reason: String,
    },
    /// The resource is larger than the configured maximum.
    #[error("size {size} exceeds the configured limit of {limit} bytes")]
    SizeLimitExceeded {
        /// Offending size in bytes (declared or streamed so far).
        size: u64,
        /// Configured maximum in bytes.
        limit: u64,
    },
    /// Network-layer failure while talking to the remote server.
    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),
    /// Local filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The chat platform asked us to back off for the given duration.
    #[error("rate limited, retry after {0:?}")]
    RateLimited(Duration),
    /// Any other chat platform failure.
    #[error("telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}
