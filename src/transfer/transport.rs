//! Transport seam between the relay pipeline and the chat platform.
//!
//! The pipeline talks to Telegram only through [`RelayTransport`], which
//! keeps the core testable against a recording mock.

use super::TransferError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Byte counter shared between an in-flight upload and the progress loop.
///
/// The transport adds every byte it reads from the staged file; the upload
/// phase samples it to drive progress notifications.
pub type UploadCounter = Arc<AtomicU64>;

/// Chat-platform operations the pipeline needs for one transfer.
///
/// Implementations are bound to a single chat and a single status message.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Edit the transfer's status message in place.
    ///
    /// Implementations must swallow "message is not modified" responses
    /// and surface platform backoff as [`TransferError::RateLimited`].
    async fn update_status(&self, text: &str) -> Result<(), TransferError>;

    /// Deliver the staged file to the chat as a document attachment.
    ///
    /// When `progress` is given, the implementation wires it into its
    /// reader so the caller can observe upload progress.
    async fn send_document(
        &self,
        path: &Path,
        caption: &str,
        progress: Option<UploadCounter>,
    ) -> Result<(), TransferError>;
}
