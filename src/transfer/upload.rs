//! Upload phase with in-flight progress sampling.
//!
//! The transport reports how many bytes it has read from the staged file
//! through a shared counter; a ticker samples the counter and feeds the
//! throttled reporter while the send is in flight.

use super::download::DownloadedArtifact;
use super::filename::FALLBACK_FILENAME;
use super::progress::ProgressReporter;
use super::transport::{RelayTransport, UploadCounter};
use super::TransferError;
use crate::utils::human_size;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Interval between progress-counter samples while an upload is in flight.
const UPLOAD_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Send the staged file to the chat as a document.
///
/// The caption carries the file's basename and human-readable size. On a
/// rate-limit response the send is retried exactly once after the
/// signalled wait, without progress reporting; a second failure
/// propagates.
///
/// # Errors
///
/// Returns the transport error of the failed (retried) send.
pub async fn upload(
    transport: &dyn RelayTransport,
    artifact: &DownloadedArtifact,
    progress: &mut ProgressReporter,
) -> Result<(), TransferError> {
    let name = artifact
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(FALLBACK_FILENAME);
    let caption = format!(
        "<b>{}</b>\n<b>Size:</b> {}",
        html_escape::encode_text(name),
        human_size(artifact.size as f64)
    );

    let counter: UploadCounter = Arc::new(AtomicU64::new(0));
    let mut send = transport.send_document(&artifact.path, &caption, Some(counter.clone()));
    let mut ticker = tokio::time::interval(UPLOAD_POLL_INTERVAL);

    let first_attempt = loop {
        tokio::select! {
            res = &mut send => break res,
            _ = ticker.tick() => {
                let current = counter.load(Ordering::Relaxed).min(artifact.size);
                progress
                    .maybe_notify(transport, "Uploading", current, artifact.size)
                    .await;
            }
        }
    };

    match first_attempt {
        Ok(()) => Ok(()),
        Err(TransferError::RateLimited(wait)) => {
            warn!(
                wait_secs = wait.as_secs(),
                "Rate limited while sending document; retrying once"
            );
            tokio::time::sleep(wait).await;
            // The single retry goes without progress reporting
            transport.send_document(&artifact.path, &caption, None).await
        }
        Err(e) => Err(e),
    }
}
