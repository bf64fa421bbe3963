//! End-to-end transfer orchestration.
//!
//! Sequences the download and upload phases, keeps the status message
//! current, translates every failure into a user-facing status text, and
//! guarantees the staged file is removed on every exit path.

use super::download::{DownloadedArtifact, Downloader};
use super::progress::ProgressReporter;
use super::transport::RelayTransport;
use super::{upload, TransferError};
use crate::utils::human_size;
use tracing::{debug, error, info, warn};

/// Status shown while the inbound URL is being validated.
pub const STATUS_CHECKING: &str = "🔍 <b>Checking URL…</b>";
/// Status shown when the download phase starts.
pub const STATUS_DOWNLOADING: &str = "⬇️ <b>Downloading…</b>";
/// Status shown when the upload phase starts.
pub const STATUS_UPLOADING: &str = "⬆️ <b>Uploading to Telegram…</b>";
/// Terminal status for a completed transfer.
pub const STATUS_DONE: &str = "✅ <b>Upload complete!</b>";

/// Longest diagnostic excerpt shown to the user for unrecognized errors.
const ERROR_EXCERPT_CHARS: usize = 1000;

/// Run one transfer to completion.
///
/// Every outcome, success or failure, ends with a terminal status edit;
/// errors never propagate out of the orchestrator.
pub async fn run(transport: &dyn RelayTransport, downloader: &Downloader, url: &str) {
    let mut progress = ProgressReporter::new();

    set_status(transport, STATUS_DOWNLOADING).await;

    let artifact = match downloader.download(url, transport, &mut progress).await {
        Ok(artifact) => artifact,
        Err(e) => {
            report_failure(transport, url, &e).await;
            return;
        }
    };

    set_status(transport, STATUS_UPLOADING).await;
    let uploaded = upload::upload(transport, &artifact, &mut progress).await;

    // The staged file must not survive the transfer, whatever the outcome
    cleanup(&artifact).await;

    match uploaded {
        Ok(()) => {
            info!(url, size = artifact.size, "Transfer complete");
            set_status(transport, STATUS_DONE).await;
        }
        Err(e) => report_failure(transport, url, &e).await,
    }
}

/// Update the status message, tolerating edit failures.
///
/// A rate-limit response suspends for the signalled duration and retries
/// the edit once; other failures are logged and dropped.
async fn set_status(transport: &dyn RelayTransport, text: &str) {
    match transport.update_status(text).await {
        Ok(()) => {}
        Err(TransferError::RateLimited(wait)) => {
            debug!(
                wait_secs = wait.as_secs(),
                "Rate limited while updating status; backing off"
            );
            tokio::time::sleep(wait).await;
            if let Err(e) = transport.update_status(text).await {
                warn!("Failed to update status message after backoff: {e}");
            }
        }
        Err(e) => warn!("Failed to update status message: {e}"),
    }
}

async fn report_failure(transport: &dyn RelayTransport, url: &str, err: &TransferError) {
    let text = match err {
        TransferError::InvalidResponse { status, reason } => {
            warn!(url, status, "Remote returned a non-success status");
            format!("❌ <b>Error:</b> HTTP {status} — {reason}")
        }
        TransferError::SizeLimitExceeded { size, limit } => {
            warn!(url, size, limit, "Size limit exceeded");
            format!(
                "❌ <b>Error:</b> File too large ({}). The limit is {}.",
                human_size(*size as f64),
                human_size(*limit as f64)
            )
        }
        TransferError::Connection(e) => {
            error!(url, error = %e, "Connection error during download");
            "❌ <b>Connection error.</b>\nMake sure the URL is valid and reachable.".to_string()
        }
        other => {
            error!(url, error = %other, "Unhandled transfer error");
            format!(
                "❌ <b>Something went wrong:</b>\n<pre>{}</pre>",
                html_escape::encode_text(&tail_chars(&other.to_string(), ERROR_EXCERPT_CHARS))
            )
        }
    };

    set_status(transport, &text).await;
}

async fn cleanup(artifact: &DownloadedArtifact) {
    if let Err(e) = tokio::fs::remove_file(&artifact.path).await {
        warn!(
            path = %artifact.path.display(),
            error = %e,
            "Failed to remove staged file"
        );
    }
    if let Some(dir) = artifact.path.parent() {
        // The per-transfer staging directory is empty once the file is gone
        let _ = tokio::fs::remove_dir(dir).await;
    }
}

// Keeps the tail of the diagnostic, where the root cause usually sits.
fn tail_chars(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    s.chars().skip(count - max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::tail_chars;

    #[test]
    fn test_tail_chars_keeps_end() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("short", 100), "short");
        // UTF-8 safe
        assert_eq!(tail_chars("привет", 2), "ет");
    }
}
