//! Progress rendering and edit throttling.
//!
//! Both the download and upload phases push their byte counts through one
//! [`ProgressReporter`] so the user sees a single consistent presentation.

use super::transport::RelayTransport;
use super::TransferError;
use crate::config::PROGRESS_EDIT_INTERVAL_SECS;
use crate::utils::human_size;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Number of segments in the rendered progress bar.
const BAR_SEGMENTS: usize = 20;

/// Throttled progress reporter bound to one transfer.
///
/// Owns the timing state that decides whether a status edit is due. At most
/// one edit goes out per [`PROGRESS_EDIT_INTERVAL_SECS`]; calls in between
/// return immediately.
pub struct ProgressReporter {
    started_at: Instant,
    last_edit: Option<Instant>,
}

impl ProgressReporter {
    /// Create a reporter; the transfer's start time is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            last_edit: None,
        }
    }

    /// Render and push a progress update, at most once per interval.
    ///
    /// `current` and `total` are byte counts; a `total` of zero renders as
    /// 0%. Edit failures never abort the transfer: a rate-limit response
    /// suspends the caller for the signalled duration without retrying the
    /// same edit, anything else is logged and dropped.
    pub async fn maybe_notify(
        &mut self,
        transport: &dyn RelayTransport,
        action: &str,
        current: u64,
        total: u64,
    ) {
        let now = Instant::now();
        let interval = Duration::from_secs(PROGRESS_EDIT_INTERVAL_SECS);
        if self
            .last_edit
            .is_some_and(|last| now.duration_since(last) < interval)
        {
            return;
        }
        self.last_edit = Some(now);

        let elapsed = now.duration_since(self.started_at).as_secs_f64();
        let speed = if elapsed > 0.0 {
            current as f64 / elapsed
        } else {
            0.0
        };
        let pct = if total > 0 {
            current as f64 * 100.0 / total as f64
        } else {
            0.0
        };

        let text = render_progress(action, pct, current, total, speed);
        match transport.update_status(&text).await {
            Ok(()) => {}
            Err(TransferError::RateLimited(wait)) => {
                debug!(
                    wait_secs = wait.as_secs(),
                    "Rate limited while editing progress; backing off"
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => warn!("Failed to edit progress message: {e}"),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn render_progress(action: &str, pct: f64, current: u64, total: u64, speed: f64) -> String {
    let filled = ((pct / 5.0) as usize).min(BAR_SEGMENTS);
    format!(
        "<b>{action}…</b>\n\
         <code>[{}{}]</code> {pct:.1}%\n\
         <b>Done:</b> {} / {}\n\
         <b>Speed:</b> {}/s",
        "█".repeat(filled),
        "░".repeat(BAR_SEGMENTS - filled),
        human_size(current as f64),
        human_size(total as f64),
        human_size(speed),
    )
}
