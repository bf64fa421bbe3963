//! Utility functions for size formatting, text truncation, and resilient
//! Telegram API calls.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Formats a byte count as a human-readable size with two decimals.
///
/// Units scale by 1024 from bytes up through petabytes; the smallest unit
/// keeping the magnitude below 1024 is chosen.
///
/// # Examples
///
/// ```
/// use url_courier::utils::human_size;
/// assert_eq!(human_size(1536.0), "1.50 KB");
/// assert_eq!(human_size(0.0), "0.00 B");
/// ```
#[must_use]
pub fn human_size(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes;
    for unit in UNITS {
        if size.abs() < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} PB")
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use url_courier::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Used for one-shot operations such as creating the status message, which
/// may fail on transient network errors. The strategy adds jitter to avoid
/// thundering herd; tunables live in [`crate::config`].
///
/// # Errors
///
/// Returns the last error if all attempts fail.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size_units() {
        assert_eq!(human_size(0.0), "0.00 B");
        assert_eq!(human_size(1023.0), "1023.00 B");
        assert_eq!(human_size(1024.0), "1.00 KB");
        assert_eq!(human_size(1536.0), "1.50 KB");
        assert_eq!(human_size(1024.0 * 1024.0), "1.00 MB");
        assert_eq!(human_size(2.5 * 1024.0 * 1024.0 * 1024.0), "2.50 GB");
        assert_eq!(human_size(1024f64.powi(4)), "1.00 TB");
        // Petabytes are the unbounded top unit
        assert_eq!(human_size(1024f64.powi(5) * 3.0), "3.00 PB");
    }

    #[test]
    fn test_truncate_str_unicode() {
        let s = "Привет, мир!";
        assert_eq!(truncate_str(s, 6), "Привет");
        assert_eq!(truncate_str(s, 50), "Привет, мир!");
    }

    #[tokio::test]
    async fn test_retry_eventually_succeeds() {
        let mut attempts = 0;
        let result: Result<u32> = retry_telegram_operation(|| {
            attempts += 1;
            let attempt = attempts;
            async move {
                if attempt < 3 {
                    Err(anyhow::anyhow!("transient"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some(3));
    }
}
