//! Unauthorized-access flood protection.
//!
//! Replying "Access denied" to every message from an unauthorized user
//! would itself trigger Telegram rate limiting. Each user gets at most one
//! denial per cooldown window; everything else is silenced and counted.

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default cooldown between denial messages to the same user (20 minutes).
pub const DENIAL_COOLDOWN_SECS: u64 = 1200;
/// Maximum number of tracked users.
const MAX_TRACKED_USERS: u64 = 10_000;

/// Per-user cooldown gate for "Access denied" replies.
pub struct DenialCooldown {
    cache: Cache<i64, ()>,
    silenced: AtomicU64,
}

impl DenialCooldown {
    /// Create a gate with the given cooldown window.
    #[must_use]
    pub fn new(cooldown_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_TRACKED_USERS)
            .time_to_live(Duration::from_secs(cooldown_secs))
            .build();

        Self {
            cache,
            silenced: AtomicU64::new(0),
        }
    }

    /// Whether a denial message may be sent to `user_id` right now.
    ///
    /// The first call per cooldown window returns `true` and starts the
    /// window; later calls are silenced. Every 100th silenced attempt is
    /// logged so a probe wave shows up without flooding the log.
    pub async fn try_acquire(&self, user_id: i64) -> bool {
        if self.cache.get(&user_id).await.is_some() {
            let count = self.silenced.fetch_add(1, Ordering::Relaxed) + 1;
            if count.is_multiple_of(100) {
                debug!(
                    silenced_total = count,
                    user_id, "Silenced unauthorized attempts"
                );
            }
            return false;
        }

        self.cache.insert(user_id, ()).await;
        true
    }

    /// Total number of silenced unauthorized attempts.
    #[must_use]
    pub fn silenced_total(&self) -> u64 {
        self.silenced.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_attempt_passes() {
        let gate = DenialCooldown::new(60);
        assert!(gate.try_acquire(12345).await);
    }

    #[tokio::test]
    async fn test_cooldown_silences_repeat_attempts() {
        let gate = DenialCooldown::new(60);

        assert!(gate.try_acquire(12345).await);
        assert!(!gate.try_acquire(12345).await);
        assert!(!gate.try_acquire(12345).await);
        assert_eq!(gate.silenced_total(), 2);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let gate = DenialCooldown::new(60);

        assert!(gate.try_acquire(111).await);
        assert!(gate.try_acquire(222).await);
    }
}
