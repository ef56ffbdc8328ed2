//! Reload guard for destructive recovery
//!
//! A full reload is the only hard reset an agent has, and the only path to
//! it. The guard spaces self-triggered reloads at least `interval` apart so
//! a persistently bad page cannot put an agent into a reload storm.

use chrono::Local;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use warden_core::{Result, WardenError};

use crate::page::Page;

/// Rate limiter in front of [`Page::reload`]
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tokio::time::Instant;
/// use warden_agent::ReloadGuard;
///
/// let mut guard = ReloadGuard::new(Duration::from_secs(60));
/// let now = Instant::now();
///
/// assert!(guard.check(now).is_ok());
/// guard.record(now);
/// assert!(guard.check(now + Duration::from_secs(10)).is_err());
/// assert!(guard.check(now + Duration::from_secs(60)).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ReloadGuard {
    interval: Duration,
    last_reload_at: Option<Instant>,
    suppressed: u32,
}

impl ReloadGuard {
    /// Create a guard that allows one reload per `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_reload_at: None,
            suppressed: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When this agent last reloaded the page, if ever
    pub fn last_reload_at(&self) -> Option<Instant> {
        self.last_reload_at
    }

    /// Number of reload requests turned down so far (for monitoring)
    pub fn suppressed_count(&self) -> u32 {
        self.suppressed
    }

    /// Time until a reload is allowed again, zero if allowed now
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_reload_at {
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Whether a reload is allowed at `now`
    pub fn check(&self, now: Instant) -> Result<()> {
        let remaining = self.remaining(now);
        if remaining.is_zero() {
            Ok(())
        } else {
            Err(WardenError::ReloadSuppressed { remaining })
        }
    }

    /// Record a performed reload
    ///
    /// `last_reload_at` never moves backwards.
    pub fn record(&mut self, now: Instant) {
        self.last_reload_at = Some(match self.last_reload_at {
            Some(last) if last > now => last,
            _ => now,
        });
    }

    /// Reload the page unless the guard interval has not elapsed
    ///
    /// Returns `true` if the reload was performed. A suppressed request is
    /// logged and dropped; nothing is queued or retried.
    pub async fn request_reload(&mut self, page: &dyn Page, now: Instant, reason: &str) -> bool {
        if let Err(e) = self.check(now) {
            self.suppressed += 1;
            warn!("{}: skip reload ({})", e, reason);
            return false;
        }

        info!(
            "Reloading: {} @ {}",
            reason,
            Local::now().format("%H:%M:%S")
        );
        self.record(now);

        match page.reload().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Reload failed: {}", e);
                false
            }
        }
    }
}

impl Default for ReloadGuard {
    fn default() -> Self {
        // One reload per minute
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MockPage;

    #[test]
    fn test_first_reload_allowed() {
        let guard = ReloadGuard::default();
        assert!(guard.check(Instant::now()).is_ok());
        assert_eq!(guard.last_reload_at(), None);
    }

    #[test]
    fn test_remaining_counts_down() {
        let mut guard = ReloadGuard::new(Duration::from_secs(60));
        let t0 = Instant::now();
        guard.record(t0);

        assert_eq!(guard.remaining(t0 + Duration::from_secs(10)), Duration::from_secs(50));
        assert_eq!(guard.remaining(t0 + Duration::from_secs(61)), Duration::ZERO);
        assert!(matches!(
            guard.check(t0 + Duration::from_secs(59)),
            Err(WardenError::ReloadSuppressed { .. })
        ));
    }

    #[test]
    fn test_record_never_moves_backwards() {
        let mut guard = ReloadGuard::default();
        let t0 = Instant::now();
        guard.record(t0 + Duration::from_secs(5));
        guard.record(t0);
        assert_eq!(guard.last_reload_at(), Some(t0 + Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_suppressed_reload_does_not_touch_page() {
        let page = MockPage::new();
        let mut guard = ReloadGuard::new(Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(guard.request_reload(&page, t0, "stalled session").await);
        assert!(
            !guard
                .request_reload(&page, t0 + Duration::from_secs(10), "stalled session")
                .await
        );

        assert_eq!(page.reloads().len(), 1);
        assert_eq!(guard.last_reload_at(), Some(t0));
        assert_eq!(guard.suppressed_count(), 1);
    }

    #[tokio::test]
    async fn test_performed_reloads_are_spaced() {
        let page = MockPage::new();
        let mut guard = ReloadGuard::new(Duration::from_secs(60));
        let t0 = Instant::now();

        // A request every 7 seconds for five minutes
        let mut performed = Vec::new();
        for i in 0..43u64 {
            let now = t0 + Duration::from_secs(i * 7);
            if guard.request_reload(&page, now, "test").await {
                performed.push(now);
            }
        }

        assert!(performed.len() > 1);
        for pair in performed.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(60));
        }
    }
}
