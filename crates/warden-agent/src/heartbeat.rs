//! Heartbeat timer handle
//!
//! The recurring supervisory tick of an agent. Ticks run inline in the
//! agent's task, so they never overlap each other or the boot sequence.

use std::time::Duration;
use tokio::time::Instant;

use crate::clock::Clock;

/// Recurring timer owned by one agent
///
/// The first tick is due one period after arming. Cancelling is idempotent
/// and takes effect at the next wait: a tick already running finishes, but
/// no further tick is delivered.
#[derive(Debug)]
pub struct HeartbeatHandle {
    period: Duration,
    next_due: Instant,
    cancelled: bool,
}

impl HeartbeatHandle {
    /// Arm a heartbeat whose first tick is due at `armed_at + period`
    pub fn arm(armed_at: Instant, period: Duration) -> Self {
        Self {
            period,
            next_due: armed_at + period,
            cancelled: false,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Stop delivering ticks
    ///
    /// Returns `true` only for the call that actually cancelled.
    pub fn cancel(&mut self) -> bool {
        !std::mem::replace(&mut self.cancelled, true)
    }

    /// Wait for the next tick
    ///
    /// Returns `false` without waiting once cancelled. A tick that overran
    /// its successor's due time pushes the schedule out by a full period
    /// rather than firing back-to-back.
    pub async fn wait_next(&mut self, clock: &dyn Clock) -> bool {
        if self.cancelled {
            return false;
        }

        let now = clock.now();
        if self.next_due > now {
            clock.sleep(self.next_due - now).await;
        }

        let now = clock.now();
        self.next_due += self.period;
        if self.next_due <= now {
            self.next_due = now + self.period;
        }

        !self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_ticks_on_period() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        let mut heartbeat = HeartbeatHandle::arm(t0, Duration::from_secs(10));

        assert!(heartbeat.wait_next(&clock).await);
        assert_eq!(clock.now() - t0, Duration::from_secs(10));
        assert!(heartbeat.wait_next(&clock).await);
        assert_eq!(clock.now() - t0, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_overrun_does_not_burst() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        let mut heartbeat = HeartbeatHandle::arm(t0, Duration::from_secs(10));

        assert!(heartbeat.wait_next(&clock).await);
        // Tick body ran for 25s
        clock.advance(Duration::from_secs(25));

        assert!(heartbeat.wait_next(&clock).await);
        assert_eq!(clock.now() - t0, Duration::from_secs(35));
        assert_eq!(heartbeat.next_due() - t0, Duration::from_secs(45));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let clock = ManualClock::new();
        let mut heartbeat = HeartbeatHandle::arm(clock.now(), Duration::from_secs(10));

        assert!(heartbeat.cancel());
        assert!(!heartbeat.cancel());
        assert!(heartbeat.is_cancelled());

        assert!(!heartbeat.wait_next(&clock).await);
        assert!(clock.sleeps().is_empty());
    }
}
