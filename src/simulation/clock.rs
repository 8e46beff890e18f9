//! Cancellable fixed-interval ticker

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::types::Tick;

/// Result of waiting for the next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Tick(Tick),
    Cancelled,
}

/// Emits tick 1, 2, 3, ... one interval apart until its token is cancelled.
///
/// Deadlines advance by exactly one interval per tick. If the caller falls
/// more than two intervals behind, the schedule restarts from now instead
/// of firing a burst of catch-up ticks.
pub struct Ticker {
    interval: Duration,
    next_deadline: Instant,
    tick: Tick,
    cancel: CancellationToken,
}

impl Ticker {
    pub fn new(interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            interval,
            next_deadline: Instant::now() + interval,
            tick: 0,
            cancel,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next tick. Returns immediately with
    /// [`TickOutcome::Cancelled`] once the token fires, even mid-wait.
    pub async fn next_tick(&mut self) -> TickOutcome {
        if self.cancel.is_cancelled() {
            return TickOutcome::Cancelled;
        }

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => return TickOutcome::Cancelled,

            _ = tokio::time::sleep_until(self.next_deadline) => {}
        }

        let now = Instant::now();
        self.next_deadline += self.interval;
        if now > self.next_deadline + self.interval {
            // Too far behind, reset to avoid a catch-up spiral
            self.next_deadline = now + self.interval;
        }

        self.tick += 1;
        TickOutcome::Tick(self.tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ticks_count_up_from_one() {
        let mut ticker = Ticker::new(Duration::from_millis(5), CancellationToken::new());
        assert_eq!(ticker.next_tick().await, TickOutcome::Tick(1));
        assert_eq!(ticker.next_tick().await, TickOutcome::Tick(2));
        assert_eq!(ticker.next_tick().await, TickOutcome::Tick(3));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_long_wait() {
        let token = CancellationToken::new();
        let mut ticker = Ticker::new(Duration::from_secs(3600), token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let started = std::time::Instant::now();
        let outcome = ticker.next_tick().await;
        canceller.await.unwrap();

        assert_eq!(outcome, TickOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_ticks() {
        let token = CancellationToken::new();
        token.cancel();
        let mut ticker = Ticker::new(Duration::from_millis(1), token);
        assert_eq!(ticker.next_tick().await, TickOutcome::Cancelled);
        assert_eq!(ticker.next_tick().await, TickOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_interval_is_respected() {
        let mut ticker = Ticker::new(Duration::from_millis(30), CancellationToken::new());
        let started = std::time::Instant::now();
        ticker.next_tick().await;
        ticker.next_tick().await;
        assert!(started.elapsed() >= Duration::from_millis(55));
        assert_eq!(ticker.interval(), Duration::from_millis(30));
    }
}
