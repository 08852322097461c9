use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time for a [`Deadline`].
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Instant;
}

/// The process monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Used to drive searches on simulated
/// time.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

/// Time gate for one search.
///
/// `timeout` is the hard instant by which a move must have been submitted.
/// `finish_by` comes earlier and leaves room for the last backpropagation and
/// for the answer to travel back; searches stop starting work once it passes.
#[derive(Debug, Clone)]
pub struct Deadline {
    clock: Arc<dyn Clock>,
    timeout: Instant,
    finish_by: Instant,
}

impl Deadline {
    pub fn new(timeout: Instant, finish_by: Instant) -> Self {
        Self::with_clock(Arc::new(SystemClock), timeout, finish_by)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, timeout: Instant, finish_by: Instant) -> Self {
        Self {
            clock,
            timeout,
            finish_by: finish_by.min(timeout),
        }
    }

    /// A deadline `budget` from now on the system clock, with work stopping
    /// `margin` before it.
    pub fn after(budget: Duration, margin: Duration) -> Self {
        Self::after_on(Arc::new(SystemClock), budget, margin)
    }

    pub fn after_on(clock: Arc<dyn Clock>, budget: Duration, margin: Duration) -> Self {
        let now = clock.now();
        let timeout = now + budget;
        let finish_by = timeout.checked_sub(margin).unwrap_or(now).max(now);
        Self::with_clock(clock, timeout, finish_by)
    }

    /// Strictly past the hard timeout.
    pub fn is_expired(&self) -> bool {
        self.clock.now() > self.timeout
    }

    /// No new work should be started.
    pub fn is_out_of_time(&self) -> bool {
        self.clock.now() >= self.finish_by
    }

    /// Time left before `finish_by`.
    pub fn remaining(&self) -> Duration {
        self.finish_by.saturating_duration_since(self.clock.now())
    }

    pub fn timeout(&self) -> Instant {
        self.timeout
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_time_comes_before_expiry() {
        let clock = Arc::new(ManualClock::new());
        let deadline = Deadline::after_on(clock.clone(), Duration::from_millis(50), Duration::from_millis(10));

        assert!(!deadline.is_out_of_time());
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::from_millis(40));

        clock.advance(Duration::from_millis(40));
        assert!(deadline.is_out_of_time());
        assert!(!deadline.is_expired());

        clock.advance(Duration::from_millis(10));
        assert!(!deadline.is_expired(), "expiry is strictly past the timeout");

        clock.advance(Duration::from_millis(1));
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[test]
    fn margin_larger_than_budget_means_no_time() {
        let clock = Arc::new(ManualClock::new());
        let deadline = Deadline::after_on(clock, Duration::from_millis(5), Duration::from_secs(1));

        assert!(deadline.is_out_of_time());
        assert!(!deadline.is_expired());
    }
}
