use crate::error::{RelquadError, RelquadResult};
use std::time::{Duration, Instant};

/// A cooperative cancellation token: checked before each I/O point (batch
/// term resolve, SQL submit, row fetch) and before emitting each CTE, per
/// spec.md §5. Not a preemptive timer — the translator and executor must
/// call [`Deadline::check`] themselves at those points.
#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self {
            expires_at: Instant::now() + duration,
        }
    }

    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::after(Duration::from_millis(millis))
    }

    /// A deadline that never trips, for tests and administrative paths
    /// that opt out of the wall-clock budget.
    #[must_use]
    pub fn never() -> Self {
        Self {
            expires_at: Instant::now() + Duration::from_secs(60 * 60 * 24 * 365),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Returns [`RelquadError::Timeout`] if the deadline has already
    /// passed. Callers invoke this at every cooperative checkpoint rather
    /// than relying on a background timer.
    pub fn check(&self) -> RelquadResult<()> {
        if self.is_expired() {
            tracing::warn!("deadline exceeded with {:?} of budget requested", self.remaining());
            return Err(RelquadError::Timeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_deadline_does_not_trip() {
        let deadline = Deadline::never();
        assert!(deadline.check().is_ok());
    }

    #[test]
    fn elapsed_deadline_trips() {
        let deadline = Deadline::from_millis(0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(deadline.check(), Err(RelquadError::Timeout)));
    }
}
