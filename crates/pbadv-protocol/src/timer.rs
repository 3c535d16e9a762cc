//! One-shot deadline timers driven by caller-supplied time.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm (or re-arm) the timer to fire `after` from `now`.
    pub fn schedule(&mut self, now: Instant, after: Duration) {
        self.deadline = Some(now + after);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Disarm and return `true` if the deadline has passed.
    pub fn take_expired(&mut self, now: Instant) -> bool {
        if self.is_expired(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

/// Earliest of two optional deadlines.
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_never_expires() {
        let timer = Timer::new();
        assert_eq!(timer.deadline(), None);
        assert!(!timer.is_expired(Instant::now()));
    }

    #[test]
    fn fires_at_deadline_once() {
        let now = Instant::now();
        let mut timer = Timer::new();
        timer.schedule(now, Duration::from_millis(500));
        assert!(!timer.take_expired(now + Duration::from_millis(499)));
        assert!(timer.take_expired(now + Duration::from_millis(500)));
        assert_eq!(timer.deadline(), None);
        assert!(!timer.take_expired(now + Duration::from_secs(10)));
    }

    #[test]
    fn reschedule_moves_deadline() {
        let now = Instant::now();
        let mut timer = Timer::new();
        timer.schedule(now, Duration::from_secs(1));
        timer.schedule(now, Duration::from_secs(5));
        assert_eq!(timer.deadline(), Some(now + Duration::from_secs(5)));
        timer.cancel();
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn earliest_deadline() {
        let now = Instant::now();
        let later = now + Duration::from_secs(1);
        assert_eq!(earliest(Some(now), Some(later)), Some(now));
        assert_eq!(earliest(None, Some(later)), Some(later));
        assert_eq!(earliest(Some(now), None), Some(now));
        assert_eq!(earliest(None, None), None);
    }
}
