//! Single-slot edit debouncing.

use std::time::{Duration, Instant};

/// The pending auto-push timer.
///
/// A single owned slot rather than ad-hoc timer handles: arming replaces
/// any previous deadline, so there is never more than one pending
/// auto-push. Time is supplied by the caller, which keeps the slot
/// deterministic under test.
#[derive(Debug, Clone)]
pub struct EditDebounce {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl EditDebounce {
    /// Creates a disarmed slot with the given quiet period.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Arms (or re-arms) the slot: the deadline moves to `now + quiet`.
    pub fn note_edit(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// Cancels any pending deadline.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns true while a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consumes the deadline if it has passed. Returns true at most once
    /// per arming.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: Duration = Duration::from_millis(500);

    #[test]
    fn disarmed_never_fires() {
        let mut slot = EditDebounce::new(QUIET);
        assert!(!slot.is_armed());
        assert!(!slot.fire_if_due(Instant::now()));
    }

    #[test]
    fn fires_after_quiet_period() {
        let start = Instant::now();
        let mut slot = EditDebounce::new(QUIET);
        slot.note_edit(start);

        assert!(!slot.fire_if_due(start + Duration::from_millis(499)));
        assert!(slot.fire_if_due(start + QUIET));
        // Consumed: does not fire again.
        assert!(!slot.fire_if_due(start + Duration::from_secs(10)));
    }

    #[test]
    fn new_edit_resets_the_wait() {
        let start = Instant::now();
        let mut slot = EditDebounce::new(QUIET);
        slot.note_edit(start);
        slot.note_edit(start + Duration::from_millis(400));

        // The original deadline has passed but the slot was re-armed.
        assert!(!slot.fire_if_due(start + Duration::from_millis(500)));
        assert!(slot.fire_if_due(start + Duration::from_millis(900)));
    }

    #[test]
    fn cancel_disarms() {
        let start = Instant::now();
        let mut slot = EditDebounce::new(QUIET);
        slot.note_edit(start);
        slot.cancel();

        assert!(!slot.is_armed());
        assert!(!slot.fire_if_due(start + Duration::from_secs(1)));
    }
}
