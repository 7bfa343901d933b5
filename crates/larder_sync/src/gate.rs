//! Pause/resume discipline for live-update listeners.

/// Gate between the live-update subscription and the engine.
///
/// Before a push the gate is paused; remote events that arrive while
/// paused are not handled individually but coalesced into a single
/// deferred flag. When the push settles the gate resumes and reports
/// whether a follow-up pull is owed. Without this discipline a device
/// would observe its own just-accepted write as an incoming change and
/// raise a conflict against itself.
#[derive(Debug, Default)]
pub struct ListenerGate {
    paused: bool,
    deferred: bool,
}

impl ListenerGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses event handling.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes event handling. Returns true if events arrived while
    /// paused, in which case the caller owes exactly one coalesced pull.
    pub fn resume(&mut self) -> bool {
        self.paused = false;
        std::mem::take(&mut self.deferred)
    }

    /// Records that an event arrived; while paused it is deferred.
    /// Returns true if the event should be handled now.
    pub fn admit(&mut self) -> bool {
        if self.paused {
            self.deferred = true;
            false
        } else {
            true
        }
    }

    /// Returns true while the gate is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
