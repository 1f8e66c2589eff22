/// Auto-expiring "key is gone" cue.
///
/// Starts inactive. While active, `is_expired` turns true once the configured
/// duration has elapsed since `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityTimer {
    started_ms: Option<u64>,
    duration_ms: u64,
}

impl VisibilityTimer {
    pub const fn new(duration_ms: u64) -> Self {
        Self {
            started_ms: None,
            duration_ms,
        }
    }

    /// Starts the timer, or restarts it if already running.
    pub fn start(&mut self, now_ms: u64) {
        self.started_ms = Some(now_ms);
    }

    /// Returns whether the timer was active.
    pub fn cancel(&mut self) -> bool {
        self.started_ms.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.started_ms.is_some()
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.started_ms
            .is_some_and(|started| now_ms.saturating_sub(started) >= self.duration_ms)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        let started = self.started_ms?;
        Some(self.duration_ms.saturating_sub(now_ms.saturating_sub(started)))
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}
