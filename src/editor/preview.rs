//! Debounced, supersedable preview regeneration.
//!
//! The scheduler never reads the clock itself; the host passes `now` on
//! every call, from its event loop or from a test.

use std::time::{Duration, Instant};

use tracing::debug;

/// Quiet time after the last change before a preview is regenerated.
pub const PREVIEW_DEBOUNCE_MS: u64 = 800;

/// Permission to regenerate one preview. Its result is only shown if the
/// ticket is still current when the result arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewTicket {
    generation: u64,
}

impl PreviewTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone)]
pub struct PreviewScheduler {
    debounce: Duration,
    /// Bumped by every request; a ticket from an older generation is stale.
    generation: u64,
    pending: bool,
    last_request_at: Option<Instant>,
}

impl Default for PreviewScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(PREVIEW_DEBOUNCE_MS))
    }
}

impl PreviewScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            generation: 0,
            pending: false,
            last_request_at: None,
        }
    }

    /// Record a change. Supersedes any preview already handed out.
    pub fn request(&mut self, now: Instant) {
        self.generation += 1;
        self.pending = true;
        self.last_request_at = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// When the pending preview becomes due, if one is pending.
    pub fn due_at(&self) -> Option<Instant> {
        if !self.pending {
            return None;
        }
        self.last_request_at.map(|t| t + self.debounce)
    }

    /// A ticket once the debounce window has passed since the last request.
    pub fn poll(&mut self, now: Instant) -> Option<PreviewTicket> {
        let due = self.due_at()?;
        if now < due {
            return None;
        }
        self.pending = false;
        debug!("Preview generation {} due", self.generation);
        Some(PreviewTicket {
            generation: self.generation,
        })
    }

    /// Whether a finished preview for `ticket` may be shown.
    pub fn accept(&self, ticket: PreviewTicket) -> bool {
        let current = ticket.generation == self.generation;
        if !current {
            debug!(
                "Discarding stale preview {} (current {})",
                ticket.generation, self.generation
            );
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_collapses_into_one_preview() {
        let t0 = Instant::now();
        let mut scheduler = PreviewScheduler::default();
        scheduler.request(t0);
        scheduler.request(t0 + ms(300));
        scheduler.request(t0 + ms(600));

        assert!(scheduler.poll(t0 + ms(1000)).is_none());
        let ticket = scheduler.poll(t0 + ms(1400)).unwrap();
        assert!(scheduler.accept(ticket));
        assert!(scheduler.poll(t0 + ms(5000)).is_none());
    }

    #[test]
    fn test_request_during_render_supersedes() {
        let t0 = Instant::now();
        let mut scheduler = PreviewScheduler::default();
        scheduler.request(t0);
        let stale = scheduler.poll(t0 + ms(800)).unwrap();

        scheduler.request(t0 + ms(900));
        assert!(!scheduler.accept(stale));

        let fresh = scheduler.poll(t0 + ms(1700)).unwrap();
        assert!(scheduler.accept(fresh));
        assert!(fresh.generation() > stale.generation());
    }

    #[test]
    fn test_idle_scheduler() {
        let mut scheduler = PreviewScheduler::new(ms(10));
        assert!(!scheduler.is_pending());
        assert!(scheduler.due_at().is_none());
        assert!(scheduler.poll(Instant::now()).is_none());
    }
}
