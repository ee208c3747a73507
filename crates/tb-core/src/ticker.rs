//! Periodic reconciliation schedule.
//!
//! A [`Ticker`] is a cancelable repeating callback driven by whoever owns the
//! event loop. It is armed only while the view is visible and a non-break
//! bucket is active, so hidden views and breaks never tick.

use crate::session::SessionTracker;

/// Default tick interval in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: i64 = 1_000;

#[derive(Debug, Clone)]
pub struct Ticker {
    interval_ms: i64,
    visible: bool,
    next_due_ms: Option<i64>,
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL_MS)
    }
}

impl Ticker {
    /// Creates a visible, unarmed ticker. Non-positive intervals become 1 ms.
    pub fn new(interval_ms: i64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            visible: true,
            next_due_ms: None,
        }
    }

    pub const fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    pub const fn is_armed(&self) -> bool {
        self.next_due_ms.is_some()
    }

    /// When the next tick fires, if armed.
    pub const fn next_due(&self) -> Option<i64> {
        self.next_due_ms
    }

    /// Arms or cancels the schedule to match the tracker and visibility.
    pub fn sync(&mut self, tracker: &SessionTracker, now_ms: i64) {
        let wanted = self.visible && tracker.is_tracking();
        match (wanted, self.next_due_ms) {
            (true, None) => {
                self.next_due_ms = Some(now_ms.saturating_add(self.interval_ms));
                tracing::trace!(next_due_ms = ?self.next_due_ms, "ticker armed");
            }
            (false, Some(_)) => self.cancel(),
            _ => {}
        }
    }

    /// Records a visibility change and re-syncs.
    ///
    /// Views call this when they are shown or hidden; a hidden view cancels
    /// the schedule and the next restore or reconcile credits the gap. The
    /// terminal `watch` loop is always visible and never calls it.
    pub fn set_visible(&mut self, visible: bool, tracker: &SessionTracker, now_ms: i64) {
        self.visible = visible;
        self.sync(tracker, now_ms);
    }

    pub fn cancel(&mut self) {
        if self.next_due_ms.take().is_some() {
            tracing::trace!("ticker cancelled");
        }
    }

    /// Fires the tick if it is due.
    ///
    /// Reconciles the tracker and schedules the next tick one interval after
    /// `now_ms`. Returns `true` if a tick fired.
    pub fn poll(&mut self, tracker: &mut SessionTracker, now_ms: i64) -> bool {
        self.sync(tracker, now_ms);
        match self.next_due_ms {
            Some(due) if now_ms >= due => {
                tracker.reconcile(now_ms);
                self.next_due_ms = Some(now_ms.saturating_add(self.interval_ms));
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BucketName;

    fn tracker() -> SessionTracker {
        let mut tracker = SessionTracker::new(BucketName::new("Pause").unwrap(), 0);
        tracker.add_bucket("Read").unwrap();
        tracker
    }

    fn read_ms(tracker: &SessionTracker) -> i64 {
        tracker.ledger().find("Read").unwrap().duration_ms()
    }

    #[test]
    fn ticks_while_tracking_and_visible() {
        let mut tracker = tracker();
        let mut ticker = Ticker::new(1_000);
        tracker.switch_to("Read", 0).unwrap();

        assert!(!ticker.poll(&mut tracker, 0));
        assert_eq!(ticker.next_due(), Some(1_000));

        assert!(!ticker.poll(&mut tracker, 999));
        assert!(ticker.poll(&mut tracker, 1_000));
        assert_eq!(read_ms(&tracker), 1_000);
        assert_eq!(ticker.next_due(), Some(2_000));

        assert!(ticker.poll(&mut tracker, 2_500));
        assert_eq!(read_ms(&tracker), 2_500);
        assert_eq!(ticker.next_due(), Some(3_500));
    }

    #[test]
    fn never_ticks_on_break() {
        let mut tracker = tracker();
        let mut ticker = Ticker::new(1_000);
        tracker.switch_to_break(0);

        assert!(!ticker.poll(&mut tracker, 5_000));
        assert!(!ticker.is_armed());
        assert_eq!(tracker.last_tick_ms(), 0);
    }

    #[test]
    fn switching_to_break_cancels() {
        let mut tracker = tracker();
        let mut ticker = Ticker::new(1_000);
        tracker.switch_to("Read", 0).unwrap();
        ticker.sync(&tracker, 0);
        assert!(ticker.is_armed());

        tracker.switch_to_break(500);
        ticker.sync(&tracker, 500);
        assert!(!ticker.is_armed());
    }

    #[test]
    fn hidden_view_does_not_tick() {
        let mut tracker = tracker();
        let mut ticker = Ticker::new(1_000);
        tracker.switch_to("Read", 0).unwrap();
        ticker.sync(&tracker, 0);

        ticker.set_visible(false, &tracker, 100);
        assert!(!ticker.is_armed());
        assert!(!ticker.poll(&mut tracker, 10_000));
        assert_eq!(read_ms(&tracker), 0);

        ticker.set_visible(true, &tracker, 10_000);
        assert_eq!(ticker.next_due(), Some(11_000));
    }

    #[test]
    fn interval_is_at_least_one_millisecond() {
        assert_eq!(Ticker::new(0).interval_ms(), 1);
        assert_eq!(Ticker::default().interval_ms(), DEFAULT_TICK_INTERVAL_MS);
    }
}
