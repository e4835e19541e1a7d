//! Timers
//!
//! Single-shot per-window timers. Starting a timer replaces any outstanding
//! one of the same kind for the same window, so at most one is pending per
//! purpose. The compositor drives them from `Compositor::dispatch`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::wm::window::WindowId;

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    AutoRaise,
    /// Electric-border maximize preview debounce
    ElectricMaximizing,
    /// Titlebar press turning into a drag
    DelayedMoveResize,
    /// Remnant keeping annexed children alive
    AnnexedTimeout,
}

#[derive(Debug, Default)]
pub struct Timers {
    deadlines: HashMap<(WindowId, TimerKind), Instant>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer; cancels the previous one of the same kind
    pub fn start(&mut self, id: WindowId, kind: TimerKind, now: Instant, interval: Duration) {
        self.deadlines.insert((id, kind), now + interval);
    }

    pub fn cancel(&mut self, id: WindowId, kind: TimerKind) -> bool {
        self.deadlines.remove(&(id, kind)).is_some()
    }

    /// Drop every timer of a window
    pub fn cancel_all(&mut self, id: WindowId) {
        self.deadlines.retain(|(wid, _), _| *wid != id);
    }

    pub fn is_active(&self, id: WindowId, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&(id, kind))
    }

    pub fn deadline(&self, id: WindowId, kind: TimerKind) -> Option<Instant> {
        self.deadlines.get(&(id, kind)).copied()
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<(WindowId, TimerKind)> {
        let mut due: Vec<_> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, *key))
            .collect();
        due.sort();
        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restarting_replaces_the_pending_timer() {
        let mut timers = Timers::new();
        let now = Instant::now();
        let id = WindowId(1);
        timers.start(id, TimerKind::AutoRaise, now, Duration::from_millis(100));
        timers.start(id, TimerKind::AutoRaise, now, Duration::from_millis(500));

        assert!(timers.take_due(now + Duration::from_millis(200)).is_empty());
        assert_eq!(
            timers.take_due(now + Duration::from_millis(500)),
            vec![(id, TimerKind::AutoRaise)]
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn due_timers_come_out_earliest_first() {
        let mut timers = Timers::new();
        let now = Instant::now();
        timers.start(WindowId(2), TimerKind::AutoRaise, now, Duration::from_millis(30));
        timers.start(WindowId(1), TimerKind::DelayedMoveResize, now, Duration::from_millis(10));
        let due = timers.take_due(now + Duration::from_millis(50));
        assert_eq!(
            due,
            vec![
                (WindowId(1), TimerKind::DelayedMoveResize),
                (WindowId(2), TimerKind::AutoRaise)
            ]
        );
    }

    #[test]
    fn cancel_all_only_touches_one_window() {
        let mut timers = Timers::new();
        let now = Instant::now();
        timers.start(WindowId(1), TimerKind::AutoRaise, now, Duration::from_millis(1));
        timers.start(WindowId(1), TimerKind::ElectricMaximizing, now, Duration::from_millis(1));
        timers.start(WindowId(2), TimerKind::AutoRaise, now, Duration::from_millis(1));
        timers.cancel_all(WindowId(1));
        assert!(!timers.is_active(WindowId(1), TimerKind::AutoRaise));
        assert!(timers.is_active(WindowId(2), TimerKind::AutoRaise));
    }
}
