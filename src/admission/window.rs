//! Admission Window Module
//!
//! Request timestamps for one (endpoint, client) pair.

use std::collections::VecDeque;

// == Admission Window ==
/// Ordered request timestamps, oldest first.
///
/// A timestamp `t` is active at `now` while `t + window_ms > now`.
#[derive(Debug, Default, Clone)]
pub struct AdmissionWindow {
    events: VecDeque<u64>,
}

impl AdmissionWindow {
    // == Prune ==
    /// Drops timestamps that have aged out of the window.
    pub fn prune(&mut self, now_ms: u64, window_ms: u64) {
        while let Some(&oldest) = self.events.front() {
            if is_active(oldest, now_ms, window_ms) {
                break;
            }
            self.events.pop_front();
        }
    }

    // == Record ==
    pub fn record(&mut self, now_ms: u64) {
        self.events.push_back(now_ms);
    }

    // == Active View ==
    /// Active timestamps without mutating the window.
    pub fn active(&self, now_ms: u64, window_ms: u64) -> impl Iterator<Item = u64> + '_ {
        self.events
            .iter()
            .copied()
            .skip_while(move |&t| !is_active(t, now_ms, window_ms))
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn is_active(timestamp: u64, now_ms: u64, window_ms: u64) -> bool {
    timestamp.saturating_add(window_ms) > now_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_drops_aged_out_events() {
        let mut window = AdmissionWindow::default();
        window.record(1_000);
        window.record(1_500);
        window.record(2_000);

        // At 2_500 with a 1_000ms window, 1_500 is exactly on the edge
        window.prune(2_500, 1_000);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_active_view_does_not_mutate() {
        let mut window = AdmissionWindow::default();
        window.record(100);
        window.record(900);

        // 100 is still active at 1_050 and has aged out at 1_150
        assert_eq!(window.active(1_050, 1_000).collect::<Vec<_>>(), vec![100, 900]);
        assert_eq!(window.active(1_150, 1_000).collect::<Vec<_>>(), vec![900]);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_prune_empty_window() {
        let mut window = AdmissionWindow::default();
        window.prune(10_000, 1_000);
        assert!(window.is_empty());
    }
}
