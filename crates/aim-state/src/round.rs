use crate::shot::ShotEvent;
use crate::smoothing::StatsSmoother;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A finished round: its 1-based ordinal and every shot recorded during it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub number: u32,
    pub shots: Vec<ShotEvent>,
}

/// Detects round boundaries from a UI brightness signal and collects shots in between.
///
/// A boundary fires when UI brightness jumps from the previous tick's by more
/// than the threshold. The tracker then latches on the pre-jump level and only
/// re-arms once brightness settles back within the threshold of it, so a banner
/// that shows and hides again ends one round. The first tick only primes.
#[derive(Debug, Clone)]
pub struct RoundTracker {
    threshold: f64,
    completed: u32,
    shots: Vec<ShotEvent>,
    last_ui_brightness: Option<f64>,
    /// UI level from just before the last boundary, while latched
    latched_at: Option<f64>,
}

impl RoundTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            completed: 0,
            shots: Vec::new(),
            last_ui_brightness: None,
            latched_at: None,
        }
    }

    /// Feed this tick's UI brightness. On a boundary the current round is
    /// returned, the accumulator is emptied and `stats` is reset.
    pub fn observe(&mut self, ui_brightness: f64, stats: &mut StatsSmoother) -> Option<Round> {
        let last = self.last_ui_brightness.replace(ui_brightness);

        if let Some(base) = self.latched_at {
            if (ui_brightness - base).abs() <= self.threshold {
                debug!("UI brightness back to {:.1}, re-armed", ui_brightness);
                self.latched_at = None;
            }
            return None;
        }

        let last = last.filter(|last| (ui_brightness - last).abs() > self.threshold)?;
        self.latched_at = Some(last);

        self.completed += 1;
        let shots = std::mem::take(&mut self.shots);
        stats.reset();
        debug!(
            "Round {} boundary at UI brightness {:.1} ({} shot(s))",
            self.completed,
            ui_brightness,
            shots.len()
        );

        Some(Round {
            number: self.completed,
            shots,
        })
    }

    /// Append a shot to the round in progress
    pub fn record_shot(&mut self, shot: ShotEvent) {
        self.shots.push(shot);
    }

    /// Number of rounds finalized so far (0 before the first boundary)
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Shots fired in the current round, including ones without an offset
    pub fn shots_fired(&self) -> usize {
        self.shots.len()
    }

    pub fn current_shots(&self) -> &[ShotEvent] {
        &self.shots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shot(ms: u64, offset: Option<f64>) -> ShotEvent {
        ShotEvent {
            at: Duration::from_millis(ms),
            offset,
        }
    }

    fn boundaries(tracker: &mut RoundTracker, series: &[f64]) -> Vec<usize> {
        let mut stats = StatsSmoother::new(3);
        series
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| tracker.observe(b, &mut stats).map(|_| i))
            .collect()
    }

    #[test]
    fn test_first_tick_only_primes() {
        let mut tracker = RoundTracker::new(100.0);
        let mut stats = StatsSmoother::new(3);
        assert_eq!(tracker.observe(255.0, &mut stats), None);
        assert_eq!(tracker.completed(), 0);
    }

    #[test]
    fn test_single_jump_is_one_boundary() {
        let mut tracker = RoundTracker::new(100.0);
        assert_eq!(boundaries(&mut tracker, &[50.0, 52.0, 51.0, 200.0, 198.0]), vec![3]);
        assert_eq!(tracker.completed(), 1);
    }

    #[test]
    fn test_banner_shown_then_hidden_is_one_boundary() {
        let mut tracker = RoundTracker::new(100.0);
        assert_eq!(boundaries(&mut tracker, &[50.0, 52.0, 51.0, 200.0, 49.0]), vec![3]);
        assert_eq!(tracker.completed(), 1);
    }

    #[test]
    fn test_rearms_after_settling_back() {
        let mut tracker = RoundTracker::new(100.0);
        // Banner held, hidden, then shown again for the next round
        let series = [40.0, 230.0, 228.0, 232.0, 45.0, 41.0, 235.0, 30.0];
        assert_eq!(boundaries(&mut tracker, &series), vec![1, 6]);
        assert_eq!(tracker.completed(), 2);
    }

    #[test]
    fn test_latched_tracker_ignores_further_jumps() {
        let mut tracker = RoundTracker::new(100.0);
        // 40 -> 160 fires; 160 -> 300 is still away from 40 and doesn't
        assert_eq!(boundaries(&mut tracker, &[40.0, 160.0, 300.0, 120.0]), vec![1]);
    }

    #[test]
    fn test_delta_equal_to_threshold_is_not_a_boundary() {
        let mut tracker = RoundTracker::new(100.0);
        assert!(boundaries(&mut tracker, &[50.0, 150.0, 50.0]).is_empty());
    }

    #[test]
    fn test_boundary_hands_over_shots_and_resets_stats() {
        let mut tracker = RoundTracker::new(100.0);
        let mut stats = StatsSmoother::new(3);
        stats.push(Some(4));

        assert_eq!(tracker.observe(40.0, &mut stats), None);
        tracker.record_shot(shot(10, Some(4.0)));
        tracker.record_shot(shot(200, None));
        assert_eq!(tracker.shots_fired(), 2);

        let round = tracker.observe(220.0, &mut stats).expect("boundary");
        assert_eq!(round.number, 1);
        assert_eq!(round.shots.len(), 2);
        assert_eq!(round.shots[1].offset, None);
        assert!(stats.is_empty());
        assert_eq!(tracker.shots_fired(), 0);

        tracker.record_shot(shot(400, Some(-1.0)));
        assert_eq!(tracker.observe(30.0, &mut stats), None);
        let round = tracker.observe(220.0, &mut stats).expect("boundary");
        assert_eq!(round.number, 2);
        assert_eq!(round.shots, vec![shot(400, Some(-1.0))]);
    }
}
