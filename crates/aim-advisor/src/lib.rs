use aim_state::Round;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Coaching tip for the next round, derived from a round's average offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tip {
    /// Aim reads low: raise the crosshair
    Raise,
    /// Aim reads high: lower the crosshair
    Lower,
    OnPoint,
    /// No shot in the round carried an offset
    NoData,
}

impl Tip {
    /// Strictly beyond ±`boundary` is needed to move off `OnPoint`
    pub fn classify(average: f64, boundary: f64) -> Self {
        if average > boundary {
            Tip::Raise
        } else if average < -boundary {
            Tip::Lower
        } else {
            Tip::OnPoint
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tip::Raise => "Raise your crosshair slightly next round",
            Tip::Lower => "Lower your crosshair slightly next round",
            Tip::OnPoint => "Crosshair height is on point!",
            Tip::NoData => "No data yet",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [Tip::Raise, Tip::Lower, Tip::OnPoint, Tip::NoData]
            .into_iter()
            .find(|t| t.label() == label)
    }
}

impl fmt::Display for Tip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Live, per-frame reading of the display offset against a tolerance band.
/// Uses the same sign convention as [`Tip`]: positive offsets read as aiming low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AimStatus {
    Low,
    High,
    Perfect,
}

impl AimStatus {
    pub fn classify(offset: f64, band: f64) -> Self {
        if offset > band {
            AimStatus::Low
        } else if offset < -band {
            AimStatus::High
        } else {
            AimStatus::Perfect
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AimStatus::Low => "AIM LOW",
            AimStatus::High => "AIM HIGH",
            AimStatus::Perfect => "AIM PERFECT",
        }
    }
}

/// Summary statistics for one finished round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u32,
    /// Mean offset over shots that carried one (0 when none did)
    pub average: f64,
    /// Largest absolute offset
    pub max_abs: f64,
    /// Sample standard deviation, 0 with fewer than two valid shots
    pub std_dev: f64,
    pub valid_shots: usize,
    /// Every shot fired, with or without an offset
    pub shots_fired: usize,
    pub tip: Tip,
}

#[derive(Debug, Clone)]
pub struct StatsAggregator {
    tip_boundary: f64,
}

impl StatsAggregator {
    pub fn new(tip_boundary: f64) -> Self {
        Self { tip_boundary }
    }

    pub fn summarize(&self, round: &Round) -> RoundSummary {
        let valid: Vec<f64> = round.shots.iter().filter_map(|s| s.offset).collect();
        let shots_fired = round.shots.len();

        if valid.is_empty() {
            info!(
                "=== ROUND {} === no valid shots ({} fired)",
                round.number, shots_fired
            );
            return RoundSummary {
                round: round.number,
                average: 0.0,
                max_abs: 0.0,
                std_dev: 0.0,
                valid_shots: 0,
                shots_fired,
                tip: Tip::NoData,
            };
        }

        let n = valid.len() as f64;
        let average = valid.iter().sum::<f64>() / n;
        let max_abs = valid.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let std_dev = if valid.len() > 1 {
            let variance = valid.iter().map(|v| (v - average).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        } else {
            0.0
        };
        let tip = Tip::classify(average, self.tip_boundary);

        info!(
            "=== ROUND {} === Avg={:.1}px, Shots={} Tip={}",
            round.number,
            average,
            valid.len(),
            tip
        );

        RoundSummary {
            round: round.number,
            average,
            max_abs,
            std_dev,
            valid_shots: valid.len(),
            shots_fired,
            tip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aim_state::ShotEvent;
    use std::time::Duration;

    fn round(offsets: &[Option<f64>]) -> Round {
        Round {
            number: 3,
            shots: offsets
                .iter()
                .enumerate()
                .map(|(i, &offset)| ShotEvent {
                    at: Duration::from_millis(i as u64 * 200),
                    offset,
                })
                .collect(),
        }
    }

    #[test]
    fn test_summary_statistics() {
        let s = StatsAggregator::new(5.0).summarize(&round(&[Some(2.0), Some(-3.0), Some(5.0)]));
        assert_eq!(s.round, 3);
        assert!((s.average - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.max_abs, 5.0);
        assert!((s.std_dev - 4.041).abs() < 1e-3, "std_dev {}", s.std_dev);
        assert_eq!(s.valid_shots, 3);
        assert_eq!(s.tip, Tip::OnPoint);
    }

    #[test]
    fn test_missing_offsets_are_excluded() {
        let s = StatsAggregator::new(5.0).summarize(&round(&[Some(-8.0), None, Some(-10.0), None]));
        assert_eq!(s.valid_shots, 2);
        assert_eq!(s.shots_fired, 4);
        assert_eq!(s.average, -9.0);
        assert_eq!(s.max_abs, 10.0);
        assert_eq!(s.tip, Tip::Lower);
    }

    #[test]
    fn test_single_shot_has_zero_spread() {
        let s = StatsAggregator::new(5.0).summarize(&round(&[Some(12.0)]));
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(s.tip, Tip::Raise);
    }

    #[test]
    fn test_empty_round() {
        let s = StatsAggregator::new(5.0).summarize(&round(&[None, None]));
        assert_eq!(s.valid_shots, 0);
        assert_eq!(s.shots_fired, 2);
        assert_eq!((s.average, s.max_abs, s.std_dev), (0.0, 0.0, 0.0));
        assert_eq!(s.tip, Tip::NoData);

        let s = StatsAggregator::new(5.0).summarize(&round(&[]));
        assert_eq!(s.tip, Tip::NoData);
    }

    #[test]
    fn test_tip_boundaries_are_inclusive() {
        assert_eq!(Tip::classify(5.0, 5.0), Tip::OnPoint);
        assert_eq!(Tip::classify(-5.0, 5.0), Tip::OnPoint);
        assert_eq!(Tip::classify(5.01, 5.0), Tip::Raise);
        assert_eq!(Tip::classify(-5.01, 5.0), Tip::Lower);
        assert_eq!(Tip::classify(0.0, 5.0), Tip::OnPoint);
    }

    #[test]
    fn test_tip_labels_round_trip() {
        for tip in [Tip::Raise, Tip::Lower, Tip::OnPoint, Tip::NoData] {
            assert_eq!(Tip::from_label(tip.label()), Some(tip));
        }
        assert_eq!(Tip::from_label("aim better"), None);
    }

    #[test]
    fn test_aim_status_band() {
        assert_eq!(AimStatus::classify(12.0, 12.0), AimStatus::Perfect);
        assert_eq!(AimStatus::classify(12.5, 12.0), AimStatus::Low);
        assert_eq!(AimStatus::classify(-13.0, 12.0), AimStatus::High);
    }
}
