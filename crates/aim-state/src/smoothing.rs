use crate::OffsetSample;
use std::collections::VecDeque;

/// Exponential smoothing for the live overlay.
///
/// A miss does not freeze or reset the value: it keeps decaying toward the
/// last offset that was actually detected.
#[derive(Debug, Clone)]
pub struct DisplaySmoother {
    alpha: f64,
    last_valid: i32,
    smoothed: f64,
}

impl DisplaySmoother {
    /// `alpha` in (0, 1]; smaller is smoother and slower to react
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            last_valid: 0,
            smoothed: 0.0,
        }
    }

    pub fn update(&mut self, sample: OffsetSample) -> f64 {
        if let Some(offset) = sample {
            self.last_valid = offset;
        }
        self.smoothed = self.alpha * self.last_valid as f64 + (1.0 - self.alpha) * self.smoothed;
        self.smoothed
    }

    pub fn value(&self) -> f64 {
        self.smoothed
    }

    pub fn last_valid(&self) -> i32 {
        self.last_valid
    }
}

/// Moving average over the last `window` detected offsets.
/// Misses are never stored, so they cannot drag the mean toward zero.
#[derive(Debug, Clone)]
pub struct StatsSmoother {
    window: usize,
    samples: VecDeque<i32>,
}

impl StatsSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    pub fn push(&mut self, sample: OffsetSample) {
        let Some(offset) = sample else {
            return;
        };
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(offset);
    }

    /// Mean of the buffered offsets, `None` while empty
    pub fn value(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: i64 = self.samples.iter().map(|&s| s as i64).sum();
        Some(sum as f64 / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}
