use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A debounced brightness spike, interpreted as a weapon discharge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotEvent {
    /// Frame time the spike was seen at
    pub at: Duration,
    /// Window-averaged offset at that moment, `None` when no samples were buffered
    pub offset: Option<f64>,
}

/// Fires at most once per cooldown while the crop stays brighter than the threshold.
#[derive(Debug, Clone)]
pub struct ShotDetector {
    threshold: f64,
    cooldown: Duration,
    last_shot: Option<Duration>,
}

impl ShotDetector {
    pub fn new(threshold: f64, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            last_shot: None,
        }
    }

    pub fn observe(&mut self, brightness: f64, now: Duration, offset: Option<f64>) -> Option<ShotEvent> {
        if brightness <= self.threshold {
            return None;
        }
        if let Some(last) = self.last_shot {
            if now.saturating_sub(last) <= self.cooldown {
                debug!("Spike at {:?} inside cooldown", now);
                return None;
            }
        }
        self.last_shot = Some(now);
        Some(ShotEvent { at: now, offset })
    }
}
