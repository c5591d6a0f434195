use aim_advisor::{AimStatus, Tip};
use anyhow::Result;
use tracing::info;

/// What the coach wants shown on screen this tick. Values only, no pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    /// Rounds finished so far
    pub round: u32,
    /// Display-smoothed offset for the live crosshair line
    pub display_offset: f64,
    /// Window-averaged offset, `None` until a detection lands
    pub stats_offset: Option<f64>,
    /// Shots fired in the current round, with or without an offset
    pub shots: usize,
    pub tip: Tip,
    pub status: AimStatus,
}

impl OverlayState {
    pub fn lines(&self) -> Vec<String> {
        let avg = match self.stats_offset {
            Some(v) => format!("{:.1}px", v),
            None => "N/A".to_string(),
        };
        vec![
            format!("Round: {}", self.round),
            format!("Offset: {} px", self.display_offset as i32),
            format!("Avg Offset: {}", avg),
            format!("Shots: {}", self.shots),
            format!("Status: {}", self.status.label()),
            format!("Tip: {}", self.tip),
        ]
    }
}

/// Draws overlay state somewhere the player can see it
pub trait OverlayRenderer {
    fn render(&mut self, state: &OverlayState) -> Result<()>;
}

/// Logs the overlay text whenever the round, shot count, status or tip changes.
/// The offset lines move every frame and don't trigger a redraw on their own.
#[derive(Debug, Default)]
pub struct TerminalOverlay {
    last_key: Option<(u32, usize, AimStatus, Tip)>,
}

impl OverlayRenderer for TerminalOverlay {
    fn render(&mut self, state: &OverlayState) -> Result<()> {
        let key = (state.round, state.shots, state.status, state.tip);
        if self.last_key == Some(key) {
            return Ok(());
        }
        self.last_key = Some(key);
        info!("{}", state.lines().join(" | "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> OverlayState {
        OverlayState {
            round: 2,
            display_offset: -7.8,
            stats_offset: None,
            shots: 3,
            tip: Tip::NoData,
            status: AimStatus::Perfect,
        }
    }

    #[test]
    fn test_lines() {
        let lines = state().lines();
        assert_eq!(lines[0], "Round: 2");
        assert_eq!(lines[1], "Offset: -7 px");
        assert_eq!(lines[2], "Avg Offset: N/A");
        assert_eq!(lines[5], "Tip: No data yet");

        let with_avg = OverlayState {
            stats_offset: Some(4.31),
            ..state()
        };
        assert_eq!(with_avg.lines()[2], "Avg Offset: 4.3px");
    }

    #[test]
    fn test_terminal_overlay_redraws_on_change() {
        let mut overlay = TerminalOverlay::default();
        overlay.render(&state()).unwrap();
        assert_eq!(overlay.last_key, Some((2, 3, AimStatus::Perfect, Tip::NoData)));

        overlay
            .render(&OverlayState {
                shots: 4,
                ..state()
            })
            .unwrap();
        assert_eq!(overlay.last_key, Some((2, 4, AimStatus::Perfect, Tip::NoData)));
    }
}
