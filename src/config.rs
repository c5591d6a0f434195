use aim_capture::{regions, ScreenRegion};
use aim_vision::EdgeMode;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest accepted gap between two shots
const MAX_SHOT_COOLDOWN_SECS: f64 = 60.0;

/// Tuning presets, one per way of using the coach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Round statistics and tips (Canny edges, ratio crop)
    #[default]
    Coach,
    /// Live crosshair line (binary threshold, fixed crop, fast pacing)
    Overlay,
    /// Aim status against a guide line 16px below center
    Guide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 0-based monitor index; out of range falls back to 0
    pub monitor: usize,
    /// Crosshair crop side as a fraction of the frame's short edge
    pub crop_ratio: f64,
    /// Absolute crop side in pixels, overrides `crop_ratio`
    pub crop_size: Option<u32>,
    pub shot_threshold: f64,
    pub shot_cooldown_secs: f64,
    pub round_ui_threshold: f64,
    pub ui_region: ScreenRegion,
    pub stats_window: usize,
    pub display_alpha: f64,
    pub show_overlay: bool,
    pub edge: EdgeMode,
    pub min_contour_area: f64,
    pub guide_offset: i32,
    pub tip_threshold: f64,
    pub status_band: f64,
    pub frame_interval_ms: u64,
    pub telemetry_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: 0,
            crop_ratio: 0.2,
            crop_size: None,
            shot_threshold: 180.0,
            shot_cooldown_secs: 0.12,
            round_ui_threshold: 140.0,
            ui_region: regions::round_banner(),
            stats_window: 7,
            display_alpha: 0.25,
            show_overlay: true,
            edge: EdgeMode::default(),
            min_contour_area: 0.0,
            guide_offset: 0,
            tip_threshold: 5.0,
            status_band: 12.0,
            frame_interval_ms: 16,
            telemetry_path: PathBuf::from("round_stats.csv"),
        }
    }
}

impl Config {
    pub fn for_profile(profile: Profile) -> Self {
        let base = Self::default();
        match profile {
            Profile::Coach => base,
            Profile::Overlay => Self {
                crop_size: Some(250),
                edge: EdgeMode::Threshold { level: 200 },
                min_contour_area: 10.0,
                shot_cooldown_secs: 0.1,
                frame_interval_ms: 5,
                ..base
            },
            Profile::Guide => Self {
                crop_size: Some(260),
                guide_offset: 16,
                stats_window: 10,
                frame_interval_ms: 16,
                ..base
            },
        }
    }

    /// Load a JSON config file on top of a profile's defaults.
    /// Keys missing from the file keep the profile's values.
    pub fn load(path: &Path, profile: Profile) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let overrides: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        let serde_json::Value::Object(overrides) = overrides else {
            anyhow::bail!("Config {} must be a JSON object", path.display());
        };

        let mut merged = serde_json::to_value(Self::for_profile(profile))?;
        if let serde_json::Value::Object(ref mut fields) = merged {
            fields.extend(overrides);
        }

        let config: Self = serde_json::from_value(merged)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.display_alpha > 0.0 && self.display_alpha <= 1.0,
            "display_alpha must be in (0, 1], got {}",
            self.display_alpha
        );
        ensure!(self.stats_window >= 1, "stats_window must be at least 1");
        ensure!(
            self.crop_ratio > 0.0 && self.crop_ratio <= 1.0,
            "crop_ratio must be in (0, 1], got {}",
            self.crop_ratio
        );
        ensure!(self.crop_size != Some(0), "crop_size must be positive");
        ensure!(self.shot_threshold >= 0.0, "shot_threshold must not be negative");
        ensure!(
            Duration::try_from_secs_f64(self.shot_cooldown_secs).is_ok(),
            "shot_cooldown_secs must be a non-negative number of seconds, got {}",
            self.shot_cooldown_secs
        );
        ensure!(
            self.shot_cooldown_secs <= MAX_SHOT_COOLDOWN_SECS,
            "shot_cooldown_secs must be at most {}, got {}",
            MAX_SHOT_COOLDOWN_SECS,
            self.shot_cooldown_secs
        );
        ensure!(self.round_ui_threshold >= 0.0, "round_ui_threshold must not be negative");
        ensure!(!self.ui_region.is_empty(), "ui_region must have a positive size");
        ensure!(self.tip_threshold >= 0.0, "tip_threshold must not be negative");
        ensure!(self.status_band >= 0.0, "status_band must not be negative");
        if let EdgeMode::Canny { low, high } = self.edge {
            ensure!(
                low >= 0.0 && low <= high,
                "Canny thresholds must satisfy 0 <= low <= high, got {} / {}",
                low,
                high
            );
        }
        Ok(())
    }

    /// Crosshair crop side for a frame of the given size
    pub fn crop_side(&self, width: u32, height: u32) -> u32 {
        match self.crop_size {
            Some(size) => size,
            None => aim_capture::crop_side(width, height, self.crop_ratio),
        }
    }

    /// Values that slipped past `validate` are clamped into range
    pub fn shot_cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.shot_cooldown_secs.min(MAX_SHOT_COOLDOWN_SECS))
            .unwrap_or_default()
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_profiles_are_valid() {
        for profile in [Profile::Coach, Profile::Overlay, Profile::Guide] {
            Config::for_profile(profile).validate().unwrap();
        }
    }

    #[test]
    fn test_coach_defaults() {
        let c = Config::default();
        assert_eq!(c.shot_threshold, 180.0);
        assert!((c.shot_cooldown().as_secs_f64() - 0.12).abs() < 1e-9);
        assert_eq!(c.round_ui_threshold, 140.0);
        assert_eq!(c.stats_window, 7);
        assert_eq!(c.crop_side(1920, 1080), 216);
    }

    #[test]
    fn test_crop_size_overrides_ratio() {
        let c = Config::for_profile(Profile::Overlay);
        assert_eq!(c.crop_side(1920, 1080), 250);
        assert_eq!(c.edge, EdgeMode::Threshold { level: 200 });
    }

    #[test]
    fn test_load_layers_over_profile() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coach.json");
        std::fs::write(
            &path,
            r#"{ "shot_threshold": 200, "edge": { "mode": "canny", "low": 40, "high": 120 } }"#,
        )
        .unwrap();

        let c = Config::load(&path, Profile::Guide).unwrap();
        assert_eq!(c.shot_threshold, 200.0);
        assert_eq!(c.edge, EdgeMode::Canny { low: 40.0, high: 120.0 });
        // Untouched keys keep the guide profile's values
        assert_eq!(c.guide_offset, 16);
        assert_eq!(c.stats_window, 10);
    }

    #[test]
    fn test_huge_cooldown_from_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slow.json");
        std::fs::write(&path, r#"{ "shot_cooldown_secs": 1e20 }"#).unwrap();

        let c = Config::load(&path, Profile::Coach).unwrap();
        assert!(c.validate().is_err());
        assert_eq!(c.shot_cooldown(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(Config::load(&path, Profile::Coach).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            Config {
                display_alpha: 0.0,
                ..Config::default()
            },
            Config {
                stats_window: 0,
                ..Config::default()
            },
            Config {
                crop_ratio: 1.5,
                ..Config::default()
            },
            Config {
                shot_cooldown_secs: -1.0,
                ..Config::default()
            },
            Config {
                shot_cooldown_secs: 1e20,
                ..Config::default()
            },
            Config {
                shot_cooldown_secs: f64::NAN,
                ..Config::default()
            },
            Config {
                edge: EdgeMode::Canny { low: 200.0, high: 100.0 },
                ..Config::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }
}
