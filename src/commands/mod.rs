mod capture;
mod report;

use crate::config::{Config, Profile};
use aim_vision::EdgeMode;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aim-coach", version, about = "Real-time crosshair placement coach")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Coach live from a monitor
    Run(RunArgs),
    /// Run the coach over a recorded video
    #[cfg(feature = "video")]
    Replay {
        /// Video file to decode
        path: PathBuf,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Summarize a round log
    Report {
        #[arg(default_value = "round_stats.csv")]
        path: PathBuf,
    },
    /// List monitors available for capture
    Monitors,
}

/// Settings for a coaching session. Flags override the profile and config file.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Preset to start from
    #[arg(long, value_enum, default_value_t = Profile::Coach)]
    pub profile: Profile,

    /// JSON config file layered over the profile
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Monitor index (0-based)
    #[arg(long)]
    pub monitor: Option<usize>,

    /// Crop side as a fraction of the short screen edge
    #[arg(long)]
    pub crop_ratio: Option<f64>,

    /// Crop side in pixels, overrides --crop-ratio
    #[arg(long)]
    pub crop_size: Option<u32>,

    /// Mean crop brightness that counts as a muzzle flash
    #[arg(long)]
    pub shot_threshold: Option<f64>,

    /// Minimum seconds between two shots
    #[arg(long)]
    pub shot_cooldown: Option<f64>,

    /// UI brightness jump that marks a round boundary
    #[arg(long)]
    pub round_ui_threshold: Option<f64>,

    /// Number of detections averaged for shot statistics
    #[arg(long)]
    pub smooth_frames: Option<usize>,

    /// Display smoothing factor in (0, 1]
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Canny low threshold
    #[arg(long)]
    pub canny_low: Option<f32>,

    /// Canny high threshold
    #[arg(long)]
    pub canny_high: Option<f32>,

    /// Shift the centered baseline down by this many pixels
    #[arg(long, allow_hyphen_values = true)]
    pub guide_offset: Option<i32>,

    /// Average offset beyond which a tip is given
    #[arg(long)]
    pub tip_threshold: Option<f64>,

    /// Round log destination
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Don't show the overlay
    #[arg(long)]
    pub no_overlay: bool,

    /// Keep round summaries in memory instead of writing the log
    #[arg(long)]
    pub dry_run: bool,

    /// Stop after this many ticks
    #[arg(long)]
    pub max_ticks: Option<u64>,
}

impl RunArgs {
    /// Profile → config file → flags, then validated
    pub fn resolve(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path, self.profile)?,
            None => Config::for_profile(self.profile),
        };

        if let Some(v) = self.monitor {
            config.monitor = v;
        }
        if let Some(v) = self.crop_ratio {
            config.crop_ratio = v;
            config.crop_size = None;
        }
        if let Some(v) = self.crop_size {
            config.crop_size = Some(v);
        }
        if let Some(v) = self.shot_threshold {
            config.shot_threshold = v;
        }
        if let Some(v) = self.shot_cooldown {
            config.shot_cooldown_secs = v;
        }
        if let Some(v) = self.round_ui_threshold {
            config.round_ui_threshold = v;
        }
        if let Some(v) = self.smooth_frames {
            config.stats_window = v;
        }
        if let Some(v) = self.alpha {
            config.display_alpha = v;
        }
        if self.canny_low.is_some() || self.canny_high.is_some() {
            let (low, high) = match config.edge {
                EdgeMode::Canny { low, high } => (low, high),
                EdgeMode::Threshold { .. } => (60.0, 150.0),
            };
            config.edge = EdgeMode::Canny {
                low: self.canny_low.unwrap_or(low),
                high: self.canny_high.unwrap_or(high),
            };
        }
        if let Some(v) = self.guide_offset {
            config.guide_offset = v;
        }
        if let Some(v) = self.tip_threshold {
            config.tip_threshold = v;
        }
        if let Some(v) = &self.log {
            config.telemetry_path = v.clone();
        }
        if self.no_overlay {
            config.show_overlay = false;
        }

        config.validate()?;
        Ok(config)
    }
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => capture::start_capture(&args),
        #[cfg(feature = "video")]
        Command::Replay { path, args } => capture::start_replay(&path, &args),
        Command::Report { path } => report::show_report(&path),
        Command::Monitors => report::show_monitors(),
    }
}
