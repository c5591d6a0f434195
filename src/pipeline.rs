use aim_advisor::{AimStatus, RoundSummary, StatsAggregator, Tip};
use aim_capture::{crop_centered, mean_brightness, region_brightness, to_gray, Frame, FrameSource};
use aim_state::{DisplaySmoother, OffsetSample, RoundTracker, ShotDetector, ShotEvent, StatsSmoother};
use aim_telemetry::TelemetrySink;
use aim_vision::OffsetDetector;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::overlay::{OverlayRenderer, OverlayState};

/// Everything one tick produced
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub offset: OffsetSample,
    pub display_offset: f64,
    pub stats_offset: Option<f64>,
    pub shot: Option<ShotEvent>,
    /// Set when this tick closed a round
    pub summary: Option<RoundSummary>,
}

/// Frame → offset → smoothing → shots → rounds → telemetry, one tick at a time.
///
/// Owns every piece of per-run state; construct one per session.
pub struct Pipeline {
    config: Config,
    detector: OffsetDetector,
    display: DisplaySmoother,
    stats: StatsSmoother,
    shots: ShotDetector,
    rounds: RoundTracker,
    aggregator: StatsAggregator,
    sink: Box<dyn TelemetrySink>,
    last_tip: Tip,
}

impl Pipeline {
    pub fn new(config: &Config, sink: Box<dyn TelemetrySink>) -> Self {
        Self {
            detector: OffsetDetector::new(config.edge, config.min_contour_area, config.guide_offset),
            display: DisplaySmoother::new(config.display_alpha),
            stats: StatsSmoother::new(config.stats_window),
            shots: ShotDetector::new(config.shot_threshold, config.shot_cooldown()),
            rounds: RoundTracker::new(config.round_ui_threshold),
            aggregator: StatsAggregator::new(config.tip_threshold),
            sink,
            last_tip: Tip::NoData,
            config: config.clone(),
        }
    }

    /// Run one frame through the pipeline.
    ///
    /// Returns `None` when the crosshair crop is empty; nothing is updated then,
    /// not even the UI brightness. A degenerate frame's UI region reads as black
    /// and would otherwise close a round.
    /// A shot seen on the same tick as a round boundary goes to the new round.
    pub fn tick(&mut self, frame: &Frame) -> Option<TickReport> {
        let (w, h) = frame.image.dimensions();
        let crop = crop_centered(&frame.image, self.config.crop_side(w, h));
        if crop.width() == 0 || crop.height() == 0 {
            debug!("Empty crosshair crop for {}x{} frame, skipping tick", w, h);
            return None;
        }
        let gray = to_gray(&crop);

        let offset = self.detector.detect(&gray);
        if offset.is_none() {
            trace!("No detection at {:?}", frame.elapsed);
        }
        let display_offset = self.display.update(offset);
        self.stats.push(offset);
        let stats_offset = self.stats.value();

        let shot = self
            .shots
            .observe(mean_brightness(&gray), frame.elapsed, stats_offset);
        if let Some(ref s) = shot {
            match s.offset {
                Some(o) => info!("SHOT @ offset={:.1}", o),
                None => info!("SHOT @ offset=N/A"),
            }
        }

        let ui_brightness = region_brightness(&frame.image, &self.config.ui_region);
        let summary = match self.rounds.observe(ui_brightness, &mut self.stats) {
            Some(round) => {
                let summary = self.aggregator.summarize(&round);
                if let Err(e) = self.sink.append(&summary, frame.captured_at) {
                    warn!("Failed to log round {}: {:#}", summary.round, e);
                }
                if summary.tip != Tip::NoData {
                    self.last_tip = summary.tip;
                }
                Some(summary)
            }
            None => None,
        };

        if let Some(s) = shot {
            self.rounds.record_shot(s);
        }

        Some(TickReport {
            offset,
            display_offset,
            stats_offset: self.stats.value(),
            shot,
            summary,
        })
    }

    pub fn overlay_state(&self) -> OverlayState {
        OverlayState {
            round: self.rounds.completed(),
            display_offset: self.display.value(),
            stats_offset: self.stats.value(),
            shots: self.rounds.shots_fired(),
            tip: self.last_tip,
            status: AimStatus::classify(self.display.value(), self.config.status_band),
        }
    }
}

/// Counters for one run of the tick loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: u64,
    pub skipped: u64,
    pub shots: u64,
    pub rounds: u64,
}

/// Grab → tick → render → pace, until the stop flag is set, the tick limit is
/// hit or the source runs dry. A failed grab ends the loop with an error.
pub async fn run_loop(
    source: &mut dyn FrameSource,
    pipeline: &mut Pipeline,
    mut overlay: Option<&mut dyn OverlayRenderer>,
    frame_interval: Duration,
    max_ticks: Option<u64>,
    stop: Arc<AtomicBool>,
) -> Result<LoopSummary> {
    info!(
        "Tick loop started on {}, interval: {:?}",
        source.describe(),
        frame_interval
    );

    let mut summary = LoopSummary::default();

    loop {
        if stop.load(Ordering::Relaxed) {
            info!("Tick loop stopping (stop signal received)");
            break;
        }
        if max_ticks.is_some_and(|max| summary.ticks >= max) {
            info!("Tick loop stopping ({} tick limit reached)", summary.ticks);
            break;
        }

        let tick_start = Instant::now();

        let frame = source
            .grab()
            .with_context(|| format!("Failed to grab frame from {}", source.describe()))?;
        let Some(frame) = frame else {
            info!("Frame source exhausted");
            break;
        };
        summary.ticks += 1;

        match pipeline.tick(&frame) {
            Some(report) => {
                if report.shot.is_some() {
                    summary.shots += 1;
                }
                if report.summary.is_some() {
                    summary.rounds += 1;
                }
            }
            None => summary.skipped += 1,
        }

        if let Some(overlay) = overlay.as_mut() {
            if let Err(e) = overlay.render(&pipeline.overlay_state()) {
                warn!("Overlay render failed: {:#}", e);
            }
        }

        // Sleep until the next tick, never a negative amount
        let elapsed = tick_start.elapsed();
        if elapsed < frame_interval {
            tokio::time::sleep(frame_interval - elapsed).await;
        } else {
            tokio::task::yield_now().await;
        }
    }

    info!(
        "Tick loop stopped: {} tick(s), {} skipped, {} shot(s), {} round(s)",
        summary.ticks, summary.skipped, summary.shots, summary.rounds
    );
    Ok(summary)
}
