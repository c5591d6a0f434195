use crate::commands::RunArgs;
use crate::config::Config;
use crate::overlay::{OverlayRenderer, TerminalOverlay};
use crate::pipeline::{run_loop, LoopSummary, Pipeline};
use aim_capture::{FrameSource, MonitorSource};
use aim_telemetry::{CsvSink, MemorySink, TelemetrySink};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Coach live from the configured monitor
pub fn start_capture(args: &RunArgs) -> Result<()> {
    let config = args.resolve()?;
    let mut source = MonitorSource::open(config.monitor)?;
    drive(&mut source, &config, args).map(|_| ())
}

/// Coach over a recorded video instead of a live monitor
#[cfg(feature = "video")]
pub fn start_replay(path: &std::path::Path, args: &RunArgs) -> Result<()> {
    let config = args.resolve()?;
    let mut source = aim_capture::video::VideoSource::open(path)?;
    drive(&mut source, &config, args).map(|_| ())
}

/// Build the pipeline and run the tick loop on a single-threaded runtime
/// until Ctrl-C, the tick limit, or the end of the source.
fn drive(source: &mut dyn FrameSource, config: &Config, args: &RunArgs) -> Result<LoopSummary> {
    let sink: Box<dyn TelemetrySink> = if args.dry_run {
        info!("Dry run: round summaries stay in memory");
        Box::new(MemorySink::default())
    } else {
        info!("Round log: {}", config.telemetry_path.display());
        Box::new(CsvSink::new(&config.telemetry_path))
    };

    let mut pipeline = Pipeline::new(config, sink);
    let mut overlay = TerminalOverlay::default();
    let overlay: Option<&mut dyn OverlayRenderer> = if config.show_overlay {
        Some(&mut overlay)
    } else {
        None
    };

    let stop = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    info!("Coach running, Ctrl-C to quit");

    runtime.block_on(async {
        let stop_signal = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received");
                stop_signal.store(true, Ordering::Relaxed);
            }
        });

        run_loop(
            source,
            &mut pipeline,
            overlay,
            config.frame_interval(),
            args.max_ticks,
            stop.clone(),
        )
        .await
    })
}
