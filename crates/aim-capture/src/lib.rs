use anyhow::Result;
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};
use xcap::Monitor;

#[cfg(feature = "video")]
pub mod video;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No monitors detected on the system")]
    NoMonitors,

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Failed to open video '{path}': {reason}")]
    VideoOpen { path: String, reason: String },
}

/// Normalized screen region (0.0-1.0 coordinates relative to the captured frame)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRegion {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Well-known screen regions, independent of resolution
pub mod regions {
    use super::ScreenRegion;

    /// Round banner strip: 20% of the width, centered, starting 5% below the top edge.
    /// Its brightness jumps when the round-end banner appears or disappears.
    pub fn round_banner() -> ScreenRegion {
        ScreenRegion {
            x: 0.4,
            y: 0.05,
            width: 0.2,
            height: 0.05,
        }
    }
}

/// A captured screen frame. Owned by the tick that grabbed it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    /// Monotonic time since the source was opened (video time for recordings)
    pub elapsed: Duration,
    /// Wall clock at capture
    pub captured_at: SystemTime,
}

/// Anything that can hand the tick loop one frame at a time.
pub trait FrameSource {
    /// Grab the next frame. `Ok(None)` means the source is exhausted.
    fn grab(&mut self) -> Result<Option<Frame>>;

    /// Human-readable name for logs
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorInfo {
    pub index: usize,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

/// Enumerate the monitors xcap can see
pub fn list_monitors() -> Result<Vec<MonitorInfo>> {
    let monitors = Monitor::all().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
    Ok(monitors
        .iter()
        .enumerate()
        .map(|(index, m)| MonitorInfo {
            index,
            name: m.name().unwrap_or_default(),
            width: m.width().unwrap_or(0),
            height: m.height().unwrap_or(0),
            is_primary: m.is_primary().unwrap_or(false),
        })
        .collect())
}

/// Live capture of a single monitor
pub struct MonitorSource {
    monitor: Monitor,
    name: String,
    opened: Instant,
}

impl MonitorSource {
    /// Open the monitor at `index` (0-based). Out-of-range indices fall back to monitor 0.
    pub fn open(index: usize) -> Result<Self> {
        let monitors = Monitor::all().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        let count = monitors.len();
        if count == 0 {
            return Err(CaptureError::NoMonitors.into());
        }

        let index = if index < count {
            index
        } else {
            warn!(
                "Monitor index {} out of range ({} monitor(s)), falling back to 0",
                index, count
            );
            0
        };

        let monitor = monitors
            .into_iter()
            .nth(index)
            .ok_or(CaptureError::NoMonitors)?;
        let name = monitor.name().unwrap_or_default();
        info!("Capturing monitor {} ({})", index, name);

        Ok(Self {
            monitor,
            name,
            opened: Instant::now(),
        })
    }
}

impl FrameSource for MonitorSource {
    fn grab(&mut self) -> Result<Option<Frame>> {
        let image = self
            .monitor
            .capture_image()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        Ok(Some(Frame {
            image,
            elapsed: self.opened.elapsed(),
            captured_at: SystemTime::now(),
        }))
    }

    fn describe(&self) -> String {
        format!("monitor '{}'", self.name)
    }
}

/// Crop a region from a captured frame using normalized coordinates
pub fn crop_region(frame: &RgbaImage, region: &ScreenRegion) -> RgbaImage {
    let (w, h) = (frame.width(), frame.height());
    let x = (region.x * w as f64) as u32;
    let y = (region.y * h as f64) as u32;
    let rw = (region.width * w as f64) as u32;
    let rh = (region.height * h as f64) as u32;

    // Clamp to image bounds
    let x = x.min(w.saturating_sub(1));
    let y = y.min(h.saturating_sub(1));
    let rw = rw.min(w.saturating_sub(x));
    let rh = rh.min(h.saturating_sub(y));

    image::imageops::crop_imm(frame, x, y, rw, rh).to_image()
}

/// Side length of the crosshair crop for a frame: `ratio * min(width, height)`
pub fn crop_side(width: u32, height: u32, ratio: f64) -> u32 {
    (width.min(height) as f64 * ratio) as u32
}

/// Crop a `size`x`size` square centered on the frame, clipped to the frame edges.
/// May come back empty for degenerate frames or a zero size.
pub fn crop_centered(frame: &RgbaImage, size: u32) -> RgbaImage {
    let (w, h) = (frame.width(), frame.height());
    let (cx, cy) = (w / 2, h / 2);
    let half = size / 2;

    let left = cx.saturating_sub(half);
    let top = cy.saturating_sub(half);
    let right = (cx + half).min(w);
    let bottom = (cy + half).min(h);

    debug!(
        "Center crop: x={}..{} y={}..{} of {}x{}",
        left, right, top, bottom, w, h
    );

    image::imageops::crop_imm(
        frame,
        left,
        top,
        right.saturating_sub(left),
        bottom.saturating_sub(top),
    )
    .to_image()
}

/// Luma conversion used for both detection and brightness
pub fn to_gray(image: &RgbaImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Mean pixel value of a grayscale image, 0.0 when empty
pub fn mean_brightness(gray: &GrayImage) -> f64 {
    let n = gray.width() as u64 * gray.height() as u64;
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    sum as f64 / n as f64
}

/// Mean brightness of a normalized region of the frame, 0.0 when the region is empty
pub fn region_brightness(frame: &RgbaImage, region: &ScreenRegion) -> f64 {
    let crop = crop_region(frame, region);
    mean_brightness(&to_gray(&crop))
}
