use crate::{CaptureError, Frame, FrameSource};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

/// Replays a recorded video as a frame source.
/// Decoding runs on its own thread; frames come back over a small bounded channel.
pub struct VideoSource {
    path: PathBuf,
    rx: Receiver<(RgbaImage, Duration)>,
    stop: Arc<AtomicBool>,
    decoder: Option<JoinHandle<anyhow::Result<()>>>,
}

impl VideoSource {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Err(CaptureError::VideoOpen {
                path: path.display().to_string(),
                reason: "file not found".to_string(),
            }
            .into());
        }

        info!("Video source opening: {}", path.display());

        let (tx, rx) = sync_channel::<(RgbaImage, Duration)>(2);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_decode = stop.clone();
        let path_owned = path.to_path_buf();
        let decoder = std::thread::spawn(move || decode_video(&path_owned, tx, stop_decode));

        Ok(Self {
            path: path.to_path_buf(),
            rx,
            stop,
            decoder: Some(decoder),
        })
    }

    fn finish_decoder(&mut self) -> anyhow::Result<()> {
        if let Some(handle) = self.decoder.take() {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => warn!("Video decode thread panicked"),
            }
        }
        Ok(())
    }
}

impl FrameSource for VideoSource {
    fn grab(&mut self) -> anyhow::Result<Option<Frame>> {
        match self.rx.recv() {
            Ok((image, elapsed)) => Ok(Some(Frame {
                image,
                elapsed,
                captured_at: SystemTime::now(),
            })),
            Err(_) => {
                // Channel closed: video finished or decoder failed
                self.finish_decoder()?;
                info!("Video decode complete");
                Ok(None)
            }
        }
    }

    fn describe(&self) -> String {
        let filename = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!("[Video] {}", filename)
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Blocking video decode using ffmpeg-next.
/// Sends decoded RGBA frames with their presentation time through the channel.
fn decode_video(
    path: &Path,
    tx: SyncSender<(RgbaImage, Duration)>,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    ffmpeg_next::init()?;

    let mut ictx = ffmpeg_next::format::input(path).map_err(|e| CaptureError::VideoOpen {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let video_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or_else(|| anyhow::anyhow!("No video stream found"))?;

    let stream_index = video_stream.index();
    let time_base = f64::from(video_stream.time_base());
    let decoder_ctx =
        ffmpeg_next::codec::context::Context::from_parameters(video_stream.parameters())?;
    let mut decoder = decoder_ctx.decoder().video()?;

    let mut scaler = ffmpeg_next::software::scaling::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg_next::format::Pixel::RGBA,
        decoder.width(),
        decoder.height(),
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    )?;

    info!(
        "Video opened: {}x{}, format {:?}",
        decoder.width(),
        decoder.height(),
        decoder.format()
    );

    let width = decoder.width();
    let height = decoder.height();

    let mut convert = |decoded: &ffmpeg_next::frame::Video| -> anyhow::Result<Option<(RgbaImage, Duration)>> {
        let mut rgba_frame = ffmpeg_next::frame::Video::empty();
        scaler.run(decoded, &mut rgba_frame)?;

        let data = rgba_frame.data(0);
        let stride = rgba_frame.stride(0);

        // Copy row-by-row in case stride != width*4
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height as usize {
            let row_start = y * stride;
            let row_end = row_start + (width as usize * 4);
            pixels.extend_from_slice(&data[row_start..row_end]);
        }

        let secs = decoded
            .timestamp()
            .map(|pts| (pts as f64 * time_base).max(0.0))
            .unwrap_or(0.0);

        Ok(RgbaImage::from_raw(width, height, pixels).map(|img| (img, Duration::from_secs_f64(secs))))
    };

    for (stream, packet) in ictx.packets() {
        if stop.load(Ordering::Relaxed) {
            return Ok(());
        }

        if stream.index() != stream_index {
            continue;
        }

        decoder.send_packet(&packet)?;

        let mut decoded_frame = ffmpeg_next::frame::Video::empty();
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            if let Some(frame) = convert(&decoded_frame)? {
                if tx.send(frame).is_err() {
                    // Receiver dropped
                    return Ok(());
                }
            }
        }
    }

    // Flush decoder
    decoder.send_eof()?;
    let mut decoded_frame = ffmpeg_next::frame::Video::empty();
    while decoder.receive_frame(&mut decoded_frame).is_ok() {
        if stop.load(Ordering::Relaxed) {
            return Ok(());
        }
        if let Some(frame) = convert(&decoded_frame)? {
            if tx.send(frame).is_err() {
                return Ok(());
            }
        }
    }

    Ok(())
}
