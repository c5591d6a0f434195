//! CLI tool to run a saved screenshot through crop + offset detection.
//! Usage: cargo run -p aim-vision --features cli --bin analyze_frame -- <screenshot.png> [output_dir] [crop_ratio]

use aim_capture::{crop_centered, crop_side, mean_brightness, regions, region_brightness, to_gray};
use aim_vision::{EdgeMode, OffsetDetector};
use std::path::PathBuf;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <screenshot.png> [output_dir] [crop_ratio]", args[0]);
        std::process::exit(1);
    }

    let input_path = PathBuf::from(&args[1]);
    let output_dir = if args.len() >= 3 {
        PathBuf::from(&args[2])
    } else {
        PathBuf::from("./debug_output")
    };
    let crop_ratio = args
        .get(3)
        .and_then(|r| r.parse::<f64>().ok())
        .unwrap_or(0.2);
    let _ = std::fs::create_dir_all(&output_dir);

    println!("Loading image: {}", input_path.display());
    let img = match image::open(&input_path) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            eprintln!("Failed to open image: {}", e);
            std::process::exit(1);
        }
    };
    let (w, h) = (img.width(), img.height());
    println!("Image size: {}x{}", w, h);

    println!("\n=== Crosshair Crop ===");
    let side = crop_side(w, h, crop_ratio);
    let crop = crop_centered(&img, side);
    println!("Crop: {}x{} (ratio {:.2})", crop.width(), crop.height(), crop_ratio);
    if crop.width() == 0 || crop.height() == 0 {
        println!("Crop is empty, nothing to analyze");
        return;
    }
    let gray = to_gray(&crop);
    let _ = gray.save(output_dir.join("crosshair_crop.png"));
    println!("Crop brightness: {:.1}", mean_brightness(&gray));

    println!("\n=== Offset Detection ===");
    let modes = [
        ("canny", EdgeMode::default()),
        ("threshold", EdgeMode::Threshold { level: 200 }),
    ];
    for (label, mode) in modes {
        let detector = OffsetDetector::new(mode, 0.0, 0);
        match detector.detect(&gray) {
            Some(offset) => println!("{:>9}: {} px", label, offset),
            None => println!("{:>9}: no detection", label),
        }
    }

    println!("\n=== Round Banner ===");
    println!(
        "Banner brightness: {:.1}",
        region_brightness(&img, &regions::round_banner())
    );

    println!("\nDebug images saved to: {}", output_dir.display());
}
