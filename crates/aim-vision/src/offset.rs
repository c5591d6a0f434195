use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// How the crop is turned into a binary edge map before contour extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EdgeMode {
    /// Canny edge detection with hysteresis thresholds on gradient magnitude
    Canny { low: f32, high: f32 },
    /// Plain binary threshold: pixels brighter than `level` are foreground
    Threshold { level: u8 },
}

impl Default for EdgeMode {
    fn default() -> Self {
        EdgeMode::Canny {
            low: 60.0,
            high: 150.0,
        }
    }
}

/// Extracts the signed vertical offset of the dominant shape in a grayscale crop.
///
/// The offset is measured from the crop's vertical center shifted down by
/// `guide_offset`; positive values mean the shape sits below that baseline.
#[derive(Debug, Clone)]
pub struct OffsetDetector {
    edge: EdgeMode,
    min_area: f64,
    guide_offset: i32,
}

impl OffsetDetector {
    pub fn new(edge: EdgeMode, min_area: f64, guide_offset: i32) -> Self {
        Self {
            edge,
            min_area,
            guide_offset,
        }
    }

    /// Returns `None` when nothing usable was found: no edges, no outer contour,
    /// or a largest contour whose area does not exceed `min_area`.
    pub fn detect(&self, gray: &GrayImage) -> Option<i32> {
        if gray.width() == 0 || gray.height() == 0 {
            return None;
        }

        let edges = self.edge_map(gray);
        let contours: Vec<Contour<i32>> = find_contours(&edges);

        // Outermost borders only; ties keep the first contour in scan order
        let mut largest: Option<(&Contour<i32>, f64)> = None;
        for contour in contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        {
            let area = polygon_area(contour);
            if largest.map_or(true, |(_, best)| area > best) {
                largest = Some((contour, area));
            }
        }

        let (contour, area) = largest?;
        if area <= self.min_area {
            trace!("Largest contour too small ({:.1} px²)", area);
            return None;
        }

        let cy = centroid_y(contour)?;
        let baseline = (gray.height() / 2) as i32 + self.guide_offset;
        Some(cy.floor() as i32 - baseline)
    }

    fn edge_map(&self, gray: &GrayImage) -> GrayImage {
        match self.edge {
            EdgeMode::Canny { low, high } => imageproc::edges::canny(gray, low, high),
            EdgeMode::Threshold { level } => {
                let (w, h) = gray.dimensions();
                GrayImage::from_fn(w, h, |x, y| {
                    if gray.get_pixel(x, y)[0] > level {
                        Luma([255u8])
                    } else {
                        Luma([0u8])
                    }
                })
            }
        }
    }
}

/// Spatial moments (m00, m01) of the closed polygon traced by a contour,
/// via Green's theorem. m00 is signed by winding direction.
fn polygon_moments(contour: &Contour<i32>) -> (f64, f64) {
    let pts = &contour.points;
    let n = pts.len();
    let mut m00 = 0.0;
    let mut m01 = 0.0;
    for i in 0..n {
        let p = pts[i];
        let q = pts[(i + 1) % n];
        let (xi, yi) = (p.x as f64, p.y as f64);
        let (xj, yj) = (q.x as f64, q.y as f64);
        let cross = xi * yj - xj * yi;
        m00 += cross;
        m01 += cross * (yi + yj);
    }
    (m00 / 2.0, m01 / 6.0)
}

fn polygon_area(contour: &Contour<i32>) -> f64 {
    polygon_moments(contour).0.abs()
}

/// Area-weighted centroid row, `None` for degenerate (zero-area) contours
fn centroid_y(contour: &Contour<i32>) -> Option<f64> {
    let (m00, m01) = polygon_moments(contour);
    if m00 == 0.0 {
        return None;
    }
    Some(m01 / m00)
}
