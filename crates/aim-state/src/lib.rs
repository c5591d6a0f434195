//! Per-run aim state: smoothing, shot debouncing and round tracking.
//!
//! Every component here is a plain value owned by the tick loop. Nothing is
//! global and nothing is shared across threads.

pub mod round;
pub mod shot;
pub mod smoothing;

pub use round::{Round, RoundTracker};
pub use shot::{ShotDetector, ShotEvent};
pub use smoothing::{DisplaySmoother, StatsSmoother};

/// One tick's vertical offset in pixels (positive = below baseline), or `None` on a miss
pub type OffsetSample = Option<i32>;
