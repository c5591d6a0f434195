pub mod offset;

pub use offset::{EdgeMode, OffsetDetector};
