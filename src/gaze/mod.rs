//! Gaze encoding
//!
//! Quantises a target position into a horizontal bucket, a vertical class and
//! a depth class, with per-axis smoothing.

pub mod code;
pub mod encoder;
pub mod planes;

pub use code::{GazeCode, GazeUpdate, YClass, ZClass};
pub use encoder::GazeEncoder;
