//! Tracking module
//!
//! Turns the perception pipeline's detections into gaze updates:
//! - Detection feed (JSON over UDP)
//! - Target selection, lock and loss handling
//! - The per-frame pipeline feeding the gaze encoder

pub mod detection;
pub mod feed;
pub mod pipeline;
pub mod tracker;

pub use detection::{Detection, ObjectKind, Vec3};
pub use pipeline::TrackingPipeline;
pub use tracker::{ActiveTarget, TargetSource, TargetTracker, TrackMode};
