//! Eye animation engine
//!
//! Turns the stream of gaze codes into displayed frames:
//! - Blinks that mask large jumps and fire spontaneously while idle
//! - Sleep with dozing, wake glances and display power-down
//! - Idle jitter around the resting code

pub mod actor;
pub mod blink;
pub mod coordinator;
pub mod frame;
pub mod host;
pub mod jitter;
pub mod sleep;

pub use actor::{AnimationEvent, AnimationHandle};
pub use coordinator::{AnimationCoordinator, AnimationSnapshot, Phase};
pub use frame::{EyeFrame, FrameSource, Lid};
pub use host::{Host, TimerKind};
