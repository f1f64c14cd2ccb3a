//! Side effects requested by the animation engine
//!
//! The coordinator never touches clocks or I/O directly. It asks its host to
//! arm and cancel named timers and to show frames; the host later feeds the
//! expired timers back in. Arming a kind that is already pending replaces it.

use std::time::Duration;

use serde::Serialize;

use crate::animation::frame::EyeFrame;

/// Every timer the engine can have pending. At most one of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Next frame of an in-flight blink
    BlinkStep,
    /// Next spontaneous blink
    IdleBlink,
    /// Forces a stuck blink to complete
    Watchdog,
    /// Inactivity countdown to sleep
    Sleep,
    /// Next frame of a dozing or glance sequence
    SleepStep,
    /// Next wake glance while asleep
    Wake,
    /// Power the display down after a long sleep
    DisplayOff,
    /// Idle tick that may start a jitter sequence
    JitterLoop,
    /// Next frame of an in-flight jitter sequence
    JitterStep,
}

impl TimerKind {
    pub const ALL: [TimerKind; 9] = [
        TimerKind::BlinkStep,
        TimerKind::IdleBlink,
        TimerKind::Watchdog,
        TimerKind::Sleep,
        TimerKind::SleepStep,
        TimerKind::Wake,
        TimerKind::DisplayOff,
        TimerKind::JitterLoop,
        TimerKind::JitterStep,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Environment the coordinator runs in
pub trait Host {
    /// Arm `kind` to fire after `after`, replacing any pending instance
    fn arm(&mut self, kind: TimerKind, after: Duration);

    /// Cancel `kind` if pending
    fn cancel(&mut self, kind: TimerKind);

    /// Show a frame
    fn display(&mut self, frame: EyeFrame);

    /// Switch the physical display on or off
    fn display_power(&mut self, on: bool);
}
