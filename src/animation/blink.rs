//! Blink sequencing
//!
//! A blink closes the eye at the currently displayed code and opens it at the
//! target. When the target differs the eye moves while closed, which hides
//! large jumps.

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;

use crate::animation::frame::{EyeFrame, FrameSource};
use crate::config::{secs, BlinkConfig};
use crate::gaze::code::GazeCode;

/// Longest blink, in steps
const MAX_BLINK_STEPS: u32 = 5;

/// Holds the frames of the blink in flight, if any
#[derive(Debug, Default)]
pub struct BlinkManager {
    steps: VecDeque<EyeFrame>,
    /// Code the eye opens at
    landing: Option<GazeCode>,
    completed: u64,
}

impl BlinkManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.landing.is_some()
    }

    /// Blinks finished so far
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Queue a blink from `current` to `target`. Returns `false` if a blink is
    /// already in flight.
    pub fn begin(&mut self, current: GazeCode, target: Option<GazeCode>) -> bool {
        if self.is_active() {
            return false;
        }

        let landing = target.unwrap_or(current);
        let src = FrameSource::Blink;
        self.steps.clear();
        self.steps.push_back(EyeFrame::half(current, src));
        self.steps.push_back(EyeFrame::closed(current, src));
        if landing != current {
            self.steps.push_back(EyeFrame::closed(landing, src));
        }
        self.steps.push_back(EyeFrame::half(landing, src));
        self.steps.push_back(EyeFrame::open(landing, src));
        self.landing = Some(landing);
        true
    }

    /// Next frame of the blink; the final open frame is returned last
    pub fn next_frame(&mut self) -> Option<EyeFrame> {
        self.steps.pop_front()
    }

    pub fn is_last_frame_shown(&self) -> bool {
        self.is_active() && self.steps.is_empty()
    }

    /// Mark the blink done and return the code it landed on
    pub fn finish(&mut self) -> Option<GazeCode> {
        self.steps.clear();
        let landing = self.landing.take()?;
        self.completed += 1;
        Some(landing)
    }
}

/// Delay before the next spontaneous blink
pub fn idle_interval<R: Rng>(config: &BlinkConfig, rng: &mut R) -> Duration {
    uniform_secs(rng, config.min_interval_secs, config.max_interval_secs)
}

/// Delay before the settling blink after a direct gaze update
pub fn settle_interval<R: Rng>(config: &BlinkConfig, rng: &mut R) -> Duration {
    uniform_secs(rng, config.settle_min_secs, config.settle_max_secs)
}

/// Time after which a blink is considered stuck
pub fn watchdog_timeout(config: &BlinkConfig) -> Duration {
    config
        .step_delay()
        .saturating_mul(MAX_BLINK_STEPS)
        .saturating_add(Duration::from_millis(config.watchdog_margin_ms))
}

/// Uniform duration in `[min, max]` seconds
pub(crate) fn uniform_secs<R: Rng>(rng: &mut R, min: f64, max: f64) -> Duration {
    if max > min {
        secs(rng.random_range(min..=max))
    } else {
        secs(min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::frame::Lid;
    use crate::gaze::code::{YClass, ZClass};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn code(x: u32) -> GazeCode {
        GazeCode::new(x, YClass::Straight, ZClass::Near)
    }

    fn drain(blink: &mut BlinkManager) -> Vec<(u32, Lid)> {
        let mut frames = Vec::new();
        while let Some(f) = blink.next_frame() {
            frames.push((f.code.x, f.lid));
        }
        frames
    }

    #[test]
    fn test_blink_in_place() {
        let mut blink = BlinkManager::new();
        assert!(blink.begin(code(5), None));
        assert_eq!(
            drain(&mut blink),
            vec![(5, Lid::Half), (5, Lid::Closed), (5, Lid::Half), (5, Lid::Open)]
        );
        assert!(blink.is_last_frame_shown());
        assert_eq!(blink.finish(), Some(code(5)));
        assert!(!blink.is_active());
    }

    #[test]
    fn test_blink_to_new_target() {
        let mut blink = BlinkManager::new();
        blink.begin(code(5), Some(code(30)));
        assert_eq!(
            drain(&mut blink),
            vec![
                (5, Lid::Half),
                (5, Lid::Closed),
                (30, Lid::Closed),
                (30, Lid::Half),
                (30, Lid::Open)
            ]
        );
        assert_eq!(blink.finish(), Some(code(30)));
    }

    #[test]
    fn test_second_begin_is_noop() {
        let mut blink = BlinkManager::new();
        assert!(blink.begin(code(1), Some(code(2))));
        assert!(!blink.begin(code(9), None));
        assert_eq!(blink.finish(), Some(code(2)));
        assert_eq!(blink.finish(), None);
        assert_eq!(blink.completed(), 1);
    }

    #[test]
    fn test_intervals_within_range() {
        let cfg = BlinkConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let d = idle_interval(&cfg, &mut rng);
            assert!(d >= Duration::from_secs(3) && d <= Duration::from_secs(8));
        }
    }

    #[test]
    fn test_watchdog_covers_longest_blink() {
        let cfg = BlinkConfig::default();
        assert!(watchdog_timeout(&cfg) > cfg.step_delay() * 5);

        let crawl = BlinkConfig {
            speed: 1e-300,
            ..BlinkConfig::default()
        };
        assert_eq!(watchdog_timeout(&crawl), Duration::MAX);
    }
}
