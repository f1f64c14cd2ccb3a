//! Idle micro-movements
//!
//! Every pattern ends on offset 0 so a completed sequence leaves the eye at
//! its resting code.

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::animation::blink::uniform_secs;
use crate::animation::frame::{EyeFrame, FrameSource};
use crate::config::JitterConfig;
use crate::gaze::code::GazeCode;

/// Small-amplitude patterns used shortly after activity
const SMALL_PATTERNS: &[&[i32]] = &[
    &[-1, 0],
    &[1, 0],
    &[-1, 0],
    &[1, 0],
    &[-1, 0],
    &[1, 0],
    &[-1, 0],
    &[1, 0],
    &[-1, 1, 0],
    &[1, -1, 0],
    &[-1, 1, -1, 0],
    &[1, -1, 1, 0],
];

/// Wider patterns once the eye has been idle for a while
const LARGE_PATTERNS: &[&[i32]] = &[
    &[-1, 0],
    &[1, 0],
    &[-1, 1, 0],
    &[1, -1, 0],
    &[-1, 1, -1, 0],
    &[1, -1, 1, 0],
    &[1, 0, -1, 0, 1, 0],
    &[-1, -1, 0, 1, 1, 0],
    &[1, 1, 0, -1, -1, 0],
    &[1, 2, -1, 0],
    &[-1, -2, 1, 0],
    &[1, -2, 2, -1, 0],
    &[-1, 2, -2, 1, 0],
    &[1, 3, -2, -1, 0],
    &[-1, -3, 2, 1, 0],
    &[0, 1, -2, 3, -1, 0],
    &[0, -1, 2, -3, 1, 0],
    &[1, 2, -3, 4, -2, 1, 0],
    &[-1, -2, 3, -4, 2, -1, 0],
    &[0, 1, 3, -2, 1, -3, 0],
    &[1, -3, 4, -2, 3, -1, 0],
    &[-1, 3, -4, 2, -3, 1, 0],
    &[1, 4, -3, 2, -1, 0, -2, 3, -4, 1, 0],
    &[-1, -4, 3, -2, 1, 0, 2, -3, 4, -1, 0],
    &[0, 1, 4, -3, 2, -1, 0, -1, -4, 3, -2, 1, 0],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterLevel {
    Small,
    Large,
}

/// One jittered frame and the delay before it is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterStep {
    pub frame: EyeFrame,
    pub delay: Duration,
}

/// Holds the jitter sequence in flight
#[derive(Debug, Default)]
pub struct JitterManager {
    steps: VecDeque<JitterStep>,
    /// Resting code the sequence was built around
    anchor: Option<GazeCode>,
    sequences: u64,
}

impl JitterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Sequences started so far
    pub fn sequences(&self) -> u64 {
        self.sequences
    }

    /// Roll for a sequence around `resting`. Returns the delay before the
    /// first frame when one was started.
    pub fn try_begin<R: Rng>(
        &mut self,
        rng: &mut R,
        config: &JitterConfig,
        resting: GazeCode,
        level: JitterLevel,
        buckets: u32,
    ) -> Option<Duration> {
        if self.is_active() || !rng.random_bool(config.nervousness.clamp(0.0, 1.0)) {
            return None;
        }

        let catalog = match level {
            JitterLevel::Small => SMALL_PATTERNS,
            JitterLevel::Large => LARGE_PATTERNS,
        };
        let pattern = catalog[rng.random_range(0..catalog.len())];
        let max_x = buckets.saturating_sub(1) as i64;

        self.steps = pattern
            .iter()
            .map(|offset| {
                let x = (resting.x as i64 + *offset as i64).clamp(0, max_x) as u32;
                let (lo, hi) = (config.min_speed_ms, config.max_speed_ms.max(config.min_speed_ms));
                JitterStep {
                    frame: EyeFrame::open(resting.with_x(x), FrameSource::Jitter),
                    delay: Duration::from_millis(rng.random_range(lo..=hi)),
                }
            })
            .collect();
        self.anchor = Some(resting);
        self.sequences += 1;
        tracing::trace!("Jitter {:?} with {} steps", level, self.steps.len());

        self.steps.front().map(|s| s.delay)
    }

    /// Pop the frame due now and the delay before the following one
    pub fn advance(&mut self) -> Option<(EyeFrame, Option<Duration>)> {
        let step = self.steps.pop_front()?;
        let next = self.steps.front().map(|s| s.delay);
        Some((step.frame, next))
    }

    /// Finish or abandon the sequence, returning the code it was built around
    pub fn clear(&mut self) -> Option<GazeCode> {
        self.steps.clear();
        self.anchor.take()
    }
}

/// Pick the catalog for how long the eye has been idle
pub fn level_for(idle: Duration, config: &JitterConfig) -> JitterLevel {
    if idle.as_secs_f64() > config.large_start_delay_secs {
        JitterLevel::Large
    } else {
        JitterLevel::Small
    }
}

/// Delay between idle ticks
pub fn tick_interval<R: Rng>(config: &JitterConfig, rng: &mut R) -> Duration {
    uniform_secs(rng, config.min_interval_secs, config.max_interval_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::code::{YClass, ZClass};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn always() -> JitterConfig {
        JitterConfig {
            nervousness: 1.0,
            ..JitterConfig::default()
        }
    }

    #[test]
    fn test_catalogs_end_at_rest() {
        for pattern in SMALL_PATTERNS.iter().chain(LARGE_PATTERNS.iter()) {
            assert_eq!(pattern.last(), Some(&0));
        }
    }

    #[test]
    fn test_sequence_returns_to_resting() {
        let resting = GazeCode::new(20, YClass::Up, ZClass::Far);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut jitter = JitterManager::new();
            jitter
                .try_begin(&mut rng, &always(), resting, JitterLevel::Large, 41)
                .unwrap();

            let mut last = None;
            while let Some((frame, _)) = jitter.advance() {
                assert_eq!(frame.code.y, resting.y);
                assert_eq!(frame.code.z, resting.z);
                assert!(frame.code.x.abs_diff(resting.x) <= 4);
                last = Some(frame.code);
            }
            assert_eq!(last, Some(resting));
            assert_eq!(jitter.clear(), Some(resting));
        }
    }

    #[test]
    fn test_offsets_clamped() {
        let resting = GazeCode::new(0, YClass::Straight, ZClass::Near);
        let mut rng = StdRng::seed_from_u64(4);
        let mut jitter = JitterManager::new();
        jitter.try_begin(&mut rng, &always(), resting, JitterLevel::Large, 41);
        while let Some((frame, _)) = jitter.advance() {
            assert!(frame.code.x <= 40);
        }
    }

    #[test]
    fn test_zero_nervousness_never_starts() {
        let cfg = JitterConfig {
            nervousness: 0.0,
            ..JitterConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut jitter = JitterManager::new();
        for _ in 0..100 {
            assert!(jitter
                .try_begin(&mut rng, &cfg, GazeCode::centered(41), JitterLevel::Small, 41)
                .is_none());
        }
        assert_eq!(jitter.sequences(), 0);
    }

    #[test]
    fn test_only_one_sequence_in_flight() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut jitter = JitterManager::new();
        let code = GazeCode::centered(41);
        assert!(jitter
            .try_begin(&mut rng, &always(), code, JitterLevel::Small, 41)
            .is_some());
        assert!(jitter
            .try_begin(&mut rng, &always(), code, JitterLevel::Small, 41)
            .is_none());
    }

    #[test]
    fn test_step_delays_within_speed_range() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut jitter = JitterManager::new();
        let first = jitter
            .try_begin(&mut rng, &always(), GazeCode::centered(41), JitterLevel::Large, 41)
            .unwrap();
        assert!(first >= Duration::from_millis(500) && first <= Duration::from_millis(800));
        while let Some((_, next)) = jitter.advance() {
            if let Some(d) = next {
                assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(800));
            }
        }
    }

    #[test]
    fn test_level_threshold() {
        let cfg = JitterConfig::default();
        assert_eq!(level_for(Duration::from_secs(10), &cfg), JitterLevel::Small);
        assert_eq!(level_for(Duration::from_secs(61), &cfg), JitterLevel::Large);
    }
}
