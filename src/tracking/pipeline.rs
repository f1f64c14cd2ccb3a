//! Per-frame tracking: detections in, gaze updates out

use std::time::Instant;

use crate::config::Config;
use crate::gaze::code::GazeUpdate;
use crate::gaze::encoder::GazeEncoder;
use crate::tracking::detection::{Detection, ObjectKind, Vec3};
use crate::tracking::tracker::{ActiveTarget, TargetTracker, TrackMode};

/// Tracker and encoder driven together once per detection frame
pub struct TrackingPipeline {
    tracker: TargetTracker,
    encoder: GazeEncoder,
    identity: Option<(u32, ObjectKind)>,
}

impl TrackingPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            tracker: TargetTracker::new(&config.tracker)
                .with_origin(Vec3::from(config.encoder.origin)),
            encoder: GazeEncoder::new(&config.encoder),
            identity: None,
        }
    }

    /// Pick up new tunables without dropping the current lock
    pub fn reconfigure(&mut self, config: &Config) {
        self.tracker
            .reconfigure(&config.tracker, Vec3::from(config.encoder.origin));
        self.encoder.reconfigure(&config.encoder);
    }

    pub fn mode(&self) -> TrackMode {
        self.tracker.mode()
    }

    /// Process one frame. Returns the update to transmit, if any target is
    /// being followed.
    pub fn process(&mut self, detections: &[Detection], now: Instant) -> Option<GazeUpdate> {
        let Some(target) = self.tracker.update(detections, now) else {
            if self.identity.take().is_some() {
                tracing::debug!("No target, gaze released");
            }
            return None;
        };

        Some(self.encode(target))
    }

    fn encode(&mut self, target: ActiveTarget) -> GazeUpdate {
        let identity = target.identity();
        let changed = self.identity != Some(identity);
        if changed {
            tracing::info!(
                "Following {:?} {} ({:?})",
                target.kind,
                target.id,
                target.source
            );
            self.identity = Some(identity);
        }

        self.encoder
            .update_for(target.position, target.kind, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            tracker: TrackerConfig {
                frames_needed: 1,
                min_dwell_secs: 0.0,
                return_timeout_secs: 0.0,
                fallback_window_secs: 0.0,
                ..TrackerConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_first_lock_is_new_target() {
        let mut pipeline = TrackingPipeline::new(&config());
        let now = Instant::now();
        let frame = [Detection::person(1, Vec3::new(0.0, 0.0, -1.0), true)];

        let first = pipeline.process(&frame, now).unwrap();
        assert!(first.is_new_target);
        assert_eq!(first.code.x, 20);

        let second = pipeline
            .process(&frame, now + Duration::from_millis(33))
            .unwrap();
        assert!(!second.is_new_target);
        assert_eq!(second.code, first.code);
        assert_eq!(pipeline.mode(), TrackMode::Locked);
    }

    #[test]
    fn test_target_loss_resets_identity() {
        let mut pipeline = TrackingPipeline::new(&config());
        let start = Instant::now();
        let frame = [Detection::person(1, Vec3::new(0.0, 0.0, -1.0), true)];

        assert!(pipeline.process(&frame, start).unwrap().is_new_target);

        let mut t = start;
        let mut released = false;
        for _ in 0..5 {
            t += Duration::from_millis(100);
            if pipeline.process(&[], t).is_none() {
                released = true;
                break;
            }
        }
        assert!(released);

        // Same id again still counts as a fresh target
        let again = pipeline
            .process(&frame, t + Duration::from_millis(100))
            .unwrap();
        assert!(again.is_new_target);
    }

    #[test]
    fn test_empty_feed_emits_nothing() {
        let mut pipeline = TrackingPipeline::new(&Config::default());
        assert!(pipeline.process(&[], Instant::now()).is_none());
        assert_eq!(pipeline.mode(), TrackMode::Idle);
    }
}
