//! Sleep state and wake glances
//!
//! While asleep the eye occasionally half-opens for a glance. Glances are
//! either a quick flash at a random code or a look-around that walks through
//! a short offset pattern. Frames produced here are tagged
//! [`FrameSource::Sleep`].

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;

use crate::animation::blink::uniform_secs;
use crate::animation::frame::{EyeFrame, FrameSource};
use crate::config::SleepConfig;
use crate::gaze::code::{GazeCode, YClass, ZClass};

/// Offset patterns for look-around glances
const LOOK_AROUND_PATTERNS: &[&[i32]] = &[
    &[-1, 0],
    &[1, 0],
    &[-1, 0, 1],
    &[1, 0, -1],
    &[-1, 0, 1, 0, -1],
    &[1, 0, -1, 0, 1],
    &[0, 1, 2, 1, 0],
    &[0, -1, -2, -1, 0],
    &[0, 1, 2, 3, 2, 1, 0],
    &[1, 2, 3, 2, 1, 0, -1],
    &[0, 1, 2, 3, 3, 2, 1, 0, -1],
];

/// Relative weights for the vertical class of a glance (up, down, straight)
const GLANCE_Y_WEIGHTS: [(YClass, u32); 3] =
    [(YClass::Up, 1), (YClass::Down, 1), (YClass::Straight, 2)];

/// One frame of a sleep sequence and how long it stays up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepStep {
    pub frame: EyeFrame,
    pub hold: Duration,
}

/// Kind of sequence being played while asleep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    DozeOff,
    SimpleGlance,
    LookAround,
}

#[derive(Debug)]
struct Sequence {
    kind: SequenceKind,
    steps: VecDeque<SleepStep>,
    /// Another look-around follows once these steps are done
    chained: bool,
}

/// Sleep bookkeeping
#[derive(Debug)]
pub struct SleepManager {
    sequence: Option<Sequence>,
    display_on: bool,
    glances: u64,
}

impl Default for SleepManager {
    fn default() -> Self {
        Self {
            sequence: None,
            display_on: true,
            glances: 0,
        }
    }
}

impl SleepManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dozing or glance sequence is being played
    pub fn in_sequence(&self) -> bool {
        self.sequence.is_some()
    }

    pub fn display_on(&self) -> bool {
        self.display_on
    }

    pub fn set_display_on(&mut self, on: bool) {
        self.display_on = on;
    }

    /// Glances played since start
    pub fn glances(&self) -> u64 {
        self.glances
    }

    /// Fall asleep at `resting`: half-closed, then closed
    pub fn doze_off(&mut self, resting: GazeCode, config: &SleepConfig) {
        let src = FrameSource::Sleep;
        let steps = VecDeque::from([
            SleepStep {
                frame: EyeFrame::half(resting, src),
                hold: Duration::from_millis(config.close_step_ms),
            },
            SleepStep {
                frame: EyeFrame::closed(resting, src),
                hold: Duration::ZERO,
            },
        ]);
        self.sequence = Some(Sequence {
            kind: SequenceKind::DozeOff,
            steps,
            chained: false,
        });
    }

    /// Start a wake glance. Returns the kind chosen.
    pub fn begin_glance<R: Rng>(
        &mut self,
        rng: &mut R,
        config: &SleepConfig,
        buckets: u32,
    ) -> SequenceKind {
        self.glances += 1;
        let seq = if rng.random_bool(config.look_around_probability.clamp(0.0, 1.0)) {
            look_around(rng, config, buckets)
        } else {
            simple_glance(rng, buckets)
        };
        let kind = seq.kind;
        self.sequence = Some(seq);
        kind
    }

    /// Next step of the current sequence. `None` means the sequence ended;
    /// a chained look-around is started in its place when one was rolled.
    pub fn next_step<R: Rng>(
        &mut self,
        rng: &mut R,
        config: &SleepConfig,
        buckets: u32,
    ) -> Option<SleepStep> {
        let seq = self.sequence.as_mut()?;
        if let Some(step) = seq.steps.pop_front() {
            return Some(step);
        }

        if seq.chained {
            tracing::debug!("Chaining another look-around");
            let mut next = look_around(rng, config, buckets);
            let step = next.steps.pop_front();
            self.sequence = Some(next);
            return step;
        }

        self.sequence = None;
        None
    }

    /// The current sequence has nothing left to show and will not chain
    pub fn sequence_finished(&self) -> bool {
        match &self.sequence {
            Some(seq) => seq.steps.is_empty() && !seq.chained,
            None => true,
        }
    }

    pub fn end_sequence(&mut self) {
        self.sequence = None;
    }

    /// Leave sleep, dropping anything in flight
    pub fn wake(&mut self) {
        self.sequence = None;
    }
}

fn random_code<R: Rng>(rng: &mut R, buckets: u32) -> GazeCode {
    let x = rng.random_range(0..buckets.max(1));
    let total: u32 = GLANCE_Y_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut pick = rng.random_range(0..total);
    let mut y = YClass::Straight;
    for (class, weight) in GLANCE_Y_WEIGHTS {
        if pick < weight {
            y = class;
            break;
        }
        pick -= weight;
    }
    GazeCode::new(x, y, ZClass::Near)
}

fn clamp_x(x: i64, buckets: u32) -> u32 {
    x.clamp(0, buckets.saturating_sub(1) as i64) as u32
}

fn millis<R: Rng>(rng: &mut R, min: u64, max: u64) -> Duration {
    Duration::from_millis(rng.random_range(min..=max))
}

/// half -> open -> half -> closed at one random code
fn simple_glance<R: Rng>(rng: &mut R, buckets: u32) -> Sequence {
    let code = random_code(rng, buckets);
    let src = FrameSource::Sleep;
    let steps = VecDeque::from([
        SleepStep {
            frame: EyeFrame::half(code, src),
            hold: Duration::from_millis(100),
        },
        SleepStep {
            frame: EyeFrame::open(code, src),
            hold: millis(rng, 500, 1000),
        },
        SleepStep {
            frame: EyeFrame::half(code, src),
            hold: Duration::from_millis(100),
        },
        SleepStep {
            frame: EyeFrame::closed(code, src),
            hold: Duration::ZERO,
        },
    ]);
    Sequence {
        kind: SequenceKind::SimpleGlance,
        steps,
        chained: false,
    }
}

/// Walk a catalog pattern around a random start, half-close on the last
/// position, then close at the start
fn look_around<R: Rng>(rng: &mut R, config: &SleepConfig, buckets: u32) -> Sequence {
    let start = random_code(rng, buckets);
    let pattern = LOOK_AROUND_PATTERNS[rng.random_range(0..LOOK_AROUND_PATTERNS.len())];
    let src = FrameSource::Sleep;
    let len = pattern.len();

    let mut steps = VecDeque::with_capacity(len + 1);
    for (i, offset) in pattern.iter().enumerate() {
        let code = start.with_x(clamp_x(start.x as i64 + *offset as i64, buckets));
        let frame = if i + 1 == len {
            EyeFrame::half(code, src)
        } else {
            EyeFrame::open(code, src)
        };

        let base = if i + 1 == len {
            Duration::from_millis(100)
        } else if i + 2 == len {
            millis(rng, 500, 800)
        } else {
            millis(rng, 200, 400)
        };
        let focus = if i == 0 || i + 2 == len {
            Duration::from_millis(200)
        } else {
            Duration::ZERO
        };
        steps.push_back(SleepStep {
            frame,
            hold: base + focus,
        });
    }

    let chained = rng.random_bool(config.chain_probability.clamp(0.0, 1.0));
    let hold = if chained {
        millis(rng, 200, 800)
    } else {
        Duration::ZERO
    };
    steps.push_back(SleepStep {
        frame: EyeFrame::closed(start, src),
        hold,
    });

    Sequence {
        kind: SequenceKind::LookAround,
        steps,
        chained,
    }
}

/// Delay until the next wake glance
pub fn wake_interval<R: Rng>(config: &SleepConfig, rng: &mut R) -> Duration {
    uniform_secs(rng, config.min_random_wakeup_secs, config.max_random_wakeup_secs)
}

/// Inactivity before dozing off
pub fn sleep_timeout<R: Rng>(config: &SleepConfig, rng: &mut R) -> Duration {
    uniform_secs(rng, config.min_timeout_secs, config.max_timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::frame::Lid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn drain(sleep: &mut SleepManager, rng: &mut StdRng, cfg: &SleepConfig) -> Vec<SleepStep> {
        let mut out = Vec::new();
        while let Some(step) = sleep.next_step(rng, cfg, 41) {
            out.push(step);
            if out.len() > 500 {
                break;
            }
        }
        out
    }

    #[test]
    fn test_doze_off_half_then_closed() {
        let mut sleep = SleepManager::new();
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = SleepConfig::default();
        let resting = GazeCode::new(12, YClass::Up, ZClass::Far);

        sleep.doze_off(resting, &cfg);
        assert!(sleep.in_sequence());
        let steps = drain(&mut sleep, &mut rng, &cfg);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].frame, EyeFrame::half(resting, FrameSource::Sleep));
        assert_eq!(steps[0].hold, Duration::from_millis(100));
        assert_eq!(steps[1].frame.lid, Lid::Closed);
        assert!(!sleep.in_sequence());
    }

    #[test]
    fn test_simple_glance_shape() {
        let mut sleep = SleepManager::new();
        let mut rng = StdRng::seed_from_u64(3);
        let cfg = SleepConfig {
            look_around_probability: 0.0,
            ..SleepConfig::default()
        };
        assert_eq!(sleep.begin_glance(&mut rng, &cfg, 41), SequenceKind::SimpleGlance);

        let steps = drain(&mut sleep, &mut rng, &cfg);
        let lids: Vec<Lid> = steps.iter().map(|s| s.frame.lid).collect();
        assert_eq!(lids, vec![Lid::Half, Lid::Open, Lid::Half, Lid::Closed]);
        let hold = steps[1].hold;
        assert!(hold >= Duration::from_millis(500) && hold <= Duration::from_millis(1000));
    }

    #[test]
    fn test_look_around_shape() {
        let cfg = SleepConfig {
            look_around_probability: 1.0,
            chain_probability: 0.0,
            ..SleepConfig::default()
        };
        for seed in 0..50 {
            let mut sleep = SleepManager::new();
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(sleep.begin_glance(&mut rng, &cfg, 41), SequenceKind::LookAround);

            let steps = drain(&mut sleep, &mut rng, &cfg);
            let n = steps.len();
            assert!(n >= 3);
            assert_eq!(steps[n - 1].frame.lid, Lid::Closed);
            assert_eq!(steps[n - 2].frame.lid, Lid::Half);
            assert_eq!(steps[n - 2].hold, Duration::from_millis(100));
            for step in &steps[..n - 2] {
                assert_eq!(step.frame.lid, Lid::Open);
            }
            for step in &steps {
                assert!(step.frame.code.x <= 40);
                assert_eq!(step.frame.source, FrameSource::Sleep);
            }
        }
    }

    #[test]
    fn test_look_around_clamps_at_edges() {
        let cfg = SleepConfig {
            look_around_probability: 1.0,
            chain_probability: 0.0,
            ..SleepConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut sleep = SleepManager::new();
        sleep.begin_glance(&mut rng, &cfg, 1);
        for step in drain(&mut sleep, &mut rng, &cfg) {
            assert_eq!(step.frame.code.x, 0);
        }
    }

    #[test]
    fn test_chained_look_around_continues() {
        let cfg = SleepConfig {
            look_around_probability: 1.0,
            chain_probability: 1.0,
            ..SleepConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut sleep = SleepManager::new();
        sleep.begin_glance(&mut rng, &cfg, 41);

        // With certain chaining the sequence never runs dry
        let steps = drain(&mut sleep, &mut rng, &cfg);
        assert!(steps.len() > 500);
        let closes = steps.iter().filter(|s| s.frame.lid == Lid::Closed).count();
        assert!(closes > 10);
        assert!(!sleep.sequence_finished());
    }

    #[test]
    fn test_wake_clears_sequence() {
        let mut sleep = SleepManager::new();
        let cfg = SleepConfig::default();
        sleep.doze_off(GazeCode::centered(41), &cfg);
        sleep.wake();
        assert!(!sleep.in_sequence());
    }

    #[test]
    fn test_random_code_weights() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut straight = 0;
        for _ in 0..4000 {
            if random_code(&mut rng, 41).y == YClass::Straight {
                straight += 1;
            }
        }
        // Expected 2000
        assert!((1800..2200).contains(&straight));
    }
}
