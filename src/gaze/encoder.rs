//! Hysteresis-stabilised gaze encoding
//!
//! The horizontal axis follows the target immediately while it keeps moving
//! the same way and only turns around after `x_reversal_samples` consecutive
//! samples in the opposite direction. The vertical and depth axes use a
//! unanimous sliding window: the stable class changes only when every sample
//! in the last `stable_*_window` frames agrees. The window length doubles as
//! the number of matching samples required.

use std::collections::VecDeque;

use crate::config::EncoderConfig;
use crate::gaze::code::{GazeCode, GazeUpdate, YClass, ZClass};
use crate::gaze::planes::{self, DepthPlane};
use crate::tracking::detection::{ObjectKind, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    None,
    Left,
    Right,
}

/// Directional hysteresis for the horizontal bucket
#[derive(Debug, Clone)]
struct SweepState {
    stable: Option<u32>,
    direction: Direction,
    opposite_run: u32,
}

impl SweepState {
    fn new() -> Self {
        Self {
            stable: None,
            direction: Direction::None,
            opposite_run: 0,
        }
    }

    fn adopt(&mut self, raw: u32) {
        self.stable = Some(raw);
        self.direction = Direction::None;
        self.opposite_run = 0;
    }

    fn push(&mut self, raw: u32, reversal_samples: u32) -> u32 {
        let Some(stable) = self.stable else {
            self.adopt(raw);
            return raw;
        };

        let moved = if raw > stable {
            Direction::Right
        } else if raw < stable {
            Direction::Left
        } else {
            self.opposite_run = 0;
            return stable;
        };

        if self.direction == Direction::None || moved == self.direction {
            self.stable = Some(raw);
            self.direction = moved;
            self.opposite_run = 0;
            return raw;
        }

        self.opposite_run += 1;
        if self.opposite_run >= reversal_samples {
            self.stable = Some(raw);
            self.direction = moved;
            self.opposite_run = 0;
            raw
        } else {
            stable
        }
    }
}

/// Unanimous sliding-window debounce
#[derive(Debug, Clone)]
struct Debounce<T> {
    history: VecDeque<T>,
    stable: Option<T>,
}

impl<T: Copy + PartialEq> Debounce<T> {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            stable: None,
        }
    }

    fn adopt(&mut self, raw: T) {
        self.history.clear();
        self.history.push_back(raw);
        self.stable = Some(raw);
    }

    fn push(&mut self, raw: T, window: usize) -> T {
        let window = window.max(1);
        if self.stable.is_none() {
            self.adopt(raw);
            return raw;
        }

        self.history.push_back(raw);
        while self.history.len() > window {
            self.history.pop_front();
        }

        if self.history.len() == window && self.history.iter().all(|v| *v == raw) {
            self.stable = Some(raw);
        }
        self.stable.unwrap_or(raw)
    }
}

/// Per-target smoothing memory for all three axes
#[derive(Debug, Clone)]
pub struct EncoderState {
    x: SweepState,
    y: Debounce<YClass>,
    z: Debounce<ZClass>,
}

impl EncoderState {
    fn new() -> Self {
        Self {
            x: SweepState::new(),
            y: Debounce::new(),
            z: Debounce::new(),
        }
    }
}

/// Converts target positions into stable gaze codes
pub struct GazeEncoder {
    config: EncoderConfig,
    depth_plane: DepthPlane,
    state: EncoderState,
    last: GazeCode,
}

impl GazeEncoder {
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            config: config.clone(),
            depth_plane: DepthPlane::new(config),
            state: EncoderState::new(),
            last: GazeCode::centered(config.num_divisions),
        }
    }

    /// Apply new geometry. Smoothing memory is kept; windows shrink lazily.
    pub fn reconfigure(&mut self, config: &EncoderConfig) {
        self.config = config.clone();
        self.depth_plane = DepthPlane::new(config);
        if self.last.x >= config.num_divisions {
            self.last.x = config.num_divisions.saturating_sub(1);
            self.state.x.adopt(self.last.x);
        }
    }

    /// Encode a person's position
    pub fn update(&mut self, position: Vec3, identity_changed: bool) -> GazeUpdate {
        self.update_for(position, ObjectKind::Person, identity_changed)
    }

    /// Encode a position using the vertical dividers configured for `kind`
    pub fn update_for(
        &mut self,
        position: Vec3,
        kind: ObjectKind,
        identity_changed: bool,
    ) -> GazeUpdate {
        if identity_changed {
            self.state = EncoderState::new();
        }

        if !position.is_finite() {
            return GazeUpdate::new(self.last, identity_changed);
        }

        let origin = Vec3::from(self.config.origin);
        let dividers = match kind {
            ObjectKind::Person => &self.config.person_dividers,
            ObjectKind::Object => &self.config.object_dividers,
        };
        let raw_y = planes::y_class(position, origin, dividers);
        let raw_z = self.depth_plane.classify(position);

        let x = match planes::x_bucket(position, &self.config) {
            Some(raw) => self.state.x.push(raw, self.config.x_reversal_samples),
            None => self.last.x,
        };
        let y = self.state.y.push(raw_y, self.config.stable_y_window);
        let z = self.state.z.push(raw_z, self.config.stable_z_window);

        self.last = GazeCode::new(x, y, z);
        GazeUpdate::new(self.last, identity_changed)
    }
}
