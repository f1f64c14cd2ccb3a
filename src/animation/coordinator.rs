//! Animation coordinator
//!
//! Owns the eye's phase and resting code and decides which generator may
//! touch the display. Every transition happens inside one of the `on_*`
//! methods, which the caller must invoke serially; timers are requested from
//! the [`Host`] and come back through [`AnimationCoordinator::on_timer`].

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::animation::blink::{self, BlinkManager};
use crate::animation::frame::{EyeFrame, FrameSource, Lid};
use crate::animation::host::{Host, TimerKind};
use crate::animation::jitter::{self, JitterManager};
use crate::animation::sleep::{self, SleepManager};
use crate::config::{secs, AnimationConfig};
use crate::gaze::code::{GazeCode, GazeUpdate};

/// What the eye is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Blinking,
    Sleeping,
}

/// How a gaze update was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A blink was in flight; the update was discarded
    Dropped,
    /// Same code as the resting one; nothing changed
    Duplicate,
    /// The change was masked with a blink
    Blinked,
    /// The code was shown immediately
    Displayed,
}

/// Point-in-time view for the API
#[derive(Debug, Clone, Serialize)]
pub struct AnimationSnapshot {
    pub phase: Phase,
    pub resting: GazeCode,
    pub displayed: EyeFrame,
    pub asset: String,
    pub display_on: bool,
    pub blinks_completed: u64,
    pub glances: u64,
    pub jitter_sequences: u64,
}

pub struct AnimationCoordinator {
    config: AnimationConfig,
    buckets: u32,
    rng: StdRng,
    phase: Phase,
    resting: GazeCode,
    displayed: EyeFrame,
    blink: BlinkManager,
    sleep: SleepManager,
    jitter: JitterManager,
    /// Sleep timer fired mid-blink; doze off once the blink completes
    pending_sleep: bool,
    last_activity: Instant,
}

impl AnimationCoordinator {
    pub fn new(config: &AnimationConfig, buckets: u32, now: Instant) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let resting = GazeCode::centered(buckets);

        Self {
            config: config.clone(),
            buckets: buckets.max(1),
            rng,
            phase: Phase::Idle,
            resting,
            displayed: EyeFrame::open(resting, FrameSource::Live),
            blink: BlinkManager::new(),
            sleep: SleepManager::new(),
            jitter: JitterManager::new(),
            pending_sleep: false,
            last_activity: now,
        }
    }

    /// Show the initial frame and arm the idle timers
    pub fn start<H: Host>(&mut self, host: &mut H) {
        self.show(self.displayed, host);
        host.arm(TimerKind::IdleBlink, blink::idle_interval(&self.config.blink, &mut self.rng));
        host.arm(TimerKind::Sleep, sleep::sleep_timeout(&self.config.sleep, &mut self.rng));
        host.arm(TimerKind::JitterLoop, secs(self.config.jitter.start_delay_secs));
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn resting(&self) -> GazeCode {
        self.resting
    }

    pub fn displayed(&self) -> EyeFrame {
        self.displayed
    }

    pub fn blinks_completed(&self) -> u64 {
        self.blink.completed()
    }

    pub fn jitter_active(&self) -> bool {
        self.jitter.is_active()
    }

    pub fn snapshot(&self) -> AnimationSnapshot {
        AnimationSnapshot {
            phase: self.phase,
            resting: self.resting,
            displayed: self.displayed,
            asset: self.displayed.asset_key(),
            display_on: self.sleep.display_on(),
            blinks_completed: self.blink.completed(),
            glances: self.sleep.glances(),
            jitter_sequences: self.jitter.sequences(),
        }
    }

    /// Handle a gaze code pushed by the tracking side
    pub fn on_gaze_update<H: Host>(
        &mut self,
        update: GazeUpdate,
        now: Instant,
        host: &mut H,
    ) -> UpdateOutcome {
        if self.phase == Phase::Blinking {
            tracing::trace!("Blink in progress, dropping {}", update.code);
            return UpdateOutcome::Dropped;
        }

        let code = self.clamp(update.code);
        let duplicate = !update.is_new_target && code == self.resting;

        // Any token wakes a sleeping eye, even one that repeats the resting code
        if self.phase == Phase::Sleeping {
            self.note_activity(now, host);
            if duplicate {
                self.show(EyeFrame::open(code, FrameSource::Live), host);
                return UpdateOutcome::Displayed;
            }
        }

        if duplicate {
            return UpdateOutcome::Duplicate;
        }

        let jump = update.is_new_target
            || code.x_distance(&self.resting) > self.config.jump_threshold
            || (self.config.blink_on_vertical_flip && code.vertical_flip(&self.resting));

        self.cancel_jitter(host);
        self.note_activity(now, host);

        if jump {
            tracing::debug!("Jump {} -> {}, masking with a blink", self.resting, code);
            self.begin_blink(code, host);
            return UpdateOutcome::Blinked;
        }

        self.show(EyeFrame::open(code, FrameSource::Live), host);
        self.resting = code;
        host.arm(TimerKind::IdleBlink, blink::settle_interval(&self.config.blink, &mut self.rng));
        host.arm(TimerKind::JitterLoop, secs(self.config.jitter.start_delay_secs));
        UpdateOutcome::Displayed
    }

    /// Blink now, landing on `target` or the resting code. No-op unless idle.
    pub fn simulate_blink<H: Host>(&mut self, target: Option<GazeCode>, host: &mut H) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        let target = target.map(|c| self.clamp(c)).unwrap_or(self.resting);
        self.begin_blink(target, host)
    }

    /// Genuine activity: stay awake and restart the countdown to sleep
    pub fn note_activity<H: Host>(&mut self, now: Instant, host: &mut H) {
        self.last_activity = now;
        self.pending_sleep = false;
        if self.phase == Phase::Sleeping {
            self.exit_sleep(host);
        }
        host.cancel(TimerKind::Wake);
        host.cancel(TimerKind::DisplayOff);
        host.arm(TimerKind::Sleep, sleep::sleep_timeout(&self.config.sleep, &mut self.rng));
    }

    /// Dispatch an expired timer
    pub fn on_timer<H: Host>(&mut self, kind: TimerKind, now: Instant, host: &mut H) {
        match kind {
            TimerKind::BlinkStep => self.on_blink_step(host),
            TimerKind::Watchdog => {
                if self.phase == Phase::Blinking {
                    tracing::warn!("Blink watchdog fired, forcing completion");
                    self.complete_blink(host);
                }
            }
            TimerKind::IdleBlink => {
                if self.phase == Phase::Idle {
                    self.begin_blink(self.resting, host);
                }
            }
            TimerKind::Sleep => self.on_sleep_timer(host),
            TimerKind::SleepStep => {
                if self.phase == Phase::Sleeping {
                    self.advance_sleep(host);
                }
            }
            TimerKind::Wake => self.on_wake_timer(host),
            TimerKind::DisplayOff => self.on_display_off(host),
            TimerKind::JitterLoop => self.on_jitter_tick(now, host),
            TimerKind::JitterStep => self.on_jitter_step(host),
        }
    }

    /// Apply new settings, re-arming timers whose ranges changed
    pub fn reconfigure<H: Host>(&mut self, config: &AnimationConfig, buckets: u32, host: &mut H) {
        let old = std::mem::replace(&mut self.config, config.clone());
        self.buckets = buckets.max(1);

        let clamped = self.clamp(self.resting);
        if clamped != self.resting {
            self.resting = clamped;
            if self.phase == Phase::Idle {
                self.cancel_jitter(host);
                self.show(EyeFrame::open(clamped, FrameSource::Live), host);
            }
        }

        let b = (&old.blink, &self.config.blink);
        if (b.0.min_interval_secs, b.0.max_interval_secs)
            != (b.1.min_interval_secs, b.1.max_interval_secs)
            && self.phase == Phase::Idle
        {
            host.arm(TimerKind::IdleBlink, blink::idle_interval(&self.config.blink, &mut self.rng));
        }

        let s = (&old.sleep, &self.config.sleep);
        if (s.0.min_timeout_secs, s.0.max_timeout_secs)
            != (s.1.min_timeout_secs, s.1.max_timeout_secs)
            && self.phase != Phase::Sleeping
        {
            host.arm(TimerKind::Sleep, sleep::sleep_timeout(&self.config.sleep, &mut self.rng));
        }
        if (s.0.min_random_wakeup_secs, s.0.max_random_wakeup_secs)
            != (s.1.min_random_wakeup_secs, s.1.max_random_wakeup_secs)
            && self.phase == Phase::Sleeping
            && !self.sleep.in_sequence()
            && self.sleep.display_on()
        {
            host.arm(TimerKind::Wake, sleep::wake_interval(&self.config.sleep, &mut self.rng));
        }
        if s.0.display_off_hours != s.1.display_off_hours
            && self.phase == Phase::Sleeping
            && self.sleep.display_on()
        {
            self.arm_display_off(host);
        }

        let j = (&old.jitter, &self.config.jitter);
        if (j.0.min_interval_secs, j.0.max_interval_secs)
            != (j.1.min_interval_secs, j.1.max_interval_secs)
        {
            host.arm(TimerKind::JitterLoop, jitter::tick_interval(&self.config.jitter, &mut self.rng));
        }

        tracing::debug!("Animation settings reloaded");
    }

    fn clamp(&self, code: GazeCode) -> GazeCode {
        code.with_x(code.x.min(self.buckets - 1))
    }

    fn show<H: Host>(&mut self, frame: EyeFrame, host: &mut H) {
        self.displayed = frame;
        host.display(frame);
    }

    fn begin_blink<H: Host>(&mut self, target: GazeCode, host: &mut H) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.cancel_jitter(host);
        if !self.blink.begin(self.displayed.code, Some(target)) {
            return false;
        }

        self.phase = Phase::Blinking;
        host.cancel(TimerKind::IdleBlink);
        host.arm(TimerKind::BlinkStep, self.config.blink.step_delay());
        host.arm(TimerKind::Watchdog, blink::watchdog_timeout(&self.config.blink));
        true
    }

    fn on_blink_step<H: Host>(&mut self, host: &mut H) {
        if self.phase != Phase::Blinking {
            return;
        }
        match self.blink.next_frame() {
            Some(frame) => {
                self.show(frame, host);
                if self.blink.is_last_frame_shown() {
                    self.complete_blink(host);
                } else {
                    host.arm(TimerKind::BlinkStep, self.config.blink.step_delay());
                }
            }
            None => self.complete_blink(host),
        }
    }

    fn complete_blink<H: Host>(&mut self, host: &mut H) {
        host.cancel(TimerKind::BlinkStep);
        host.cancel(TimerKind::Watchdog);
        let Some(landing) = self.blink.finish() else {
            return;
        };

        self.phase = Phase::Idle;
        self.resting = landing;
        if self.displayed.code != landing || self.displayed.lid != Lid::Open {
            self.show(EyeFrame::open(landing, FrameSource::Blink), host);
        }
        host.arm(TimerKind::IdleBlink, blink::idle_interval(&self.config.blink, &mut self.rng));

        if self.pending_sleep {
            self.pending_sleep = false;
            self.enter_sleep(host);
        }
    }

    fn on_sleep_timer<H: Host>(&mut self, host: &mut H) {
        match self.phase {
            Phase::Blinking => {
                tracing::debug!("Sleep timeout during blink, deferring");
                self.pending_sleep = true;
            }
            Phase::Sleeping => {}
            Phase::Idle => self.enter_sleep(host),
        }
    }

    fn enter_sleep<H: Host>(&mut self, host: &mut H) {
        tracing::info!("Entering sleep");
        self.cancel_jitter(host);
        host.cancel(TimerKind::IdleBlink);
        host.cancel(TimerKind::Sleep);
        self.phase = Phase::Sleeping;
        self.sleep.doze_off(self.resting, &self.config.sleep);
        self.advance_sleep(host);
        self.arm_display_off(host);
    }

    fn arm_display_off<H: Host>(&mut self, host: &mut H) {
        let hours = self.config.sleep.display_off_hours;
        if hours > 0.0 {
            host.arm(TimerKind::DisplayOff, secs(hours * 3600.0));
        } else {
            host.cancel(TimerKind::DisplayOff);
        }
    }

    fn exit_sleep<H: Host>(&mut self, host: &mut H) {
        tracing::info!("Exiting sleep");
        self.sleep.wake();
        self.phase = Phase::Idle;
        host.cancel(TimerKind::SleepStep);
        host.cancel(TimerKind::Wake);
        host.cancel(TimerKind::DisplayOff);
        if !self.sleep.display_on() {
            self.sleep.set_display_on(true);
            host.display_power(true);
        }
        host.arm(TimerKind::IdleBlink, blink::idle_interval(&self.config.blink, &mut self.rng));
    }

    /// Show the next dozing or glance frame, or go back to waiting for a glance
    fn advance_sleep<H: Host>(&mut self, host: &mut H) {
        match self.sleep.next_step(&mut self.rng, &self.config.sleep, self.buckets) {
            Some(step) => {
                self.show(step.frame, host);
                if self.sleep.sequence_finished() {
                    self.sleep.end_sequence();
                    self.arm_wake(host);
                } else {
                    host.arm(TimerKind::SleepStep, step.hold);
                }
            }
            None => self.arm_wake(host),
        }
    }

    fn arm_wake<H: Host>(&mut self, host: &mut H) {
        if self.sleep.display_on() {
            host.arm(TimerKind::Wake, sleep::wake_interval(&self.config.sleep, &mut self.rng));
        }
    }

    fn on_wake_timer<H: Host>(&mut self, host: &mut H) {
        if self.phase != Phase::Sleeping || self.sleep.in_sequence() || !self.sleep.display_on() {
            return;
        }
        let kind = self
            .sleep
            .begin_glance(&mut self.rng, &self.config.sleep, self.buckets);
        tracing::debug!("Wake glance: {:?}", kind);
        self.advance_sleep(host);
    }

    fn on_display_off<H: Host>(&mut self, host: &mut H) {
        if self.phase != Phase::Sleeping || !self.sleep.display_on() {
            return;
        }
        tracing::info!("Asleep for {}h, turning display off", self.config.sleep.display_off_hours);
        host.cancel(TimerKind::Wake);
        host.cancel(TimerKind::SleepStep);
        self.sleep.end_sequence();
        self.sleep.set_display_on(false);
        host.display_power(false);
    }

    fn on_jitter_tick<H: Host>(&mut self, now: Instant, host: &mut H) {
        host.arm(TimerKind::JitterLoop, jitter::tick_interval(&self.config.jitter, &mut self.rng));
        if self.phase != Phase::Idle || self.jitter.is_active() {
            return;
        }

        let idle: Duration = now.saturating_duration_since(self.last_activity);
        let level = jitter::level_for(idle, &self.config.jitter);
        if let Some(first) = self.jitter.try_begin(
            &mut self.rng,
            &self.config.jitter,
            self.resting,
            level,
            self.buckets,
        ) {
            host.arm(TimerKind::JitterStep, first);
        }
    }

    fn on_jitter_step<H: Host>(&mut self, host: &mut H) {
        if self.phase != Phase::Idle || !self.jitter.is_active() {
            return;
        }
        match self.jitter.advance() {
            Some((frame, Some(next))) => {
                self.show(frame, host);
                host.arm(TimerKind::JitterStep, next);
            }
            Some((frame, None)) => {
                self.show(frame, host);
                self.finish_jitter(host);
            }
            None => self.finish_jitter(host),
        }
    }

    fn finish_jitter<H: Host>(&mut self, host: &mut H) {
        self.jitter.clear();
        if self.displayed.code != self.resting || self.displayed.lid != Lid::Open {
            self.show(EyeFrame::open(self.resting, FrameSource::Jitter), host);
        }
    }

    fn cancel_jitter<H: Host>(&mut self, host: &mut H) {
        host.cancel(TimerKind::JitterStep);
        self.jitter.clear();
    }
}
