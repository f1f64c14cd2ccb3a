//! Tokio actor hosting the animation coordinator
//!
//! Gaze updates, API requests and expired timers all arrive on the actor's
//! task and are applied one at a time, so the coordinator never sees two
//! events interleave.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::animation::coordinator::{AnimationCoordinator, AnimationSnapshot};
use crate::animation::frame::EyeFrame;
use crate::animation::host::{Host, TimerKind};
use crate::config::AnimationConfig;
use crate::error::GazerError;
use crate::gaze::code::{GazeCode, GazeUpdate};

/// Output of the animation engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnimationEvent {
    Frame {
        frame: EyeFrame,
        asset: String,
        candidates: Vec<String>,
    },
    DisplayPower {
        on: bool,
    },
}

impl AnimationEvent {
    fn frame(frame: EyeFrame) -> Self {
        Self::Frame {
            frame,
            asset: frame.asset_key(),
            candidates: frame.asset_candidates(),
        }
    }
}

/// Commands accepted by the animation actor
#[derive(Debug)]
pub enum AnimationCommand {
    Gaze(GazeUpdate),
    Blink {
        target: Option<GazeCode>,
        respond_to: oneshot::Sender<bool>,
    },
    Snapshot {
        respond_to: oneshot::Sender<AnimationSnapshot>,
    },
    Reconfigure {
        config: AnimationConfig,
        buckets: u32,
    },
}

/// Handle to communicate with the animation actor
#[derive(Clone, Debug)]
pub struct AnimationHandle {
    sender: mpsc::Sender<AnimationCommand>,
}

impl AnimationHandle {
    /// Push a gaze update. Never waits: when the mailbox is full the update
    /// is dropped, since the next one replaces it anyway.
    pub fn push_gaze(&self, update: GazeUpdate) {
        if let Err(e) = self.sender.try_send(AnimationCommand::Gaze(update)) {
            tracing::debug!("Gaze update not delivered: {}", e);
        }
    }

    /// Request a blink; `false` if one could not start
    pub async fn blink(&self, target: Option<GazeCode>) -> Result<bool, GazerError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(AnimationCommand::Blink {
                target,
                respond_to: tx,
            })
            .await
            .map_err(|_| GazerError::AnimationGone)?;
        rx.await.map_err(|_| GazerError::AnimationGone)
    }

    pub async fn snapshot(&self) -> Result<AnimationSnapshot, GazerError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(AnimationCommand::Snapshot { respond_to: tx })
            .await
            .map_err(|_| GazerError::AnimationGone)?;
        rx.await.map_err(|_| GazerError::AnimationGone)
    }

    pub async fn reconfigure(&self, config: AnimationConfig, buckets: u32) -> Result<(), GazerError> {
        self.sender
            .send(AnimationCommand::Reconfigure { config, buckets })
            .await
            .map_err(|_| GazerError::AnimationGone)
    }
}

/// Timers backed by tokio tasks. Each arm bumps the kind's generation so a
/// timer that was replaced or cancelled after it already fired is ignored.
struct TokioHost {
    timers: [Option<JoinHandle<()>>; TimerKind::ALL.len()],
    generations: [u64; TimerKind::ALL.len()],
    fired_tx: mpsc::UnboundedSender<(TimerKind, u64)>,
    events_tx: broadcast::Sender<AnimationEvent>,
}

impl TokioHost {
    fn is_current(&self, kind: TimerKind, generation: u64) -> bool {
        self.generations[kind.index()] == generation
    }

    fn abort_all(&mut self) {
        for slot in self.timers.iter_mut() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Host for TokioHost {
    fn arm(&mut self, kind: TimerKind, after: Duration) {
        self.cancel(kind);
        let generation = self.generations[kind.index()];
        let tx = self.fired_tx.clone();
        self.timers[kind.index()] = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send((kind, generation));
        }));
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.generations[kind.index()] += 1;
        if let Some(handle) = self.timers[kind.index()].take() {
            handle.abort();
        }
    }

    fn display(&mut self, frame: EyeFrame) {
        tracing::trace!("Display {}", frame.asset_key());
        let _ = self.events_tx.send(AnimationEvent::frame(frame));
    }

    fn display_power(&mut self, on: bool) {
        tracing::info!("Display power {}", if on { "on" } else { "off" });
        let _ = self.events_tx.send(AnimationEvent::DisplayPower { on });
    }
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Spawn the animation actor
pub fn spawn(
    config: &AnimationConfig,
    buckets: u32,
    events_tx: broadcast::Sender<AnimationEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> AnimationHandle {
    let (sender, mut rx) = mpsc::channel(64);
    let (fired_tx, mut fired_rx) = mpsc::unbounded_channel();

    let mut coordinator = AnimationCoordinator::new(config, buckets, now());

    tokio::spawn(async move {
        let mut host = TokioHost {
            timers: Default::default(),
            generations: [0; TimerKind::ALL.len()],
            fired_tx,
            events_tx,
        };
        coordinator.start(&mut host);
        tracing::info!("Animation actor started");

        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        AnimationCommand::Gaze(update) => {
                            let outcome = coordinator.on_gaze_update(update, now(), &mut host);
                            tracing::trace!("Gaze {} -> {:?}", update.code, outcome);
                        }
                        AnimationCommand::Blink { target, respond_to } => {
                            let _ = respond_to.send(coordinator.simulate_blink(target, &mut host));
                        }
                        AnimationCommand::Snapshot { respond_to } => {
                            let _ = respond_to.send(coordinator.snapshot());
                        }
                        AnimationCommand::Reconfigure { config, buckets } => {
                            coordinator.reconfigure(&config, buckets, &mut host);
                        }
                    }
                }
                Some((kind, generation)) = fired_rx.recv() => {
                    if host.is_current(kind, generation) {
                        host.timers[kind.index()] = None;
                        coordinator.on_timer(kind, now(), &mut host);
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }

        host.abort_all();
        tracing::info!("Animation actor stopped");
    });

    AnimationHandle { sender }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::coordinator::Phase;
    use crate::animation::frame::{FrameSource, Lid};
    use crate::config::{BlinkConfig, JitterConfig};
    use crate::gaze::code::{YClass, ZClass};

    fn config() -> AnimationConfig {
        AnimationConfig {
            seed: Some(3),
            blink: BlinkConfig {
                min_interval_secs: 500.0,
                max_interval_secs: 600.0,
                settle_min_secs: 500.0,
                settle_max_secs: 600.0,
                ..BlinkConfig::default()
            },
            jitter: JitterConfig {
                nervousness: 0.0,
                ..JitterConfig::default()
            },
            ..AnimationConfig::default()
        }
    }

    fn code(x: u32) -> GazeCode {
        GazeCode::new(x, YClass::Straight, ZClass::Near)
    }

    #[tokio::test(start_paused = true)]
    async fn test_blink_masked_jump_through_actor() {
        let (events_tx, mut events_rx) = broadcast::channel(64);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = spawn(&config(), 41, events_tx, shutdown_rx);

        handle.push_gaze(GazeUpdate::new(code(30), true));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.resting, code(30));
        assert_eq!(snap.blinks_completed, 1);

        let mut frames = Vec::new();
        while let Ok(AnimationEvent::Frame { frame, .. }) = events_rx.try_recv() {
            frames.push(frame);
        }
        assert_eq!(frames.first(), Some(&EyeFrame::open(code(20), FrameSource::Live)));
        assert_eq!(
            frames.last(),
            Some(&EyeFrame::new(code(30), Lid::Open, FrameSource::Blink))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_after_inactivity() {
        let (events_tx, _events_rx) = broadcast::channel(64);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = spawn(&config(), 41, events_tx, shutdown_rx);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(handle.snapshot().await.unwrap().phase, Phase::Idle);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(handle.snapshot().await.unwrap().phase, Phase::Sleeping);

        handle.push_gaze(GazeUpdate::new(code(22), false));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.snapshot().await.unwrap().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_applies() {
        let (events_tx, _events_rx) = broadcast::channel(64);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = spawn(&config(), 41, events_tx, shutdown_rx);

        let mut longer = config();
        longer.sleep.min_timeout_secs = 100.0;
        longer.sleep.max_timeout_secs = 100.0;
        handle.reconfigure(longer, 41).await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.snapshot().await.unwrap().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_errors_after_shutdown() {
        let (events_tx, _events_rx) = broadcast::channel(64);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = spawn(&config(), 41, events_tx, shutdown_rx);

        shutdown_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.snapshot().await.is_err());
    }
}
