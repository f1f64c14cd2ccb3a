//! Active target selection
//!
//! Picks at most one target per frame out of the detection feed. A lock is
//! held while the target stays in view, survives short disappearances, and
//! the last target's position keeps being served for a while after it is
//! gone so the gaze does not snap away during brief quiet periods.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

use crate::config::{secs, TrackerConfig};
use crate::tracking::detection::{Detection, ObjectKind, Vec3};

/// Externally visible tracker mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackMode {
    Idle,
    Locked,
    WaitingForReturn,
    Looking,
}

/// Where the emitted position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSource {
    /// The locked target was seen this frame
    Live,
    /// The locked target is missing and its last position is being held
    Held,
    /// Nothing is locked; the previous target's last position is served
    Fallback,
}

/// The single target the gaze should follow this frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveTarget {
    pub id: u32,
    pub kind: ObjectKind,
    pub position: Vec3,
    pub source: TargetSource,
}

impl ActiveTarget {
    pub fn identity(&self) -> (u32, ObjectKind) {
        (self.id, self.kind)
    }
}

#[derive(Debug, Clone, Copy)]
struct Lock {
    id: u32,
    kind: ObjectKind,
    position: Vec3,
    locked_since: Instant,
    last_seen: Instant,
}

impl Lock {
    fn emit(&self, source: TargetSource) -> ActiveTarget {
        ActiveTarget {
            id: self.id,
            kind: self.kind,
            position: self.position,
            source,
        }
    }

    fn matches(&self, d: &Detection) -> bool {
        d.id == self.id && d.kind == self.kind
    }
}

#[derive(Debug, Clone, Copy)]
enum TrackState {
    Idle,
    Locked(Lock),
    WaitingForReturn { lock: Lock, lost_at: Instant },
    Looking,
}

/// One-slot cache of the last target that was given up on
#[derive(Debug, Clone, Copy)]
struct PreviousTarget {
    id: u32,
    kind: ObjectKind,
    position: Vec3,
    lost_at: Instant,
}

/// Candidate awaiting enough consecutive wins to be locked
#[derive(Debug, Clone, Copy)]
struct PendingLock {
    id: u32,
    kind: ObjectKind,
    frames: u32,
}

/// Selects and holds the active target
pub struct TargetTracker {
    config: TrackerConfig,
    /// Eye position; candidate depth is measured from here
    origin: Vec3,
    state: TrackState,
    previous: Option<PreviousTarget>,
    pending: Option<PendingLock>,
    /// Frame index at which each visible identity was first seen
    first_seen: HashMap<(u32, ObjectKind), u64>,
    frame: u64,
    last_closest_check: Option<Instant>,
}

impl TargetTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            config: config.clone(),
            origin: Vec3::default(),
            state: TrackState::Idle,
            previous: None,
            pending: None,
            first_seen: HashMap::new(),
            frame: 0,
            last_closest_check: None,
        }
    }

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Swap in new tuning without disturbing the current lock
    pub fn reconfigure(&mut self, config: &TrackerConfig, origin: Vec3) {
        self.config = config.clone();
        self.origin = origin;
    }

    pub fn mode(&self) -> TrackMode {
        match self.state {
            TrackState::Idle => TrackMode::Idle,
            TrackState::Locked(_) => TrackMode::Locked,
            TrackState::WaitingForReturn { .. } => TrackMode::WaitingForReturn,
            TrackState::Looking => TrackMode::Looking,
        }
    }

    /// Feed one frame of detections and get the active target, if any
    pub fn update(&mut self, detections: &[Detection], now: Instant) -> Option<ActiveTarget> {
        self.frame += 1;

        let valid: Vec<Detection> = detections
            .iter()
            .filter(|d| {
                let ok = d.position.is_finite();
                if !ok {
                    tracing::trace!("Dropping detection {} with non-finite position", d.id);
                }
                ok
            })
            .copied()
            .collect();

        self.note_first_seen(&valid);

        match self.state {
            TrackState::Locked(mut lock) => {
                if let Some(d) = valid.iter().find(|d| lock.matches(d)) {
                    lock.position = d.position;
                    lock.last_seen = now;
                    let lock = self.check_closest(lock, &valid, now);
                    self.state = TrackState::Locked(lock);
                    return Some(lock.emit(TargetSource::Live));
                }

                if now.saturating_duration_since(lock.locked_since) >= secs(self.config.min_dwell_secs)
                {
                    tracing::debug!("Target {} lost, waiting for return", lock.id);
                    self.state = TrackState::WaitingForReturn { lock, lost_at: now };
                    return Some(lock.emit(TargetSource::Held));
                }

                tracing::debug!("Target {} vanished before dwell time, looking", lock.id);
                self.state = TrackState::Looking;
            }
            TrackState::WaitingForReturn { mut lock, lost_at } => {
                if let Some(d) = valid.iter().find(|d| lock.matches(d)) {
                    tracing::debug!("Target {} returned", lock.id);
                    lock.position = d.position;
                    lock.last_seen = now;
                    self.state = TrackState::Locked(lock);
                    return Some(lock.emit(TargetSource::Live));
                }

                if now.saturating_duration_since(lost_at) < secs(self.config.return_timeout_secs) {
                    return Some(lock.emit(TargetSource::Held));
                }

                tracing::debug!("Target {} did not return, looking", lock.id);
                self.previous = Some(PreviousTarget {
                    id: lock.id,
                    kind: lock.kind,
                    position: lock.position,
                    lost_at: now,
                });
                self.state = TrackState::Looking;
            }
            TrackState::Idle | TrackState::Looking => {}
        }

        if let Some(lock) = self.select(&valid, now) {
            return Some(lock.emit(TargetSource::Live));
        }

        self.fallback(now)
    }

    fn note_first_seen(&mut self, valid: &[Detection]) {
        let frame = self.frame;
        self.first_seen
            .retain(|key, _| valid.iter().any(|d| d.identity() == *key));
        for d in valid {
            self.first_seen.entry(d.identity()).or_insert(frame);
        }
    }

    /// Nearest candidate; ties go to whichever was seen first, then the lower id
    fn nearest<'a>(&self, candidates: &[&'a Detection]) -> Option<&'a Detection> {
        candidates.iter().copied().min_by(|a, b| {
            let da = a.position.depth_from(self.origin);
            let db = b.position.depth_from(self.origin);
            da.total_cmp(&db)
                .then_with(|| {
                    let fa = self.first_seen.get(&a.identity()).copied().unwrap_or(u64::MAX);
                    let fb = self.first_seen.get(&b.identity()).copied().unwrap_or(u64::MAX);
                    fa.cmp(&fb)
                })
                .then_with(|| a.id.cmp(&b.id))
        })
    }

    /// Try to acquire a lock while idle or looking
    fn select(&mut self, valid: &[Detection], now: Instant) -> Option<Lock> {
        let persons: Vec<&Detection> = valid
            .iter()
            .filter(|d| d.moving && d.kind == ObjectKind::Person)
            .collect();
        let objects: Vec<&Detection> = valid
            .iter()
            .filter(|d| d.moving && d.kind == ObjectKind::Object)
            .collect();

        let (choice, immediate) = match (persons.len(), objects.len()) {
            (1, 0) => (persons.first().copied(), true),
            (0, 1) => (objects.first().copied(), true),
            (0, 0) => (None, false),
            (0, _) => (self.nearest(&objects), false),
            _ => (self.nearest(&persons), false),
        };

        let Some(choice) = choice else {
            self.pending = None;
            return None;
        };

        if !immediate {
            let frames = match self.pending {
                Some(p) if p.id == choice.id && p.kind == choice.kind => p.frames + 1,
                _ => 1,
            };
            self.pending = Some(PendingLock {
                id: choice.id,
                kind: choice.kind,
                frames,
            });
            if frames < self.config.frames_needed {
                return None;
            }
        }

        tracing::info!("Locked {:?} {}", choice.kind, choice.id);
        let lock = Lock {
            id: choice.id,
            kind: choice.kind,
            position: choice.position,
            locked_since: now,
            last_seen: now,
        };
        self.state = TrackState::Locked(lock);
        self.pending = None;
        self.previous = None;
        self.last_closest_check = Some(now);
        Some(lock)
    }

    /// Periodic switch to a nearer moving person while locked
    fn check_closest(&mut self, lock: Lock, valid: &[Detection], now: Instant) -> Lock {
        if !self.config.always_closest {
            return lock;
        }
        let due = match self.last_closest_check {
            Some(at) => {
                now.saturating_duration_since(at) >= secs(self.config.closest_check_interval_secs)
            }
            None => true,
        };
        if !due {
            return lock;
        }
        self.last_closest_check = Some(now);

        let persons: Vec<&Detection> = valid
            .iter()
            .filter(|d| d.moving && d.kind == ObjectKind::Person)
            .collect();
        match self.nearest(&persons) {
            Some(d)
                if !lock.matches(d)
                    && d.position.depth_from(self.origin) < lock.position.depth_from(self.origin) =>
            {
                tracing::info!("Switching to closer person {}", d.id);
                Lock {
                    id: d.id,
                    kind: d.kind,
                    position: d.position,
                    locked_since: now,
                    last_seen: now,
                }
            }
            _ => lock,
        }
    }

    fn fallback(&mut self, now: Instant) -> Option<ActiveTarget> {
        let prev = self.previous?;
        if now.saturating_duration_since(prev.lost_at) < secs(self.config.fallback_window_secs) {
            Some(ActiveTarget {
                id: prev.id,
                kind: prev.kind,
                position: prev.position,
                source: TargetSource::Fallback,
            })
        } else {
            tracing::debug!("Fallback window for target {} expired", prev.id);
            self.previous = None;
            None
        }
    }
}
