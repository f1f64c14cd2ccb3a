//! Gazer - Headless gaze tracking and eye animation service
//!
//! A Rust service that drives an animatronic eye from a depth camera:
//! - Picks one target from the perception pipeline's detections
//! - Encodes where it is as a coarse gaze code sent over UDP
//! - Animates the eye with masked jumps, idle blinks, jitter and sleep
//! - Streams rendered frames to an external renderer over HTTP/SSE

pub mod animation;
pub mod config;
pub mod error;
pub mod gaze;
pub mod output;
pub mod settings;
pub mod tracking;
pub mod transport;
pub mod web;

pub use config::Config;
pub use error::{GazerError, Result};

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock};

use animation::{AnimationEvent, AnimationHandle};

/// Application state shared across all components
#[derive(Debug)]
pub struct AppState {
    /// Current configuration
    pub config: RwLock<Config>,
    /// Frames and display power changes from the animation actor
    pub events_tx: broadcast::Sender<AnimationEvent>,
    /// Shutdown signal
    pub shutdown_tx: broadcast::Sender<()>,
    /// Handle to the animation actor, once it is running
    pub animation: RwLock<Option<AnimationHandle>>,
    /// Bumped on every applied config change
    pub config_version: watch::Sender<u64>,
}

impl AppState {
    /// Create a new application state with the given configuration
    pub fn new(config: Config) -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(256);
        let (shutdown_tx, _) = broadcast::channel(1);
        let (config_version, _) = watch::channel(0);

        Arc::new(Self {
            config: RwLock::new(config),
            events_tx,
            shutdown_tx,
            animation: RwLock::new(None),
            config_version,
        })
    }

    /// Subscribe to animation output
    pub fn subscribe_events(&self) -> broadcast::Receiver<AnimationEvent> {
        self.events_tx.subscribe()
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub async fn set_animation(&self, handle: AnimationHandle) {
        *self.animation.write().await = Some(handle);
    }

    pub async fn animation(&self) -> Option<AnimationHandle> {
        self.animation.read().await.clone()
    }

    /// Apply one named setting. The new configuration is validated before it
    /// replaces the current one, so a rejected value leaves nothing changed.
    pub async fn apply_setting(&self, name: &str, value: f64) -> Result<()> {
        {
            let mut config = self.config.write().await;
            let mut updated = config.clone();
            updated.set_value(name, value)?;
            updated.validate()?;
            *config = updated;
        }

        tracing::info!("Setting {} = {}", name, value);
        self.signal_config_changed();
        Ok(())
    }

    /// Persist the current configuration
    pub async fn save_config(&self) -> Result<PathBuf> {
        self.config.read().await.save()
    }

    /// Signal that config has changed
    pub fn signal_config_changed(&self) {
        self.config_version.send_modify(|version| *version += 1);
    }

    /// Subscribe to config changes. A change made while the receiver is not
    /// being polled is still reported by the next `changed()`.
    pub fn subscribe_config(&self) -> watch::Receiver<u64> {
        self.config_version.subscribe()
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
