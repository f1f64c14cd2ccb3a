//! Configuration parsing and management for Gazer

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, GazerError};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub encoder: EncoderConfig,
    pub animation: AnimationConfig,
    pub feed: FeedConfig,
    pub transport: TransportConfig,
    pub settings: SettingsConfig,
    pub http: HttpConfig,
    /// File this configuration was loaded from (target of `save`)
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GazerError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        let mut config = Self::from_str(&contents)?;
        config.source_path = Some(path.as_ref().to_path_buf());
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, GazerError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, GazerError> {
        let paths = [
            PathBuf::from("gazer.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Write the configuration back to the file it was loaded from, or to
    /// `gazer.toml` in the working directory.
    pub fn save(&self) -> Result<PathBuf, GazerError> {
        let path = self
            .source_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("gazer.toml"));
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::WriteFile(e.to_string()))?;
        std::fs::write(&path, contents)
            .map_err(|e| ConfigError::WriteFile(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), GazerError> {
        let t = &self.tracker;
        if t.frames_needed == 0 {
            return Err(ConfigError::invalid("tracker.frames_needed", "Must be at least 1").into());
        }
        for (field, value) in [
            ("tracker.min_dwell_secs", t.min_dwell_secs),
            ("tracker.return_timeout_secs", t.return_timeout_secs),
            ("tracker.fallback_window_secs", t.fallback_window_secs),
            ("tracker.closest_check_interval_secs", t.closest_check_interval_secs),
        ] {
            check_non_negative(field, value)?;
        }

        let e = &self.encoder;
        if e.num_divisions == 0 {
            return Err(ConfigError::invalid("encoder.num_divisions", "Must be at least 1").into());
        }
        if !(e.field_of_view_deg > 0.0 && e.field_of_view_deg <= 360.0) {
            return Err(ConfigError::invalid(
                "encoder.field_of_view_deg",
                "Field of view must be within (0, 360] degrees",
            )
            .into());
        }
        if e.x_reversal_samples == 0 {
            return Err(
                ConfigError::invalid("encoder.x_reversal_samples", "Must be at least 1").into(),
            );
        }
        if e.stable_y_window == 0 || e.stable_z_window == 0 {
            return Err(ConfigError::invalid(
                "encoder.stable_y_window",
                "Debounce windows must hold at least one sample",
            )
            .into());
        }
        if e.z_segments == 0 {
            return Err(ConfigError::invalid("encoder.z_segments", "Must be at least 1").into());
        }
        if e.z_divider_curve < 0.0 {
            return Err(
                ConfigError::invalid("encoder.z_divider_curve", "Radius cannot be negative").into(),
            );
        }

        self.animation.validate()
    }

    /// Apply a single named runtime setting (hot reload).
    ///
    /// Names follow the flat keys used by the control panel, e.g.
    /// `blink_speed`, `min_sleep_timeout`, `stable_y_thres`. The caller is
    /// expected to run [`Config::validate`] afterwards.
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), ConfigError> {
        let as_f32 = value as f32;
        let as_count = || -> Result<u32, ConfigError> {
            if value.is_finite() && value >= 0.0 {
                Ok(value.round() as u32)
            } else {
                Err(ConfigError::invalid(name, "Expected a non-negative number"))
            }
        };

        match name {
            // Tracker
            "frames_needed" => self.tracker.frames_needed = as_count()?,
            "min_dwell_time" => self.tracker.min_dwell_secs = value,
            "return_timeout" => self.tracker.return_timeout_secs = value,
            "fallback_window" => self.tracker.fallback_window_secs = value,
            "always_closest" => self.tracker.always_closest = value != 0.0,
            "closest_check_interval" => self.tracker.closest_check_interval_secs = value,

            // Encoder
            "camera_z" => self.encoder.origin[2] = as_f32,
            "x_divider_angle" => self.encoder.field_of_view_deg = as_f32,
            "num_divisions" => self.encoder.num_divisions = as_count()?,
            "x_reversal_samples" => self.encoder.x_reversal_samples = as_count()?,
            "stable_y_thres" => self.encoder.stable_y_window = as_count()? as usize,
            "stable_z_thres" => self.encoder.stable_z_window = as_count()? as usize,
            "y_top_divider" => self.encoder.person_dividers.top = as_f32,
            "y_bottom_divider" => self.encoder.person_dividers.bottom = as_f32,
            "y_top_divider_angle" => self.encoder.person_dividers.top_angle_deg = as_f32,
            "y_bottom_divider_angle" => self.encoder.person_dividers.bottom_angle_deg = as_f32,
            "y_top_divider_object" => self.encoder.object_dividers.top = as_f32,
            "y_bottom_divider_object" => self.encoder.object_dividers.bottom = as_f32,
            "z_divider" => self.encoder.z_divider = as_f32,
            "z_divider_curve" => self.encoder.z_divider_curve = as_f32,

            // Animation
            "jump_threshold" => self.animation.jump_threshold = as_count()?,
            "blink_speed" => self.animation.blink.speed = value,
            "min_blink_interval" => self.animation.blink.min_interval_secs = value,
            "max_blink_interval" => self.animation.blink.max_interval_secs = value,
            "min_sleep_timeout" => self.animation.sleep.min_timeout_secs = value,
            "max_sleep_timeout" => self.animation.sleep.max_timeout_secs = value,
            "min_random_wakeup" => self.animation.sleep.min_random_wakeup_secs = value,
            "max_random_wakeup" => self.animation.sleep.max_random_wakeup_secs = value,
            "display_off_timeout" => self.animation.sleep.display_off_hours = value,
            "nervousness" => self.animation.jitter.nervousness = value,
            "jitter_start_delay" => self.animation.jitter.start_delay_secs = value,
            "large_jitter_start_delay" => self.animation.jitter.large_start_delay_secs = value,
            "min_jitter_interval" => self.animation.jitter.min_interval_secs = value,
            "max_jitter_interval" => self.animation.jitter.max_interval_secs = value,
            "min_jitter_speed" => self.animation.jitter.min_speed_ms = as_count()? as u64,
            "max_jitter_speed" => self.animation.jitter.max_speed_ms = as_count()? as u64,

            _ => return Err(ConfigError::UnknownSetting(name.to_string())),
        }

        Ok(())
    }
}

/// Longest accepted timer setting: 30 days
const MAX_DELAY_SECS: f64 = 30.0 * 24.0 * 3600.0;

/// Slowest accepted blink speed (one minute per frame at the default base delay)
const MIN_BLINK_SPEED: f64 = 0.01;

fn check_non_negative(field: &str, value: f64) -> Result<(), GazerError> {
    if (0.0..=MAX_DELAY_SECS).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "Must be between 0 seconds and 30 days").into())
    }
}

fn check_range(min_field: &str, min: f64, max: f64) -> Result<(), GazerError> {
    check_non_negative(min_field, min)?;
    check_non_negative(min_field, max)?;
    if max < min {
        return Err(ConfigError::invalid(min_field, "Minimum exceeds the matching maximum").into());
    }
    Ok(())
}

fn check_probability(field: &str, value: f64) -> Result<(), GazerError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "Probability must be between 0.0 and 1.0").into())
    }
}

/// Convert fractional seconds to a `Duration`, treating garbage as zero.
/// Values too large for a `Duration` saturate.
pub fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// Target selection tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Consecutive frames a nearest candidate must win before it is locked
    pub frames_needed: u32,
    /// Minimum lock age before a disappearance counts as a real loss
    pub min_dwell_secs: f64,
    /// How long a lost target is waited for before looking elsewhere
    pub return_timeout_secs: f64,
    /// How long the last target's position is served when nothing moves
    pub fallback_window_secs: f64,
    /// Periodically switch to a nearer moving person while locked
    pub always_closest: bool,
    /// Period of the always-closest re-check
    pub closest_check_interval_secs: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frames_needed: 5,
            min_dwell_secs: 3.0,
            return_timeout_secs: 5.0,
            fallback_window_secs: 5.0,
            always_closest: false,
            closest_check_interval_secs: 15.0,
        }
    }
}

/// Vertical divider planes for one kind of target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YDividerConfig {
    /// Height of the top divider above the origin (metres)
    pub top: f32,
    /// Depth of the bottom divider below the origin (metres)
    pub bottom: f32,
    /// Tilt of the top divider (degrees)
    pub top_angle_deg: f32,
    /// Tilt of the bottom divider (degrees)
    pub bottom_angle_deg: f32,
}

impl Default for YDividerConfig {
    fn default() -> Self {
        Self {
            top: 0.25,
            bottom: 0.25,
            top_angle_deg: 0.0,
            bottom_angle_deg: 0.0,
        }
    }
}

/// Gaze encoding geometry and debounce tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Eye origin in camera space [x, y, z]
    pub origin: [f32; 3],
    /// Horizontal span covered by the buckets (degrees)
    pub field_of_view_deg: f32,
    /// Number of horizontal buckets
    pub num_divisions: u32,
    /// Consecutive opposite-direction samples needed to reverse the sweep
    pub x_reversal_samples: u32,
    /// Unanimous samples required to change the vertical class
    pub stable_y_window: usize,
    /// Unanimous samples required to change the depth class
    pub stable_z_window: usize,
    pub person_dividers: YDividerConfig,
    pub object_dividers: YDividerConfig,
    /// Distance of the near/far plane in front of the origin (metres)
    pub z_divider: f32,
    /// Radius of the near/far arc; 0 keeps the plane flat
    pub z_divider_curve: f32,
    /// Straight segments used to approximate the arc
    pub z_segments: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            field_of_view_deg: 120.0,
            num_divisions: 41,
            x_reversal_samples: 2,
            stable_y_window: 10,
            stable_z_window: 10,
            person_dividers: YDividerConfig::default(),
            object_dividers: YDividerConfig::default(),
            z_divider: 2.0,
            z_divider_curve: 0.0,
            z_segments: 20,
        }
    }
}

/// Animation engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Horizontal bucket jump that is masked with a blink
    pub jump_threshold: u32,
    /// Mask Down <-> Up/Straight changes with a blink as well
    pub blink_on_vertical_flip: bool,
    /// Fixed RNG seed (random when unset)
    pub seed: Option<u64>,
    pub blink: BlinkConfig,
    pub sleep: SleepConfig,
    pub jitter: JitterConfig,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            jump_threshold: 10,
            blink_on_vertical_flip: true,
            seed: None,
            blink: BlinkConfig::default(),
            sleep: SleepConfig::default(),
            jitter: JitterConfig::default(),
        }
    }
}

impl AnimationConfig {
    pub fn validate(&self) -> Result<(), GazerError> {
        let b = &self.blink;
        if !(b.speed.is_finite() && b.speed >= MIN_BLINK_SPEED) {
            return Err(
                ConfigError::invalid("animation.blink.speed", "Must be at least 0.01").into(),
            );
        }
        check_range("animation.blink.min_interval_secs", b.min_interval_secs, b.max_interval_secs)?;
        check_range("animation.blink.settle_min_secs", b.settle_min_secs, b.settle_max_secs)?;

        let s = &self.sleep;
        check_range("animation.sleep.min_timeout_secs", s.min_timeout_secs, s.max_timeout_secs)?;
        check_range(
            "animation.sleep.min_random_wakeup_secs",
            s.min_random_wakeup_secs,
            s.max_random_wakeup_secs,
        )?;
        check_non_negative("animation.sleep.display_off_hours", s.display_off_hours * 3600.0)?;
        check_probability("animation.sleep.look_around_probability", s.look_around_probability)?;
        check_probability("animation.sleep.chain_probability", s.chain_probability)?;

        let j = &self.jitter;
        check_probability("animation.jitter.nervousness", j.nervousness)?;
        check_non_negative("animation.jitter.start_delay_secs", j.start_delay_secs)?;
        check_non_negative("animation.jitter.large_start_delay_secs", j.large_start_delay_secs)?;
        check_range("animation.jitter.min_interval_secs", j.min_interval_secs, j.max_interval_secs)?;
        if j.max_speed_ms < j.min_speed_ms {
            return Err(ConfigError::invalid(
                "animation.jitter.min_speed_ms",
                "Minimum exceeds the matching maximum",
            )
            .into());
        }

        Ok(())
    }
}

/// Blink timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Speed divisor applied to `base_delay_ms` (higher is faster)
    pub speed: f64,
    /// Step delay at speed 1.0
    pub base_delay_ms: u64,
    pub min_interval_secs: f64,
    pub max_interval_secs: f64,
    /// Blink delay range after a direct gaze update
    pub settle_min_secs: f64,
    pub settle_max_secs: f64,
    /// Extra time past the expected blink length before the watchdog fires
    pub watchdog_margin_ms: u64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            base_delay_ms: 600,
            min_interval_secs: 3.0,
            max_interval_secs: 8.0,
            settle_min_secs: 1.0,
            settle_max_secs: 3.0,
            watchdog_margin_ms: 1000,
        }
    }
}

impl BlinkConfig {
    /// Delay between two blink frames
    pub fn step_delay(&self) -> Duration {
        let speed = if self.speed.is_finite() && self.speed > 0.0 {
            self.speed
        } else {
            1.0
        };
        secs(self.base_delay_ms as f64 / 1000.0 / speed)
    }
}

/// Sleep and wake-glance timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    pub min_timeout_secs: f64,
    pub max_timeout_secs: f64,
    pub min_random_wakeup_secs: f64,
    pub max_random_wakeup_secs: f64,
    /// Hours asleep before the display is powered off (0 disables)
    pub display_off_hours: f64,
    /// Chance a wake glance is a look-around rather than a simple flash
    pub look_around_probability: f64,
    /// Chance a look-around chains straight into another one
    pub chain_probability: f64,
    /// Delay between the half-closed and closed frame when dozing off
    pub close_step_ms: u64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            min_timeout_secs: 10.0,
            max_timeout_secs: 12.0,
            min_random_wakeup_secs: 35.0,
            max_random_wakeup_secs: 65.0,
            display_off_hours: 2.0,
            look_around_probability: 0.9,
            chain_probability: 0.3,
            close_step_ms: 100,
        }
    }
}

/// Idle jitter tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    /// Chance (0-1) that an idle tick plays a jitter sequence
    pub nervousness: f64,
    /// Delay between activity and the first idle tick
    pub start_delay_secs: f64,
    /// Idle time after which the large-amplitude catalog is used
    pub large_start_delay_secs: f64,
    pub min_interval_secs: f64,
    pub max_interval_secs: f64,
    /// Per-step delay range
    pub min_speed_ms: u64,
    pub max_speed_ms: u64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            nervousness: 0.8,
            start_delay_secs: 0.5,
            large_start_delay_secs: 60.0,
            min_interval_secs: 3.0,
            max_interval_secs: 6.0,
            min_speed_ms: 500,
            max_speed_ms: 800,
        }
    }
}

/// Detection feed receiver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Run the tracking actor
    pub enabled: bool,
    /// Listen address for the detection feed UDP socket
    pub listen_address: String,
    /// UDP port the perception pipeline sends detections to
    pub port: u16,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_address: "127.0.0.1".to_string(),
            port: 65431,
        }
    }
}

/// Gaze token transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Host the animation process listens on
    pub host: String,
    /// UDP port for gaze tokens
    pub port: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 65432,
        }
    }
}

/// Live settings listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub enabled: bool,
    pub listen_address: String,
    pub port: u16,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_address: "127.0.0.1".to_string(),
            port: 12345,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Enable HTTP server
    pub enabled: bool,
    /// HTTP server host
    pub host: String,
    /// HTTP server port
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_enabled: true,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("gazer");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/gazer");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/gazer");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("gazer");
        }
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracker.frames_needed, 5);
        assert_eq!(config.encoder.num_divisions, 41);
        assert_eq!(config.animation.jump_threshold, 10);
        assert!(config.http.enabled);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [tracker]
            frames_needed = 3
            return_timeout_secs = 7.5

            [encoder]
            num_divisions = 21

            [animation.blink]
            speed = 2.0

            [animation.jitter]
            nervousness = 0.25
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.tracker.frames_needed, 3);
        assert_eq!(config.tracker.return_timeout_secs, 7.5);
        assert_eq!(config.encoder.num_divisions, 21);
        assert_eq!(config.animation.blink.speed, 2.0);
        assert_eq!(config.animation.jitter.nervousness, 0.25);
        // untouched sections keep their defaults
        assert_eq!(config.animation.sleep.min_timeout_secs, 10.0);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = Config::default();
        config.animation.sleep.min_timeout_secs = 20.0;
        config.animation.sleep.max_timeout_secs = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nervousness_out_of_range_rejected() {
        let mut config = Config::default();
        config.animation.jitter.nervousness = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();
        config.set_value("blink_speed", 8.0).unwrap();
        config.set_value("stable_y_thres", 4.0).unwrap();
        config.set_value("always_closest", 1.0).unwrap();
        config.set_value("min_jitter_speed", 250.0).unwrap();

        assert_eq!(config.animation.blink.speed, 8.0);
        assert_eq!(config.encoder.stable_y_window, 4);
        assert!(config.tracker.always_closest);
        assert_eq!(config.animation.jitter.min_speed_ms, 250);
    }

    #[test]
    fn test_set_unknown_value() {
        let mut config = Config::default();
        let err = config.set_value("stretch_x", 1.0).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSetting(_)));
    }

    #[test]
    fn test_set_negative_count_rejected() {
        let mut config = Config::default();
        assert!(config.set_value("num_divisions", -3.0).is_err());
    }

    #[test]
    fn test_blink_step_delay() {
        let blink = BlinkConfig::default();
        assert_eq!(blink.step_delay(), Duration::from_millis(120));
    }

    #[test]
    fn test_huge_durations_saturate() {
        assert_eq!(secs(1e30), Duration::MAX);
        assert_eq!(secs(f64::INFINITY), Duration::ZERO);
        assert_eq!(secs(-4.0), Duration::ZERO);

        let crawl = BlinkConfig {
            speed: 1e-300,
            ..BlinkConfig::default()
        };
        assert_eq!(crawl.step_delay(), Duration::MAX);
    }

    #[test]
    fn test_out_of_bounds_timers_rejected() {
        for (name, value) in [
            ("blink_speed", 1e-300),
            ("blink_speed", 0.001),
            ("min_sleep_timeout", 1e30),
            ("max_sleep_timeout", 1e30),
            ("display_off_timeout", 1e12),
            ("return_timeout", 1e30),
        ] {
            let mut config = Config::default();
            config.set_value(name, value).unwrap();
            assert!(config.validate().is_err(), "{} = {} accepted", name, value);
        }

        // A month-long display timeout is still fine
        let mut config = Config::default();
        config.set_value("display_off_timeout", 720.0).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_toml_round_trip_keeps_values() {
        let mut config = Config::default();
        config.animation.seed = Some(42);
        config.encoder.z_divider_curve = 1.5;
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gazer.toml");
        std::fs::write(&path, "[animation.jitter]\nnervousness = 0.3\n").unwrap();

        let mut config = Config::from_file(&path).unwrap();
        assert_eq!(config.animation.jitter.nervousness, 0.3);
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));

        config.set_value("blink_speed", 2.0).unwrap();
        assert_eq!(config.save().unwrap(), path);

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.animation.blink.speed, 2.0);
        assert_eq!(reloaded.animation.jitter.nervousness, 0.3);
    }
}
