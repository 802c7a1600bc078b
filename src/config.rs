//! Configuration for SpyPi
//!
//! Hard-coded defaults below, optionally overridden by a TOML file that
//! only names the values it changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::angle::Bounds;
use crate::error::{Error, Result};

// ** CAMERA CONFIGURATION ** //
pub const PREVIEW_WIDTH: u32 = 320;
pub const PREVIEW_HEIGHT: u32 = 240;
pub const PREVIEW_FRAMERATE: u32 = 15;
pub const SNAPSHOT_WIDTH: u32 = 640;
pub const SNAPSHOT_HEIGHT: u32 = 480;
pub const JPEG_QUALITY: u8 = 70;
/// The mount hangs the camera upside down.
pub const PREVIEW_VFLIP: bool = true;

// ** SERVO CONFIGURATION ** //
/// Degrees moved per key press.
pub const PAN_SENSITIVITY: i32 = 3;
pub const TILT_SENSITIVITY: i32 = 3;
/// Range the Pan-Tilt HAT accepts (degrees).
pub const HAT_MIN_ANGLE: i32 = -90;
pub const HAT_MAX_ANGLE: i32 = 90;
pub const REFERENCE_PAN: i32 = 0;
/// Rest at tilt max so the camera never faces the ceiling stop.
pub const REFERENCE_TILT: i32 = HAT_MAX_ANGLE;
/// Power rail settle time before the first servo command (seconds).
pub const INIT_DELAY_SECS: f64 = 3.0;
/// Degrees per ramp step.
pub const RAMP_STEP: i32 = 2;
/// Seconds between ramp steps.
pub const RAMP_DELAY_SECS: f64 = 0.05;
/// Extra attempts for a failed ramp step.
pub const STEP_RETRIES: u32 = 2;

// ** INPUT CONFIGURATION ** //
pub const POLL_INTERVAL_MS: u64 = 15;

// ** TELEGRAM CONFIGURATION ** //
pub const SNAP_COMMAND: &str = "snap";
pub const POLL_TIMEOUT_SECS: u64 = 60;
pub const RETRY_BACKOFF_SECS: u64 = 10;
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub camera: CameraConfig,
    pub motion: MotionConfig,
    pub input: InputConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub preview_width: u32,
    pub preview_height: u32,
    pub framerate: u32,
    pub snapshot_width: u32,
    pub snapshot_height: u32,
    pub jpeg_quality: u8,
    pub vflip: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            preview_width: PREVIEW_WIDTH,
            preview_height: PREVIEW_HEIGHT,
            framerate: PREVIEW_FRAMERATE,
            snapshot_width: SNAPSHOT_WIDTH,
            snapshot_height: SNAPSHOT_HEIGHT,
            jpeg_quality: JPEG_QUALITY,
            vflip: PREVIEW_VFLIP,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotionConfig {
    pub pan_sensitivity: i32,
    pub tilt_sensitivity: i32,
    pub pan_min: i32,
    pub pan_max: i32,
    pub tilt_min: i32,
    pub tilt_max: i32,
    pub reference_pan: i32,
    pub reference_tilt: i32,
    pub init_delay_secs: f64,
    pub ramp_step: i32,
    pub ramp_delay_secs: f64,
    pub step_retries: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            pan_sensitivity: PAN_SENSITIVITY,
            tilt_sensitivity: TILT_SENSITIVITY,
            pan_min: HAT_MIN_ANGLE,
            pan_max: HAT_MAX_ANGLE,
            tilt_min: HAT_MIN_ANGLE,
            tilt_max: HAT_MAX_ANGLE,
            reference_pan: REFERENCE_PAN,
            reference_tilt: REFERENCE_TILT,
            init_delay_secs: INIT_DELAY_SECS,
            ramp_step: RAMP_STEP,
            ramp_delay_secs: RAMP_DELAY_SECS,
            step_retries: STEP_RETRIES,
        }
    }
}

impl MotionConfig {
    pub fn pan_bounds(&self) -> Bounds {
        Bounds::new(self.pan_min, self.pan_max)
    }

    pub fn tilt_bounds(&self) -> Bounds {
        Bounds::new(self.tilt_min, self.tilt_max)
    }

    /// Zero when the value would fail [`MotionConfig::validate`].
    pub fn init_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.init_delay_secs).unwrap_or_default()
    }

    /// Zero when the value would fail [`MotionConfig::validate`].
    pub fn ramp_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.ramp_delay_secs).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        let hat = Bounds::new(HAT_MIN_ANGLE, HAT_MAX_ANGLE);

        for (name, bounds, reference) in [
            ("pan", self.pan_bounds(), self.reference_pan),
            ("tilt", self.tilt_bounds(), self.reference_tilt),
        ] {
            if bounds.min >= bounds.max {
                return Err(invalid(format!(
                    "{name}_min ({}) must be below {name}_max ({})",
                    bounds.min, bounds.max
                )));
            }
            if !hat.contains(bounds.min) || !hat.contains(bounds.max) {
                return Err(invalid(format!(
                    "{name} bounds must lie within {HAT_MIN_ANGLE}..={HAT_MAX_ANGLE}"
                )));
            }
            if !bounds.contains(reference) {
                return Err(invalid(format!(
                    "reference_{name} ({reference}) is outside {}..={}",
                    bounds.min, bounds.max
                )));
            }
        }

        if self.pan_sensitivity <= 0 || self.tilt_sensitivity <= 0 {
            return Err(invalid("sensitivities must be positive".into()));
        }
        if self.ramp_step <= 0 {
            return Err(invalid(format!("ramp_step must be positive, got {}", self.ramp_step)));
        }
        for (name, secs) in [
            ("init_delay_secs", self.init_delay_secs),
            ("ramp_delay_secs", self.ramp_delay_secs),
        ] {
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(invalid(format!("{name} must be a non-negative duration, got {secs}")));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub poll_interval_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL_MS,
        }
    }
}

impl InputConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelegramConfig {
    /// Trigger word, matched case-insensitively.
    pub command: String,
    pub snapshot_dir: PathBuf,
    pub poll_timeout_secs: u64,
    pub retry_backoff_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            command: SNAP_COMMAND.to_string(),
            snapshot_dir: std::env::temp_dir(),
            poll_timeout_secs: POLL_TIMEOUT_SECS,
            retry_backoff_secs: RETRY_BACKOFF_SECS,
        }
    }
}

impl TelegramConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

/// Bot token and the one chat allowed to trigger snapshots.
#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: i64,
}

impl TelegramCredentials {
    /// Read credentials from the environment. `None` disables the bot.
    pub fn from_env() -> Option<Self> {
        Self::from_values(
            std::env::var(TOKEN_ENV).ok().as_deref(),
            std::env::var(CHAT_ID_ENV).ok().as_deref(),
        )
    }

    fn from_values(token: Option<&str>, chat_id: Option<&str>) -> Option<Self> {
        let token = token.map(str::trim).filter(|t| !t.is_empty())?;
        let chat_id = match chat_id?.trim().parse::<i64>() {
            Ok(id) => id,
            Err(e) => {
                log::warn!("{CHAT_ID_ENV} is not a valid chat id: {e}");
                return None;
            }
        };
        Some(Self {
            token: token.to_string(),
            chat_id,
        })
    }
}

impl Config {
    /// Load overrides from a TOML file on top of the defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.motion.validate()?;

        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(invalid(format!(
                "jpeg_quality must be 1..=100, got {}",
                self.camera.jpeg_quality
            )));
        }
        if self.telegram.command.trim().is_empty() {
            return Err(invalid("telegram command must not be empty".into()));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> Error {
    Error::InvalidConfig(msg)
}
