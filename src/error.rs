//! Error types for SpyPi

use crate::angle::Axis;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SpyPi error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I2C bus error talking to the servo HAT
    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config parsed but holds values the hardware can't accept
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Telegram API answered with `ok: false`
    #[error("Telegram error: {0}")]
    Telegram(String),

    /// JSON decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Shutdown signal handler could not be installed
    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Camera app failed or could not be launched
    #[error("Camera error: {0}")]
    Camera(String),

    /// A ramp gave up after exhausting its retries
    #[error("Ramp on {axis} aborted at {angle}°: {source}")]
    RampAborted {
        /// Axis being ramped
        axis: Axis,
        /// Angle whose command failed
        angle: i32,
        /// Last hardware error
        #[source]
        source: Box<Error>,
    },
}
