use std::fmt;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use log::{debug, info, warn};

use crate::config::CameraConfig;
use crate::error::{Error, Result};

/// libcamera apps shipped with Raspberry Pi OS.
const PREVIEW_APP: &str = "rpicam-vid";
const STILL_APP: &str = "rpicam-still";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The camera as the rest of the system sees it: a live preview that
/// can be paused for a full-resolution still.
pub trait Camera: Send {
    fn start(&mut self) -> Result<()>;

    /// Switch to still mode, write a JPEG to `path`, then go back to the
    /// preview if it was running. Blocks until the file is written.
    fn capture_still(&mut self, size: Resolution, path: &Path) -> Result<()>;

    fn stop(&mut self) -> Result<()>;
}

/// Camera driven through the `rpicam-vid` / `rpicam-still` apps.
///
/// The preview runs in `rpicam-vid`'s own window, which is also the
/// operator's display.
pub struct RpiCamera {
    config: CameraConfig,
    preview_app: String,
    still_app: String,
    preview: Option<Child>,
}

impl RpiCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self::with_apps(config, PREVIEW_APP, STILL_APP)
    }

    /// Use different binaries, e.g. the older `libcamera-*` names.
    pub fn with_apps(config: CameraConfig, preview_app: &str, still_app: &str) -> Self {
        Self {
            config,
            preview_app: preview_app.to_string(),
            still_app: still_app.to_string(),
            preview: None,
        }
    }

    pub fn snapshot_size(&self) -> Resolution {
        Resolution::new(self.config.snapshot_width, self.config.snapshot_height)
    }

    pub fn is_previewing(&self) -> bool {
        self.preview.is_some()
    }

    fn preview_args(&self) -> Vec<String> {
        let mut args = vec![
            "-t".to_string(),
            "0".to_string(),
            "--width".to_string(),
            self.config.preview_width.to_string(),
            "--height".to_string(),
            self.config.preview_height.to_string(),
            "--framerate".to_string(),
            self.config.framerate.to_string(),
        ];
        if self.config.vflip {
            args.push("--vflip".to_string());
        }
        args
    }

    fn still_args(&self, size: Resolution, path: &Path) -> Vec<String> {
        let mut args = vec![
            "--nopreview".to_string(),
            "--immediate".to_string(),
            "--width".to_string(),
            size.width.to_string(),
            "--height".to_string(),
            size.height.to_string(),
            "-q".to_string(),
            self.config.jpeg_quality.to_string(),
        ];
        if self.config.vflip {
            args.push("--vflip".to_string());
        }
        args.push("-o".to_string());
        args.push(path.display().to_string());
        args
    }

    fn run_still(&self, size: Resolution, path: &Path) -> Result<()> {
        let output = Command::new(&self.still_app)
            .args(self.still_args(size, path))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Camera(format!("failed to launch {}: {e}", self.still_app)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().last().unwrap_or("no output").trim().to_string();
            return Err(Error::Camera(format!(
                "{} exited with {}: {reason}",
                self.still_app, output.status
            )));
        }
        Ok(())
    }
}

impl Camera for RpiCamera {
    fn start(&mut self) -> Result<()> {
        if self.preview.is_some() {
            return Ok(());
        }

        let child = Command::new(&self.preview_app)
            .args(self.preview_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Camera(format!("failed to launch {}: {e}", self.preview_app)))?;

        info!(
            "Preview started at {}x{} @ {}fps",
            self.config.preview_width, self.config.preview_height, self.config.framerate
        );
        self.preview = Some(child);
        Ok(())
    }

    fn capture_still(&mut self, size: Resolution, path: &Path) -> Result<()> {
        let resume = self.preview.is_some();
        self.stop()?;

        debug!("Capturing {size} still to {}", path.display());
        let result = self.run_still(size, path);

        if resume {
            self.start()?;
        }
        result
    }

    fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.preview.take() else {
            return Ok(());
        };

        if let Err(e) = child.kill() {
            debug!("preview already gone: {e}");
        }
        child.wait()?;
        debug!("Preview stopped");
        Ok(())
    }
}

impl Drop for RpiCamera {
    fn drop(&mut self) {
        // Never leave the preview window or the camera claimed
        if let Err(e) = self.stop() {
            warn!("Failed to stop preview: {e}");
        }
    }
}
