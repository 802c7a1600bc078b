// This file is only compiled during tests

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::camera::{Camera, Resolution};
use crate::error::{Error, Result};

#[derive(Default)]
struct CameraLog {
    captures: Vec<Resolution>,
    fail: bool,
    capture_time: Duration,
}

/// Writes a fake JPEG for every still. Clones share state.
#[derive(Clone, Default)]
pub struct MockCamera {
    log: Arc<Mutex<CameraLog>>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_captures(&self, fail: bool) {
        self.log.lock().fail = fail;
    }

    /// Make every capture take this long.
    pub fn set_capture_time(&self, time: Duration) {
        self.log.lock().capture_time = time;
    }

    pub fn captures(&self) -> Vec<Resolution> {
        self.log.lock().captures.clone()
    }
}

impl Camera for MockCamera {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn capture_still(&mut self, size: Resolution, path: &Path) -> Result<()> {
        let (fail, capture_time) = {
            let log = self.log.lock();
            (log.fail, log.capture_time)
        };
        thread::sleep(capture_time);

        if fail {
            return Err(Error::Camera("mock sensor timeout".into()));
        }
        fs::write(path, format!("JPEG {size}"))?;
        self.log.lock().captures.push(size);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}
