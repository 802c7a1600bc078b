// This file is only compiled during tests

use std::sync::Arc;

use parking_lot::Mutex;

use crate::angle::Axis;
use crate::error::{Error, Result};
use crate::servo::ServoDriver;

#[derive(Default)]
struct Recorder {
    calls: Vec<(Axis, i32)>,
    attempts: usize,
    fail_next: usize,
    fail_always: bool,
    failing_axis: Option<Axis>,
}

/// Records every accepted command. Clones share the same log, so a test
/// can keep one handle while the other is moved into a `Turret`.
#[derive(Clone, Default)]
pub struct MockServo {
    recorder: Arc<Mutex<Recorder>>,
}

impl MockServo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted commands, in order.
    pub fn calls(&self) -> Vec<(Axis, i32)> {
        self.recorder.lock().calls.clone()
    }

    pub fn calls_for(&self, axis: Axis) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter(|(a, _)| *a == axis)
            .map(|(_, angle)| angle)
            .collect()
    }

    /// Every call including rejected ones.
    pub fn attempts(&self) -> usize {
        self.recorder.lock().attempts
    }

    /// Reject the next `count` commands.
    pub fn fail_next(&self, count: usize) {
        self.recorder.lock().fail_next = count;
    }

    pub fn fail_always(&self, fail: bool) {
        self.recorder.lock().fail_always = fail;
    }

    /// Reject every command to `axis` until cleared with `None`.
    pub fn fail_axis(&self, axis: Option<Axis>) {
        self.recorder.lock().failing_axis = axis;
    }
}

impl ServoDriver for MockServo {
    fn set_angle(&mut self, axis: Axis, degrees: i32) -> Result<()> {
        let mut recorder = self.recorder.lock();
        recorder.attempts += 1;

        if recorder.fail_always || recorder.failing_axis == Some(axis) {
            return Err(Error::InvalidParameter("mock servo fault".into()));
        }
        if recorder.fail_next > 0 {
            recorder.fail_next -= 1;
            return Err(Error::InvalidParameter("mock servo glitch".into()));
        }

        recorder.calls.push((axis, degrees));
        Ok(())
    }
}
