//! Stepped transitions between two angles.
//!
//! A ramp walks an axis from `start` toward `target` in fixed increments,
//! pausing between steps, and always finishes with one command at the
//! exact target so ranges that aren't a multiple of the step still land.

use std::thread;
use std::time::Duration;

use log::{trace, warn};

use crate::angle::Axis;
use crate::error::{Error, Result};
use crate::servo::ServoDriver;

/// One ramp of one axis. Built per use, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RampRequest {
    pub axis: Axis,
    pub start: i32,
    pub target: i32,
    pub step_size: i32,
    pub delay: Duration,
    /// Extra attempts per hardware command before giving up.
    pub retries: u32,
}

impl RampRequest {
    pub fn new(
        axis: Axis,
        start: i32,
        target: i32,
        step_size: i32,
        delay: Duration,
    ) -> Result<Self> {
        if step_size <= 0 {
            return Err(Error::InvalidParameter(format!(
                "ramp step must be positive, got {step_size}"
            )));
        }
        Ok(Self {
            axis,
            start,
            target,
            step_size,
            delay,
            retries: 0,
        })
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Intermediate angles, lazily.
    pub fn steps(&self) -> RampSteps {
        let direction = if self.target > self.start {
            self.step_size
        } else {
            -self.step_size
        };
        RampSteps {
            next: Some(self.start),
            target: self.target,
            direction,
        }
    }
}

/// `start, start + d, start + 2d, …` up to but not including `target`.
///
/// Yields nothing when `start == target`.
#[derive(Debug, Clone)]
pub struct RampSteps {
    next: Option<i32>,
    target: i32,
    direction: i32,
}

impl Iterator for RampSteps {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        let angle = self.next?;
        let reached = if self.direction > 0 {
            angle >= self.target
        } else {
            angle <= self.target
        };
        if reached {
            self.next = None;
            return None;
        }
        self.next = angle.checked_add(self.direction);
        Some(angle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next {
            Some(angle)
                if (self.direction > 0 && angle < self.target)
                    || (self.direction < 0 && angle > self.target) =>
            {
                angle.abs_diff(self.target).div_ceil(self.direction.unsigned_abs())
            }
            _ => 0,
        };
        (remaining as usize, Some(remaining as usize))
    }
}

impl ExactSizeIterator for RampSteps {}

fn command<S: ServoDriver + ?Sized>(
    servo: &mut S,
    axis: Axis,
    angle: i32,
    retries: u32,
) -> Result<()> {
    let mut attempt = 0;
    loop {
        match servo.set_angle(axis, angle) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!("{axis} command to {angle}° failed ({e}), retry {attempt}/{retries}");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run a ramp to completion, sleeping `delay` after each intermediate step.
///
/// If a step keeps failing after its retries, one direct command to the
/// target is attempted before returning [`Error::RampAborted`].
pub fn ramp<S: ServoDriver + ?Sized>(servo: &mut S, request: &RampRequest) -> Result<()> {
    let axis = request.axis;

    for angle in request.steps() {
        if let Err(e) = command(servo, axis, angle, request.retries) {
            if let Err(fallback) = servo.set_angle(axis, request.target) {
                warn!("{axis} fallback to {}° failed: {fallback}", request.target);
            }
            return Err(Error::RampAborted {
                axis,
                angle,
                source: Box::new(e),
            });
        }
        trace!("{axis} ramp step {angle}°");

        if !request.delay.is_zero() {
            thread::sleep(request.delay);
        }
    }

    // Final exact position
    command(servo, axis, request.target, request.retries).map_err(|e| Error::RampAborted {
        axis,
        angle: request.target,
        source: Box::new(e),
    })
}
