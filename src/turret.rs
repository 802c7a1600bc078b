//! Pan/tilt coordinator.
//!
//! Angle state, the enabled flag and the servo driver live behind one
//! lock. Manual commands check the flag and drive the servo in the same
//! critical section, and every ramp step takes that same lock, so a key
//! press can never interleave with the startup ramp.

use std::thread;

use log::{debug, error, info};
use parking_lot::Mutex;

use crate::angle::{AngleState, Axis, Position};
use crate::config::MotionConfig;
use crate::error::Result;
use crate::input::Key;
use crate::ramp::{RampRequest, ramp};
use crate::servo::ServoDriver;

struct TurretState<S> {
    angles: AngleState,
    enabled: bool,
    enabling: bool,
    servo: S,
}

/// Owns the mount. Share it between threads with an `Arc`.
pub struct Turret<S: ServoDriver> {
    state: Mutex<TurretState<S>>,
    config: MotionConfig,
}

/// Servo handle used by ramps: clamps, commands, and records the angle
/// under the turret lock, one step at a time.
struct TrackedServo<'a, S> {
    state: &'a Mutex<TurretState<S>>,
}

impl<S: ServoDriver> ServoDriver for TrackedServo<'_, S> {
    fn set_angle(&mut self, axis: Axis, degrees: i32) -> Result<()> {
        let mut state = self.state.lock();
        let clamped = state.angles.bounds(axis).clamp(degrees);
        state.servo.set_angle(axis, clamped)?;
        state.angles.set(axis, clamped);
        Ok(())
    }
}

impl<S: ServoDriver> Turret<S> {
    pub fn new(servo: S, config: MotionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(TurretState {
                angles: AngleState::from_config(&config),
                enabled: false,
                enabling: false,
                servo,
            }),
            config,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn position(&self) -> Position {
        self.state.lock().angles.position()
    }

    /// One-shot startup: settle, ramp pan then tilt from 0 to the
    /// reference angles, then accept manual commands.
    ///
    /// Returns `Ok(false)` without touching the hardware when already
    /// enabled or when another thread is mid-sequence. On failure the
    /// servos stay disabled and a later call may try again.
    pub fn enable(&self) -> Result<bool> {
        {
            let mut state = self.state.lock();
            if state.enabled || state.enabling {
                return Ok(false);
            }
            state.enabling = true;
        }

        info!("Enabling servos after {:.1}s...", self.config.init_delay_secs);
        thread::sleep(self.config.init_delay());

        // Start from wherever the servo currently is (unknown), assume 0.
        // Sequential so both servos never draw peak current together.
        let result = self
            .ramp_axis(Axis::Pan, 0, self.config.reference_pan)
            .and_then(|()| self.ramp_axis(Axis::Tilt, 0, self.config.reference_tilt));

        let mut state = self.state.lock();
        state.enabling = false;
        match result {
            Ok(()) => {
                state.enabled = true;
                info!("Servos ready at {}", state.angles.position());
                Ok(true)
            }
            Err(e) => {
                error!("Servo enable failed, manual control stays locked: {e}");
                Err(e)
            }
        }
    }

    /// Apply one directional key. `Ok(None)` when the key is ignored or
    /// the servos are not enabled yet.
    pub fn handle_key(&self, key: Key) -> Result<Option<Position>> {
        let Some((axis, delta)) = self.delta_for(key) else {
            return Ok(None);
        };

        let mut state = self.state.lock();
        if !state.enabled {
            return Ok(None);
        }

        let mut next = state.angles.clone();
        next.nudge(axis, delta);
        let position = next.position();

        // Always re-assert both axes, recording each one the servo accepted
        state.servo.set_pan(position.pan)?;
        state.angles.set(Axis::Pan, position.pan);
        state.servo.set_tilt(position.tilt)?;
        state.angles.set(Axis::Tilt, position.tilt);

        debug!("{position}");
        Ok(Some(position))
    }

    /// Ramp an enabled axis from its current angle to `target` (clamped).
    pub fn move_to(&self, axis: Axis, target: i32) -> Result<Position> {
        let (start, target) = {
            let state = self.state.lock();
            if !state.enabled {
                return Ok(state.angles.position());
            }
            (state.angles.get(axis), state.angles.bounds(axis).clamp(target))
        };

        self.ramp_axis(axis, start, target)?;
        Ok(self.position())
    }

    fn ramp_axis(&self, axis: Axis, start: i32, target: i32) -> Result<()> {
        let request = RampRequest::new(
            axis,
            start,
            target,
            self.config.ramp_step,
            self.config.ramp_delay(),
        )?
        .with_retries(self.config.step_retries);

        let mut servo = TrackedServo { state: &self.state };
        ramp(&mut servo, &request)
    }

    fn delta_for(&self, key: Key) -> Option<(Axis, i32)> {
        match key {
            Key::Up => Some((Axis::Tilt, -self.config.tilt_sensitivity)),
            Key::Down => Some((Axis::Tilt, self.config.tilt_sensitivity)),
            Key::Left => Some((Axis::Pan, -self.config.pan_sensitivity)),
            Key::Right => Some((Axis::Pan, self.config.pan_sensitivity)),
            Key::Quit | Key::Other(_) => None,
        }
    }
}
