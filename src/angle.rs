use std::fmt;

use crate::config::MotionConfig;

/// The two rotational axes of the mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal rotation, servo 1 on the HAT.
    Pan,
    /// Vertical rotation, servo 2 on the HAT.
    Tilt,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Pan => write!(f, "pan"),
            Axis::Tilt => write!(f, "tilt"),
        }
    }
}

/// Inclusive angle limits for one axis (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: i32,
    pub max: i32,
}

impl Bounds {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, angle: i32) -> i32 {
        angle.clamp(self.min, self.max)
    }

    pub fn contains(&self, angle: i32) -> bool {
        (self.min..=self.max).contains(&angle)
    }
}

/// Commanded pan/tilt position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub pan: i32,
    pub tilt: i32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pan={}, Tilt={}", self.pan, self.tilt)
    }
}

/// Current commanded angles, always kept inside their bounds.
///
/// Starts at 0/0 because the physical position at power-on is unknown.
/// The only write paths are [`AngleState::set`] and [`AngleState::nudge`],
/// both of which clamp.
#[derive(Debug, Clone)]
pub struct AngleState {
    pan: i32,
    tilt: i32,
    pan_bounds: Bounds,
    tilt_bounds: Bounds,
}

impl AngleState {
    pub fn new(pan_bounds: Bounds, tilt_bounds: Bounds) -> Self {
        Self {
            pan: pan_bounds.clamp(0),
            tilt: tilt_bounds.clamp(0),
            pan_bounds,
            tilt_bounds,
        }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.pan_bounds(), config.tilt_bounds())
    }

    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Pan => self.pan,
            Axis::Tilt => self.tilt,
        }
    }

    pub fn bounds(&self, axis: Axis) -> Bounds {
        match axis {
            Axis::Pan => self.pan_bounds,
            Axis::Tilt => self.tilt_bounds,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            pan: self.pan,
            tilt: self.tilt,
        }
    }

    /// Set an absolute angle. Returns the clamped value actually stored.
    pub fn set(&mut self, axis: Axis, angle: i32) -> i32 {
        let clamped = self.bounds(axis).clamp(angle);
        match axis {
            Axis::Pan => self.pan = clamped,
            Axis::Tilt => self.tilt = clamped,
        }
        clamped
    }

    /// Move by a relative delta, pinned at the bounds.
    pub fn nudge(&mut self, axis: Axis, delta: i32) -> i32 {
        let target = self.get(axis).saturating_add(delta);
        self.set(axis, target)
    }
}
