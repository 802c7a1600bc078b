use log::debug;

// Use rppal in production
#[cfg(not(test))]
use rppal::i2c::I2c;

// Mock I2C for testing
#[cfg(test)]
use crate::mocks::mock_i2c::I2c;

use crate::angle::Axis;
use crate::config::{HAT_MAX_ANGLE, HAT_MIN_ANGLE};
use crate::error::{Error, Result};

/// Pimoroni Pan-Tilt HAT microcontroller address.
const PANTILT_ADDR: u16 = 0x15;

/// HAT register addresses
const REG_CONFIG: u8 = 0x00;
const REG_SERVO1: u8 = 0x01;
const REG_SERVO2: u8 = 0x03;

/// Config register bits
const CONFIG_SERVO1_ENABLE: u8 = 0b0000_0001;
const CONFIG_SERVO2_ENABLE: u8 = 0b0000_0010;

/// Pulse width range the HAT's servos are calibrated for (microseconds)
/// -90° → 575μs, +90° → 2325μs
const SERVO_MIN_PULSE_US: u32 = 575;
const SERVO_MAX_PULSE_US: u32 = 2325;

/// Anything that can put a mount axis at an absolute angle.
///
/// Commands are fire-and-forget: there is no position feedback.
pub trait ServoDriver: Send {
    fn set_angle(&mut self, axis: Axis, degrees: i32) -> Result<()>;

    fn set_pan(&mut self, degrees: i32) -> Result<()> {
        self.set_angle(Axis::Pan, degrees)
    }

    fn set_tilt(&mut self, degrees: i32) -> Result<()> {
        self.set_angle(Axis::Tilt, degrees)
    }
}

/// Map an angle to the servo pulse width the HAT expects.
/// Callers must pass an angle inside the HAT range.
fn degrees_to_us(degrees: i32) -> u16 {
    let range = SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US;
    let offset = (degrees - HAT_MIN_ANGLE).unsigned_abs();
    (SERVO_MIN_PULSE_US + range * offset / 180) as u16
}

/// Pan-Tilt HAT driven over I2C.
///
/// Both servo outputs are energised on construction and switched off
/// again when the driver is dropped.
pub struct PanTiltHat {
    i2c: I2c,
}

impl PanTiltHat {
    pub fn new() -> Result<Self> {
        let mut i2c = I2c::new()?;
        i2c.set_slave_address(PANTILT_ADDR)?;
        i2c.smbus_write_byte(REG_CONFIG, CONFIG_SERVO1_ENABLE | CONFIG_SERVO2_ENABLE)?;

        Ok(Self { i2c })
    }

    /// De-energise both servos.
    pub fn disable(&mut self) -> Result<()> {
        self.i2c.smbus_write_byte(REG_CONFIG, 0)?;
        Ok(())
    }
}

impl ServoDriver for PanTiltHat {
    fn set_angle(&mut self, axis: Axis, degrees: i32) -> Result<()> {
        if !(HAT_MIN_ANGLE..=HAT_MAX_ANGLE).contains(&degrees) {
            return Err(Error::InvalidParameter(format!(
                "{axis} angle {degrees} outside {HAT_MIN_ANGLE}..={HAT_MAX_ANGLE}"
            )));
        }

        let register = match axis {
            Axis::Pan => REG_SERVO1,
            Axis::Tilt => REG_SERVO2,
        };
        let pulse_us = degrees_to_us(degrees);
        debug!("{axis} -> {degrees}° ({pulse_us}μs)");

        self.i2c.smbus_write_word(register, pulse_us)?;
        Ok(())
    }
}

impl Drop for PanTiltHat {
    fn drop(&mut self) {
        // Ensure servos are released when dropped
        let _ = self.disable();
    }
}
