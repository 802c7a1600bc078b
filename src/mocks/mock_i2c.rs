// This file is only compiled during tests

use std::cell::RefCell;

use rppal::i2c::{Error, Result};

/// One write that reached the mock bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Byte(u8, u8),
    Word(u8, u16),
}

#[derive(Default)]
struct MockBus {
    address: Option<u16>,
    writes: Vec<Write>,
    fail: bool,
}

thread_local! {
    static MOCK_BUS: RefCell<MockBus> = RefCell::new(MockBus::default());
}

pub struct I2c;

impl I2c {
    pub fn new() -> Result<Self> {
        Ok(I2c)
    }

    pub fn set_slave_address(&mut self, address: u16) -> Result<()> {
        MOCK_BUS.with(|bus| bus.borrow_mut().address = Some(address));
        Ok(())
    }

    pub fn smbus_write_byte(&mut self, command: u8, value: u8) -> Result<()> {
        record(Write::Byte(command, value))
    }

    pub fn smbus_write_word(&mut self, command: u8, value: u16) -> Result<()> {
        record(Write::Word(command, value))
    }
}

fn record(write: Write) -> Result<()> {
    MOCK_BUS.with(|bus| {
        let mut bus = bus.borrow_mut();
        if bus.fail {
            return Err(Error::Io(std::io::Error::other("mock bus fault")));
        }
        bus.writes.push(write);
        Ok(())
    })
}

// test helper to inspect what was written
pub fn writes() -> Vec<Write> {
    MOCK_BUS.with(|bus| bus.borrow().writes.clone())
}

pub fn slave_address() -> Option<u16> {
    MOCK_BUS.with(|bus| bus.borrow().address)
}

// test helper to make every following write fail
pub fn fail_writes(fail: bool) {
    MOCK_BUS.with(|bus| bus.borrow_mut().fail = fail);
}

// test helper to reset the bus
pub fn reset_mock_bus() {
    MOCK_BUS.with(|bus| *bus.borrow_mut() = MockBus::default());
}
