use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

/// Keyboard commands understood by the main loop.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Key {
    /// `w`: tilt toward the minimum.
    Up,
    /// `s`: tilt toward the maximum.
    Down,
    /// `a`: pan toward the minimum.
    Left,
    /// `d`: pan toward the maximum.
    Right,
    /// `q`: leave the main loop.
    Quit,
    Other(char),
}

impl Key {
    pub fn from_char(c: char) -> Self {
        match c {
            'w' => Key::Up,
            's' => Key::Down,
            'a' => Key::Left,
            'd' => Key::Right,
            'q' => Key::Quit,
            other => Key::Other(other),
        }
    }
}

/// Source of key presses for the main loop.
pub trait KeyInput {
    /// Wait up to `timeout` for a key. Keys that arrived within the same
    /// interval coalesce to the last one.
    fn poll_key(&mut self, timeout: Duration) -> Option<Key>;
}

/// Keys fed through a channel. Any thread holding the sender can type.
pub struct ChannelKeys {
    rx: Receiver<char>,
}

impl ChannelKeys {
    pub fn new() -> (Sender<char>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl KeyInput for ChannelKeys {
    fn poll_key(&mut self, timeout: Duration) -> Option<Key> {
        let mut last = match self.rx.recv_timeout(timeout) {
            Ok(c) => c,
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => {
                // No more input ever; keep the caller's cadence instead of spinning
                thread::sleep(timeout);
                return None;
            }
        };
        while let Ok(c) = self.rx.try_recv() {
            last = c;
        }
        Some(Key::from_char(last))
    }
}

/// Reads the terminal on a background thread.
///
/// The terminal stays in line mode, so keys are delivered once the
/// operator hits Enter. Whitespace is dropped.
pub struct StdinKeys {
    keys: ChannelKeys,
}

impl StdinKeys {
    pub fn spawn() -> io::Result<Self> {
        let (tx, keys) = ChannelKeys::new();

        thread::Builder::new()
            .name("stdin-keys".to_string())
            .spawn(move || forward_keys(io::stdin().lock(), &tx))?;

        Ok(Self { keys })
    }
}

/// Send every non-whitespace byte from `reader` as typed, until the
/// reader ends or the receiving side hangs up.
fn forward_keys<R: Read>(reader: R, tx: &Sender<char>) {
    for byte in reader.bytes() {
        match byte {
            Ok(b) if b.is_ascii_whitespace() => continue,
            Ok(b) => {
                if tx.send(char::from(b)).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("stdin read failed: {e}");
                break;
            }
        }
    }
    debug!("stdin closed");
}

impl KeyInput for StdinKeys {
    fn poll_key(&mut self, timeout: Duration) -> Option<Key> {
        self.keys.poll_key(timeout)
    }
}
