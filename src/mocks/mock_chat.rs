// This file is only compiled during tests

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::telegram::{ChatTransport, Message};

/// A photo as it looked when it was handed to the transport.
#[derive(Debug, Clone)]
pub struct SentPhoto {
    pub chat_id: i64,
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

#[derive(Default)]
struct ChatLog {
    script: VecDeque<Result<Vec<Message>>>,
    polls: usize,
    replies: Vec<(i64, String)>,
    photos: Vec<SentPhoto>,
    fail_photos: bool,
}

#[derive(Default)]
pub struct MockChat {
    log: Mutex<ChatLog>,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_messages(&self, messages: Vec<Message>) {
        self.log.lock().script.push_back(Ok(messages));
    }

    pub fn push_poll_error(&self, reason: &str) {
        self.log.lock().script.push_back(Err(Error::Telegram(reason.to_string())));
    }

    pub fn fail_photos(&self, fail: bool) {
        self.log.lock().fail_photos = fail;
    }

    pub fn polls(&self) -> usize {
        self.log.lock().polls
    }

    /// (message id replied to, text)
    pub fn replies(&self) -> Vec<(i64, String)> {
        self.log.lock().replies.clone()
    }

    pub fn photos(&self) -> Vec<SentPhoto> {
        self.log.lock().photos.clone()
    }
}

impl ChatTransport for MockChat {
    fn poll(&self) -> Result<Vec<Message>> {
        let mut log = self.log.lock();
        log.polls += 1;
        log.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn reply(&self, message: &Message, text: &str) -> Result<()> {
        self.log.lock().replies.push((message.message_id, text.to_string()));
        Ok(())
    }

    fn send_photo(&self, chat_id: i64, path: &Path) -> Result<()> {
        if self.log.lock().fail_photos {
            return Err(Error::Telegram("Bad Request: file is too big".into()));
        }
        let contents = fs::read(path)?;
        self.log.lock().photos.push(SentPhoto {
            chat_id,
            path: path.to_path_buf(),
            contents,
        });
        Ok(())
    }
}
