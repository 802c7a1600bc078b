//! Chat-triggered still capture.
//!
//! Each trigger gets its own worker thread and its own file, and every
//! failure on that thread ends in a reply to the requester rather than
//! reaching the rest of the process.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use chrono::Local;
use log::{error, info, warn};
use parking_lot::Mutex;

use crate::camera::{Camera, Resolution};
use crate::config::TelegramConfig;
use crate::error::Result;
use crate::telegram::{ChatTransport, Message};

const ACK_TEXT: &str = "Capturing image...";

/// Disambiguates captures that land in the same millisecond.
static CAPTURE_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct SnapshotHandler<C, T> {
    camera: Arc<Mutex<C>>,
    chat: Arc<T>,
    authorized_chat: i64,
    command: String,
    size: Resolution,
    dir: PathBuf,
}

impl<C, T> SnapshotHandler<C, T>
where
    C: Camera + 'static,
    T: ChatTransport + 'static,
{
    pub fn new(
        camera: Arc<Mutex<C>>,
        chat: Arc<T>,
        authorized_chat: i64,
        size: Resolution,
        config: &TelegramConfig,
    ) -> Self {
        Self {
            camera,
            chat,
            authorized_chat,
            command: config.command.trim().to_lowercase(),
            size,
            dir: config.snapshot_dir.clone(),
        }
    }

    /// The trigger word from the authorized chat, nothing else.
    pub fn is_trigger(&self, message: &Message) -> bool {
        message.chat_id == self.authorized_chat
            && message
                .text
                .as_deref()
                .is_some_and(|text| text.trim().to_lowercase() == self.command)
    }

    /// Acknowledge a trigger and start the capture on its own thread.
    /// Anything that isn't a trigger is ignored without a reply.
    pub fn handle(&self, message: &Message) -> Option<JoinHandle<()>> {
        if !self.is_trigger(message) {
            return None;
        }

        info!("[Telegram] Received: {}", self.command);
        if let Err(e) = self.chat.reply(message, ACK_TEXT) {
            warn!("[Telegram] Acknowledgement failed: {e}");
        }

        let path = self.next_path();
        let camera = Arc::clone(&self.camera);
        let chat = Arc::clone(&self.chat);
        let request = message.clone();
        let size = self.size;

        let spawned = thread::Builder::new()
            .name("snapshot".to_string())
            .spawn(move || capture_and_send(&camera, chat.as_ref(), &request, size, &path));

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("[Telegram] Could not start capture: {e}");
                report_failure(self.chat.as_ref(), message, &e);
                None
            }
        }
    }

    fn next_path(&self) -> PathBuf {
        let seq = CAPTURE_SEQ.fetch_add(1, Ordering::Relaxed);
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
        self.dir.join(format!("capture_{stamp}_{seq}.jpg"))
    }
}

fn capture_and_send<C: Camera, T: ChatTransport + ?Sized>(
    camera: &Mutex<C>,
    chat: &T,
    request: &Message,
    size: Resolution,
    path: &Path,
) {
    let result = deliver(camera, chat, request.chat_id, size, path);

    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("[Telegram] Could not remove {}: {e}", path.display());
        }
    }

    match result {
        Ok(()) => info!("[Telegram] Sent photo: {}", path.display()),
        Err(e) => {
            error!("[Telegram] Capture failed: {e}");
            report_failure(chat, request, &e);
        }
    }
}

fn deliver<C: Camera, T: ChatTransport + ?Sized>(
    camera: &Mutex<C>,
    chat: &T,
    chat_id: i64,
    size: Resolution,
    path: &Path,
) -> Result<()> {
    camera.lock().capture_still(size, path)?;
    chat.send_photo(chat_id, path)
}

fn report_failure<T: ChatTransport + ?Sized>(
    chat: &T,
    request: &Message,
    reason: &dyn std::fmt::Display,
) {
    if let Err(e) = chat.reply(request, &format!("Capture failed: {reason}")) {
        warn!("[Telegram] Failure reply not delivered: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::mock_camera::MockCamera;
    use crate::mocks::mock_chat::MockChat;
    use std::error::Error;
    use std::result::Result;
    use std::time::Duration;

    const OWNER: i64 = 1234;

    struct Fixture {
        camera: MockCamera,
        chat: Arc<MockChat>,
        handler: SnapshotHandler<MockCamera, MockChat>,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Result<Fixture, Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let camera = MockCamera::new();
        let chat = Arc::new(MockChat::new());
        let config = TelegramConfig {
            snapshot_dir: dir.path().to_path_buf(),
            ..TelegramConfig::default()
        };
        let handler = SnapshotHandler::new(
            Arc::new(Mutex::new(camera.clone())),
            Arc::clone(&chat),
            OWNER,
            Resolution::new(640, 480),
            &config,
        );
        Ok(Fixture {
            camera,
            chat,
            handler,
            dir,
        })
    }

    fn message(id: i64, chat_id: i64, text: &str) -> Message {
        Message {
            message_id: id,
            chat_id,
            text: Some(text.to_string()),
        }
    }

    fn leftover_files(dir: &tempfile::TempDir) -> usize {
        fs::read_dir(dir.path()).map(|entries| entries.count()).unwrap_or(0)
    }

    #[test]
    fn test_unauthorized_sender_ignored() -> Result<(), Box<dyn Error>> {
        let f = fixture()?;

        assert!(f.handler.handle(&message(1, 999, "snap")).is_none());

        assert!(f.chat.replies().is_empty());
        assert!(f.camera.captures().is_empty());
        Ok(())
    }

    #[test]
    fn test_other_text_ignored() -> Result<(), Box<dyn Error>> {
        let f = fixture()?;

        assert!(f.handler.handle(&message(1, OWNER, "snapshot")).is_none());
        assert!(f.handler.handle(&message(2, OWNER, "hello")).is_none());
        let no_text = Message {
            message_id: 3,
            chat_id: OWNER,
            text: None,
        };
        assert!(f.handler.handle(&no_text).is_none());

        assert!(f.chat.replies().is_empty());
        Ok(())
    }

    #[test]
    fn test_snap_sends_photo() -> Result<(), Box<dyn Error>> {
        let f = fixture()?;

        let worker = f.handler.handle(&message(7, OWNER, "SNAP")).ok_or("not triggered")?;
        worker.join().map_err(|_| "worker panicked")?;

        assert_eq!(f.chat.replies(), vec![(7, ACK_TEXT.to_string())]);
        let photos = f.chat.photos();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].chat_id, OWNER);
        assert_eq!(photos[0].contents, b"JPEG 640x480");
        assert_eq!(f.camera.captures(), vec![Resolution::new(640, 480)]);

        // Temporary file is gone
        assert!(!photos[0].path.exists());
        assert_eq!(leftover_files(&f.dir), 0);
        Ok(())
    }

    #[test]
    fn test_rapid_triggers_use_distinct_files() -> Result<(), Box<dyn Error>> {
        let f = fixture()?;
        f.camera.set_capture_time(Duration::from_millis(30));

        let first = f.handler.handle(&message(1, OWNER, "snap")).ok_or("not triggered")?;
        let second = f.handler.handle(&message(2, OWNER, "snap")).ok_or("not triggered")?;
        first.join().map_err(|_| "worker panicked")?;
        second.join().map_err(|_| "worker panicked")?;

        let photos = f.chat.photos();
        assert_eq!(photos.len(), 2);
        assert_ne!(photos[0].path, photos[1].path);
        assert_eq!(f.chat.replies().len(), 2);
        assert_eq!(leftover_files(&f.dir), 0);
        Ok(())
    }

    #[test]
    fn test_capture_failure_reported() -> Result<(), Box<dyn Error>> {
        let f = fixture()?;
        f.camera.fail_captures(true);

        let worker = f.handler.handle(&message(3, OWNER, "snap")).ok_or("not triggered")?;
        worker.join().map_err(|_| "worker panicked")?;

        let replies = f.chat.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].0, 3);
        assert!(replies[1].1.starts_with("Capture failed: "));
        assert!(replies[1].1.contains("mock sensor timeout"));
        assert!(f.chat.photos().is_empty());
        Ok(())
    }

    #[test]
    fn test_send_failure_reported_and_file_removed() -> Result<(), Box<dyn Error>> {
        let f = fixture()?;
        f.chat.fail_photos(true);

        let worker = f.handler.handle(&message(4, OWNER, "snap")).ok_or("not triggered")?;
        worker.join().map_err(|_| "worker panicked")?;

        let replies = f.chat.replies();
        assert!(replies[1].1.contains("file is too big"));
        assert_eq!(f.camera.captures().len(), 1);
        assert_eq!(leftover_files(&f.dir), 0);
        Ok(())
    }

    #[test]
    fn test_failure_leaves_next_request_working() -> Result<(), Box<dyn Error>> {
        let f = fixture()?;

        f.camera.fail_captures(true);
        let worker = f.handler.handle(&message(1, OWNER, "snap")).ok_or("not triggered")?;
        worker.join().map_err(|_| "worker panicked")?;

        f.camera.fail_captures(false);
        let worker = f.handler.handle(&message(2, OWNER, "snap")).ok_or("not triggered")?;
        worker.join().map_err(|_| "worker panicked")?;

        assert_eq!(f.chat.photos().len(), 1);
        Ok(())
    }
}
