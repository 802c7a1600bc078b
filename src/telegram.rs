//! Telegram Bot API transport.
//!
//! Only what the snapshot feature needs: long-poll for text messages,
//! reply to one, and upload a photo.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, error, info};
use reqwest::blocking::{Client, multipart};
use serde::Deserialize;
use serde_json::json;

use crate::config::{TelegramConfig, TelegramCredentials};
use crate::error::{Error, Result};

const API_BASE: &str = "https://api.telegram.org";

/// Slack on top of the long-poll timeout before the HTTP client gives up.
const HTTP_GRACE_SECS: u64 = 15;

/// Inbound text message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub message_id: i64,
    /// Chat the message came from; identifies the sender.
    pub chat_id: i64,
    pub text: Option<String>,
}

/// A chat service the snapshot handler can talk through.
pub trait ChatTransport: Send + Sync {
    /// Block until new messages arrive or the poll times out.
    fn poll(&self) -> Result<Vec<Message>>;

    fn reply(&self, message: &Message, text: &str) -> Result<()>;

    fn send_photo(&self, chat_id: i64, path: &Path) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(Error::Telegram(
                self.description.unwrap_or_else(|| "request failed".to_string()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// Decode a `getUpdates` body into messages plus the offset that
/// acknowledges them.
fn parse_updates(body: &str) -> Result<(Vec<Message>, Option<i64>)> {
    let response: ApiResponse<Vec<Update>> = serde_json::from_str(body)?;
    let updates = response.into_result()?;

    let next_offset = updates.iter().map(|u| u.update_id + 1).max();
    let messages = updates
        .into_iter()
        .filter_map(|u| u.message)
        .map(|m| Message {
            message_id: m.message_id,
            chat_id: m.chat.id,
            text: m.text,
        })
        .collect();

    Ok((messages, next_offset))
}

fn check_response(body: &str) -> Result<()> {
    let response: ApiResponse<serde_json::Value> = serde_json::from_str(body)?;
    response.into_result().map(|_| ())
}

pub struct TelegramBot {
    client: Client,
    base_url: String,
    poll_timeout_secs: u64,
    offset: AtomicI64,
}

impl TelegramBot {
    pub fn new(credentials: &TelegramCredentials, config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + HTTP_GRACE_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{API_BASE}/bot{}", credentials.token),
            poll_timeout_secs: config.poll_timeout_secs,
            offset: AtomicI64::new(0),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

impl ChatTransport for TelegramBot {
    fn poll(&self) -> Result<Vec<Message>> {
        let offset = self.offset.load(Ordering::Relaxed);
        let body = self
            .client
            .get(self.url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout_secs.to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .send()?
            .text()?;

        let (messages, next_offset) = parse_updates(&body)?;
        if let Some(next) = next_offset {
            self.offset.fetch_max(next, Ordering::Relaxed);
        }
        Ok(messages)
    }

    fn reply(&self, message: &Message, text: &str) -> Result<()> {
        let body = self
            .client
            .post(self.url("sendMessage"))
            .json(&json!({
                "chat_id": message.chat_id,
                "text": text,
                "reply_to_message_id": message.message_id,
            }))
            .send()?
            .text()?;
        check_response(&body)
    }

    fn send_photo(&self, chat_id: i64, path: &Path) -> Result<()> {
        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .file("photo", path)?;

        let body = self
            .client
            .post(self.url("sendPhoto"))
            .multipart(form)
            .send()?
            .text()?;
        check_response(&body)
    }
}

/// Poll forever, handing every message to `on_message`. Transport errors
/// are logged and retried after `backoff`. Returns once `running` clears.
pub fn run_polling<T, F>(transport: &T, running: &AtomicBool, backoff: Duration, mut on_message: F)
where
    T: ChatTransport + ?Sized,
    F: FnMut(&Message),
{
    info!("Telegram polling started");

    while running.load(Ordering::Relaxed) {
        match transport.poll() {
            Ok(messages) => {
                for message in &messages {
                    debug!(
                        "[Telegram] message {} from chat {}",
                        message.message_id, message.chat_id
                    );
                    on_message(message);
                }
            }
            Err(e) => {
                error!("[Telegram] Polling error: {e}");
                thread::sleep(backoff);
            }
        }
    }

    info!("Telegram polling stopped");
}
