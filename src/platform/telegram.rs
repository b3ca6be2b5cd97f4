use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::debug;

use crate::config::TelegramConfig;
use crate::services::Messenger;

/// Telegram rejects messages over 4096 chars; leave some headroom.
const MAX_MESSAGE_LEN: usize = 4000;

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Delivers replies through the Telegram Bot API.
pub struct TelegramRelay {
    bot: Option<Bot>,
}

impl TelegramRelay {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let bot = match config.bot_token.as_deref() {
            Some(token) => {
                let api_url = reqwest::Url::parse(&config.api_url)
                    .with_context(|| format!("Invalid Telegram API URL: {}", config.api_url))?;
                Some(Bot::new(token).set_api_url(api_url))
            }
            None => None,
        };
        Ok(Self { bot })
    }
}

#[async_trait]
impl Messenger for TelegramRelay {
    async fn send(&self, chat_id: Option<i64>, text: &str) -> Result<()> {
        let bot = self
            .bot
            .as_ref()
            .context("Telegram bot token is not configured")?;
        let chat_id = chat_id.context("Inbound message has no chat id")?;

        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            bot.send_message(ChatId(chat_id), chunk)
                .await
                .with_context(|| format!("Failed to send message to chat {}", chat_id))?;
        }
        debug!("Reply delivered to chat {}", chat_id);
        Ok(())
    }
}
