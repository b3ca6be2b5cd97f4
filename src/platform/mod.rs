pub mod telegram;

use anyhow::{Context, Result};
use serde::Deserialize;

/// A chat message received through the webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Chat to reply to, if the payload carried one
    pub chat_id: Option<i64>,
    /// Message text, empty when absent
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<UpdateMessage>,
}

#[derive(Debug, Deserialize)]
struct UpdateMessage {
    #[serde(default)]
    chat: Option<UpdateChat>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateChat {
    #[serde(default)]
    id: Option<i64>,
}

impl InboundMessage {
    /// Extract chat id and text from a raw webhook body.
    ///
    /// Missing fields become `None`/empty. A body that is not JSON, or whose
    /// fields have the wrong shape, is an error.
    pub fn from_payload(body: &[u8]) -> Result<Self> {
        let update: Update =
            serde_json::from_slice(body).context("Invalid webhook payload")?;
        let message = update.message;

        let chat_id = message
            .as_ref()
            .and_then(|m| m.chat.as_ref())
            .and_then(|c| c.id);
        let text = message.and_then(|m| m.text).unwrap_or_default();

        Ok(Self { chat_id, text })
    }

    /// Text as the command parser expects it: lowercased and trimmed.
    pub fn normalized_text(&self) -> String {
        self.text.to_lowercase().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_payload() {
        let msg = InboundMessage::from_payload(
            br#"{"update_id": 1, "message": {"chat": {"id": -200123}, "text": "  Create Repo Demo "}}"#,
        )
        .unwrap();
        assert_eq!(msg.chat_id, Some(-200123));
        assert_eq!(msg.normalized_text(), "create repo demo");
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let msg = InboundMessage::from_payload(br#"{}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage {
                chat_id: None,
                text: String::new()
            }
        );

        let msg = InboundMessage::from_payload(br#"{"message": {"text": "hi"}}"#).unwrap();
        assert_eq!(msg.chat_id, None);
        assert_eq!(msg.text, "hi");
    }

    #[test]
    fn test_malformed_payloads_are_errors() {
        assert!(InboundMessage::from_payload(b"not json").is_err());
        assert!(InboundMessage::from_payload(b"[1, 2]").is_err());
        assert!(InboundMessage::from_payload(br#"{"message": "hi"}"#).is_err());
        assert!(InboundMessage::from_payload(br#"{"message": {"text": 42}}"#).is_err());
    }
}
