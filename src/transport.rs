//! Chat transport seam
//!
//! Platform-neutral event types and the outbound interface the handlers use.
//! The Telegram adapter converts teloxide updates into these types and
//! implements `ChatTransport` for `teloxide::Bot`.

use async_trait::async_trait;
use std::fmt;

/// Error types for transport operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rejected by API: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl TransportError {
    /// Errors the bot ignores: the message is gone, the bot lacks rights,
    /// or the API refused the request outright.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Self::MessageNotFound(_) | Self::Forbidden(_) | Self::Rejected(_)
        )
    }
}

/// A chat member as seen on an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

impl Participant {
    pub fn new(id: i64, username: Option<&str>, first_name: &str) -> Self {
        Self {
            id,
            username: username.map(|s| s.to_string()),
            first_name: first_name.to_string(),
        }
    }

    /// Lowercased username, empty if none
    pub fn username_lower(&self) -> String {
        self.username.as_deref().unwrap_or("").to_lowercase()
    }

    pub fn has_username(&self, username: &str) -> bool {
        !username.is_empty() && self.username_lower() == username.to_lowercase()
    }

    /// `@username`, else first name, else numeric id
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(u) if !u.is_empty() => format!("@{}", u),
            _ if !self.first_name.is_empty() => self.first_name.clone(),
            _ => self.id.to_string(),
        }
    }
}

/// Inbound chat message
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub sender: Option<Participant>,
    pub text: Option<String>,
    /// Author of the message this one replies to
    pub reply_to: Option<Participant>,
    /// Users referenced through structured mention entities
    pub mentions: Vec<Participant>,
}

impl IncomingMessage {
    /// Plain text message from a sender, no reply, no mentions
    pub fn text(chat_id: i64, message_id: i32, sender: Participant, text: &str) -> Self {
        Self {
            chat_id,
            message_id,
            sender: Some(sender),
            text: Some(text.to_string()),
            reply_to: None,
            mentions: Vec::new(),
        }
    }

    pub fn with_reply_to(mut self, author: Participant) -> Self {
        self.reply_to = Some(author);
        self
    }

    pub fn with_mention(mut self, user: Participant) -> Self {
        self.mentions.push(user);
        self
    }

    pub fn sender_id(&self) -> Option<i64> {
        self.sender.as_ref().map(|s| s.id)
    }
}

/// Reaction change on a message
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub chat_id: i64,
    pub message_id: i32,
    /// None for anonymous reactions
    pub reactor_id: Option<i64>,
    /// Emoji of the new reaction set, in order
    pub emojis: Vec<String>,
}

/// Handle to a message the bot sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

impl fmt::Display for SentMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat_id, self.message_id)
    }
}

/// Outbound operations the handlers need
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Send a plain text message
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<SentMessage, TransportError>;

    /// Delete a message
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError>;
}
