//! Chat services the bot can talk through.

pub mod console;
pub mod discord;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportResult;
use crate::reply::Embed;

pub use console::ConsoleTransport;
pub use discord::DiscordTransport;

/// Identifies one conversation (a channel, or the console).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message someone sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub conversation: ConversationId,
    pub message: MessageId,
    pub text: String,
}

/// A message the bot sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Embed(Embed),
    Text(String),
}

/// A chat service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Wait for the next inbound message; `None` once the service closes.
    async fn next_inbound(&self) -> TransportResult<Option<Inbound>>;

    /// Post a message and return its id.
    async fn send(
        &self,
        conversation: &ConversationId,
        message: &Outbound,
    ) -> TransportResult<MessageId>;

    async fn delete(&self, conversation: &ConversationId, message: &MessageId)
        -> TransportResult<()>;
}
