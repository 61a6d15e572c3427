//! Conversation-related types.

use serde::{Deserialize, Serialize};

/// A record in the chat history.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    sender: String,
    content: String,
}

impl ChatMessage {
    /// Creates a message sent by `sender`.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>>(
        sender: S1,
        content: S2,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
        }
    }

    /// Returns the name of the participant who sent this message.
    #[inline]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the text of this message.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }
}
