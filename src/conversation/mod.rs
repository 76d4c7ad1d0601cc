//! Conversation data model.
//!
//! A conversation is an ordered list of [`Message`]s, each an ordered list of
//! typed [`Part`]s, plus a session-wide [`ChatStatus`]. The session owns and
//! mutates its own storage; everything downstream reads an immutable
//! [`ConversationSnapshot`].
//!
//! # Example
//!
//! ```rust
//! use agent_chat_view::conversation::{ChatStatus, ConversationSnapshot, Message, Part, Role};
//!
//! let snapshot = ConversationSnapshot::new(
//!     vec![Message::new(Role::User, vec![Part::text("hi")])],
//!     ChatStatus::Idle,
//! );
//! assert_eq!(snapshot.messages().len(), 1);
//! ```

mod part;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use part::{FilePart, Part, PartKind, SourceUrl, TOOL_PREFIX, ToolPart, ToolState};

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

impl Role {
    /// Wire name of this role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable message identifier.
    pub id: String,
    /// Author role.
    pub role: Role,
    /// Ordered parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Message {
    /// Create a message with a fresh id.
    #[must_use]
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), role, parts)
    }

    /// Create a message with a known id.
    #[must_use]
    pub fn with_id(id: impl Into<String>, role: Role, parts: Vec<Part>) -> Self {
        Self {
            id: id.into(),
            role,
            parts,
        }
    }

    /// Index of the most recent part, if any.
    #[must_use]
    pub fn last_part_index(&self) -> Option<usize> {
        self.parts.len().checked_sub(1)
    }

    /// Concatenated content of all text parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    /// Attached files, in order.
    pub fn files(&self) -> impl Iterator<Item = &FilePart> {
        self.parts.iter().filter_map(|part| match part {
            Part::File(file) => Some(file),
            _ => None,
        })
    }

    /// Find a tool invocation by call id.
    pub fn tool_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolPart> {
        self.parts.iter_mut().find_map(|part| match part {
            Part::Tool(tool) if tool.tool_call_id == tool_call_id => Some(tool),
            _ => None,
        })
    }
}

/// Network and generation state of a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// Nothing in flight.
    #[default]
    #[serde(alias = "ready")]
    Idle,
    /// A response was requested and nothing has arrived yet.
    Submitted,
    /// At least part of the response has arrived.
    Streaming,
    /// The last request failed.
    Error,
}

impl ChatStatus {
    /// Wire name of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitted => "submitted",
            Self::Streaming => "streaming",
            Self::Error => "error",
        }
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Submitted | Self::Streaming)
    }
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of a conversation at one point in time.
///
/// Cloning is cheap: the message list is shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    messages: Arc<[Message]>,
    status: ChatStatus,
}

impl Default for ConversationSnapshot {
    fn default() -> Self {
        Self::new(Vec::new(), ChatStatus::Idle)
    }
}

impl ConversationSnapshot {
    /// Build a snapshot from a message list and status.
    #[must_use]
    pub fn new(messages: impl Into<Arc<[Message]>>, status: ChatStatus) -> Self {
        Self {
            messages: messages.into(),
            status,
        }
    }

    /// Messages in conversation order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ChatStatus {
        self.status
    }

    /// The most recently appended message.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Id of the most recently appended message.
    #[must_use]
    pub fn last_message_id(&self) -> Option<&str> {
        self.last_message().map(|m| m.id.as_str())
    }

    /// Whether the conversation has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_roundtrip_from_wire_json() {
        let message: Message = serde_json::from_value(json!({
            "id": "2",
            "role": "assistant",
            "parts": [
                { "type": "source-url", "url": "https://a" },
                { "type": "text", "text": "hello" }
            ]
        }))
        .unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.parts.len(), 2);
        assert_eq!(message.text(), "hello");
        assert_eq!(message.last_part_index(), Some(1));
    }

    #[test]
    fn test_status_accepts_ready_alias() {
        let status: ChatStatus = serde_json::from_value(json!("ready")).unwrap();
        assert_eq!(status, ChatStatus::Idle);
        assert_eq!(serde_json::to_value(status).unwrap(), json!("idle"));
    }

    #[test]
    fn test_snapshot_tracks_last_message() {
        let snapshot = ConversationSnapshot::new(
            vec![
                Message::with_id("1", Role::User, vec![Part::text("hi")]),
                Message::with_id("2", Role::Assistant, vec![]),
            ],
            ChatStatus::Submitted,
        );

        assert_eq!(snapshot.last_message_id(), Some("2"));
        assert!(snapshot.status().is_busy());
        assert!(ConversationSnapshot::default().is_empty());
    }

    #[test]
    fn test_tool_lookup_by_call_id() {
        let mut message = Message::new(
            Role::Assistant,
            vec![
                Part::text("checking"),
                Part::Tool(ToolPart::new("calc", "call-1", json!({}))),
            ],
        );

        message.tool_mut("call-1").unwrap().complete(json!(4));
        assert!(message.tool_mut("call-2").is_none());
        assert!(matches!(&message.parts[1], Part::Tool(t) if t.output == Some(json!(4))));
    }
}
