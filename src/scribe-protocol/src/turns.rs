//! Chat turn and stream frame types.

use serde::{Deserialize, Serialize};

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Authored by the person typing.
    User,
    /// Authored by the assistant.
    Assistant,
}

/// Lifecycle state of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum TurnStatus {
    /// Content is final.
    #[default]
    Complete,
    /// Content is still growing; deltas are being appended.
    Streaming,
    /// The stream failed; content holds whatever arrived before the failure.
    Errored,
}

impl TurnStatus {
    /// Whether the turn is still receiving deltas.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }
}

/// One message in a chat session.
///
/// The role is immutable after creation. Content is append-only while the
/// turn is streaming; once the status leaves `Streaming` it never returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub status: TurnStatus,
    /// Optional reference to secondary detail content on the templates
    /// backend, resolvable via the detail lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_ref: Option<String>,
}

impl ChatTurn {
    /// A completed user turn carrying the submitted text.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            status: TurnStatus::Complete,
            linked_ref: None,
        }
    }

    /// An empty assistant placeholder in streaming state.
    pub fn assistant_placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            status: TurnStatus::Streaming,
            linked_ref: None,
        }
    }
}

/// One decoded unit from the transport-level event stream.
///
/// Frames carry no ordering key beyond arrival order and are consumed
/// exactly once. Transport failures are not frames; they travel as errors
/// alongside the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// An incremental text fragment for the in-flight assistant turn.
    Delta(String),
    /// Natural end of the stream (the end sentinel, translated).
    End,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_user_turn_is_complete() {
        let turn = ChatTurn::user("hello");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.status, TurnStatus::Complete);
        assert_eq!(turn.content, "hello");
    }

    #[test]
    fn test_assistant_placeholder_streams_empty() {
        let turn = ChatTurn::assistant_placeholder();
        assert_eq!(turn.role, Role::Assistant);
        assert!(turn.status.is_streaming());
        assert!(turn.content.is_empty());
        assert!(turn.linked_ref.is_none());
    }

    #[test]
    fn test_turn_serde_roundtrip() {
        let turn = ChatTurn {
            role: Role::Assistant,
            content: "done".to_string(),
            status: TurnStatus::Complete,
            linked_ref: Some("prompt-7".to_string()),
        };
        let json = serde_json::to_string(&turn).expect("serialize");
        let parsed: ChatTurn = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.content, "done");
        assert_eq!(parsed.linked_ref.as_deref(), Some("prompt-7"));
    }
}
