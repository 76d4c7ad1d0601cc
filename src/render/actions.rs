//! Retry and copy affordances on the latest assistant reply.

use serde::Serialize;

use crate::conversation::{Message, Part, Role};

/// An action attached to a rendered text part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum MessageAction {
    /// Ask the session to generate the last assistant turn again.
    Retry,
    /// Put the exact part text on the clipboard.
    Copy {
        /// Text written to the clipboard, untransformed.
        text: String,
    },
}

impl MessageAction {
    /// Button label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Retry => "Retry",
            Self::Copy { .. } => "Copy",
        }
    }
}

/// Whether the part at `part_index` carries the retry/copy actions.
///
/// The message must be an assistant message, the last message of the
/// conversation, and the part must be its final text part. A reply that
/// interleaves text with tool calls therefore shows the actions once, under
/// the closing text.
#[must_use]
pub fn show_actions(message: &Message, part_index: usize, messages: &[Message]) -> bool {
    message.role == Role::Assistant
        && messages.last().is_some_and(|last| last.id == message.id)
        && matches!(message.parts.get(part_index), Some(Part::Text { .. }))
        && last_text_index(message) == Some(part_index)
}

/// The actions exposed for a qualifying text part.
#[must_use]
pub fn actions_for(text: &str) -> Vec<MessageAction> {
    vec![
        MessageAction::Retry,
        MessageAction::Copy {
            text: text.to_string(),
        },
    ]
}

fn last_text_index(message: &Message) -> Option<usize> {
    message
        .parts
        .iter()
        .rposition(|part| matches!(part, Part::Text { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ToolPart;
    use serde_json::json;

    fn conversation() -> Vec<Message> {
        vec![
            Message::with_id("1", Role::User, vec![Part::text("hi")]),
            Message::with_id(
                "2",
                Role::Assistant,
                vec![Part::source_url("https://a"), Part::text("hello")],
            ),
        ]
    }

    #[test]
    fn test_last_assistant_text_shows_actions() {
        let messages = conversation();
        assert!(show_actions(&messages[1], 1, &messages));
        assert!(!show_actions(&messages[1], 0, &messages));
    }

    #[test]
    fn test_user_and_older_messages_never_show_actions() {
        let mut messages = conversation();
        assert!(!show_actions(&messages[0], 0, &messages));

        messages.push(Message::with_id("3", Role::User, vec![Part::text("again")]));
        assert!(!show_actions(&messages[1], 1, &messages));
        assert!(!show_actions(&messages[2], 0, &messages));
    }

    #[test]
    fn test_exactly_one_part_when_text_is_interleaved() {
        let messages = vec![Message::with_id(
            "a",
            Role::Assistant,
            vec![
                Part::text("let me check"),
                Part::Tool(ToolPart::new("calc", "c1", json!({}))),
                Part::text("done"),
            ],
        )];

        let flagged: Vec<usize> = (0..messages[0].parts.len())
            .filter(|&i| show_actions(&messages[0], i, &messages))
            .collect();
        assert_eq!(flagged, vec![2]);
    }

    #[test]
    fn test_out_of_range_index_is_false() {
        let messages = conversation();
        assert!(!show_actions(&messages[1], 9, &messages));
    }

    #[test]
    fn test_copy_carries_exact_text() {
        let actions = actions_for("  hello\n");
        assert_eq!(actions[0], MessageAction::Retry);
        assert_eq!(
            actions[1],
            MessageAction::Copy {
                text: "  hello\n".to_string()
            }
        );
        assert_eq!(actions[1].label(), "Copy");
    }
}
