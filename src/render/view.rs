//! Conversation view model.

use serde::Serialize;
use serde_json::Value;

use crate::conversation::{ChatStatus, ConversationSnapshot, Message, Role, ToolState};

use super::actions::{MessageAction, actions_for, show_actions};
use super::classify::{RenderPlan, ToolOutcome, classify};
use super::sources::{Source, sources};
use super::streaming::is_streaming_tail;

/// Everything needed to draw a conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationView {
    /// Rendered messages in conversation order.
    pub messages: Vec<MessageView>,
    /// Whether to show the loading indicator.
    pub loading: bool,
    /// Status the view was built from.
    pub status: ChatStatus,
}

/// One rendered message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    /// Id of the source message.
    pub id: String,
    /// Author of the message.
    pub role: Role,
    /// Grouped citations, shown before the parts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<SourcesView>,
    /// Renderable parts in order; skipped parts leave no block.
    pub blocks: Vec<Block>,
}

/// The sources disclosure of an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcesView {
    /// Number of citations, duplicates included.
    pub count: usize,
    /// Citations in message order.
    pub items: Vec<Source>,
}

impl SourcesView {
    /// Label of the disclosure trigger.
    #[must_use]
    pub fn label(&self) -> String {
        if self.count == 1 {
            "Used 1 source".to_string()
        } else {
            format!("Used {} sources", self.count)
        }
    }
}

/// A rendered part.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    /// A message bubble.
    Text {
        /// Stable key, see [`Block::key`].
        key: String,
        /// Author of the enclosing message.
        role: Role,
        /// Bubble content.
        text: String,
        /// Retry and copy, only on the final assistant text.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        actions: Vec<MessageAction>,
    },
    /// A reasoning disclosure.
    Reasoning {
        /// Stable key, see [`Block::key`].
        key: String,
        /// Reasoning content.
        text: String,
        /// Whether this is the reasoning currently being streamed.
        streaming: bool,
    },
    /// A tool trace.
    Tool {
        /// Stable key, see [`Block::key`].
        key: String,
        /// Tool name without the tag prefix.
        name: String,
        /// Execution state.
        state: ToolState,
        /// Input arguments.
        input: Value,
        /// Present only for `output-available`.
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
        /// Present only for `output-error`.
        #[serde(skip_serializing_if = "Option::is_none")]
        error_text: Option<String>,
    },
}

impl Block {
    /// Stable key, `<message id>-<part index>`.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Text { key, .. } | Self::Reasoning { key, .. } | Self::Tool { key, .. } => key,
        }
    }

    /// Actions attached to this block.
    #[must_use]
    pub fn actions(&self) -> &[MessageAction] {
        match self {
            Self::Text { actions, .. } => actions,
            _ => &[],
        }
    }
}

/// Build the view for a snapshot.
///
/// Pure: the same snapshot always yields an equal view.
#[must_use]
pub fn render_conversation(snapshot: &ConversationSnapshot) -> ConversationView {
    let messages = snapshot.messages();
    let last_id = snapshot.last_message_id();

    ConversationView {
        messages: messages
            .iter()
            .map(|message| render_message(message, messages, snapshot.status(), last_id))
            .collect(),
        loading: snapshot.status() == ChatStatus::Submitted,
        status: snapshot.status(),
    }
}

fn render_message(
    message: &Message,
    messages: &[Message],
    status: ChatStatus,
    last_id: Option<&str>,
) -> MessageView {
    let items = sources(message);
    let sources = (!items.is_empty()).then(|| SourcesView {
        count: items.len(),
        items,
    });

    let blocks = message
        .parts
        .iter()
        .enumerate()
        .filter_map(|(index, part)| {
            let key = format!("{}-{index}", message.id);
            match classify(part) {
                RenderPlan::Text { text } => Some(Block::Text {
                    key,
                    role: message.role,
                    text: text.to_string(),
                    actions: if show_actions(message, index, messages) {
                        actions_for(text)
                    } else {
                        Vec::new()
                    },
                }),
                RenderPlan::Reasoning { text } => Some(Block::Reasoning {
                    key,
                    text: text.to_string(),
                    streaming: is_streaming_tail(message, index, status, last_id),
                }),
                RenderPlan::Tool(trace) => {
                    let (output, error_text) = match trace.outcome {
                        ToolOutcome::Pending => (None, None),
                        ToolOutcome::Output(output) => (Some(output.clone()), None),
                        ToolOutcome::Error(error) => (None, Some(error.to_string())),
                    };
                    Some(Block::Tool {
                        key,
                        name: trace.name.to_string(),
                        state: trace.state.clone(),
                        input: trace.input.clone(),
                        output,
                        error_text,
                    })
                }
                RenderPlan::Skip => None,
            }
        })
        .collect();

    MessageView {
        id: message.id.clone(),
        role: message.role,
        sources,
        blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Part, ToolPart};
    use serde_json::json;

    fn scenario(status: ChatStatus) -> ConversationSnapshot {
        let messages: Vec<Message> = serde_json::from_value(json!([
            { "id": "1", "role": "user", "parts": [{ "type": "text", "text": "hi" }] },
            { "id": "2", "role": "assistant", "parts": [
                { "type": "source-url", "url": "https://a" },
                { "type": "source-url", "url": "https://a" },
                { "type": "text", "text": "hello" }
            ]}
        ]))
        .unwrap();
        ConversationSnapshot::new(messages, status)
    }

    #[test]
    fn test_scenario_sources_and_actions() {
        let view = render_conversation(&scenario(ChatStatus::Idle));

        assert_eq!(view.messages.len(), 2);
        assert!(view.messages[0].sources.is_none());

        let sources = view.messages[1].sources.as_ref().unwrap();
        assert_eq!(sources.count, 2);
        assert_eq!(sources.label(), "Used 2 sources");

        let blocks = &view.messages[1].blocks;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].key(), "2-2");
        assert_eq!(
            blocks[0].actions(),
            &[
                MessageAction::Retry,
                MessageAction::Copy {
                    text: "hello".to_string()
                }
            ]
        );
        assert!(view.messages[0].blocks[0].actions().is_empty());
    }

    #[test]
    fn test_loading_only_when_submitted() {
        assert!(render_conversation(&scenario(ChatStatus::Submitted)).loading);
        for status in [ChatStatus::Streaming, ChatStatus::Idle, ChatStatus::Error] {
            assert!(!render_conversation(&scenario(status)).loading);
        }
    }

    #[test]
    fn test_single_streaming_reasoning_block() {
        let snapshot = ConversationSnapshot::new(
            vec![
                Message::with_id("1", Role::Assistant, vec![Part::reasoning("old")]),
                Message::with_id("2", Role::User, vec![Part::text("next")]),
                Message::with_id(
                    "3",
                    Role::Assistant,
                    vec![Part::reasoning("a"), Part::reasoning("b")],
                ),
            ],
            ChatStatus::Streaming,
        );

        let view = render_conversation(&snapshot);
        let streaming: Vec<&str> = view
            .messages
            .iter()
            .flat_map(|m| &m.blocks)
            .filter(|b| matches!(b, Block::Reasoning { streaming: true, .. }))
            .map(Block::key)
            .collect();
        assert_eq!(streaming, vec!["3-1"]);

        let settled = ConversationSnapshot::new(snapshot.messages().to_vec(), ChatStatus::Idle);
        assert!(
            render_conversation(&settled)
                .messages
                .iter()
                .flat_map(|m| &m.blocks)
                .all(|b| !matches!(b, Block::Reasoning { streaming: true, .. }))
        );
    }

    #[test]
    fn test_tool_blocks_and_skipped_parts() {
        let mut failed = ToolPart::new("performSecretCalculation", "c1", json!({ "a": 1, "b": 2 }));
        failed.fail("bad input");
        let snapshot = ConversationSnapshot::new(
            vec![Message::with_id(
                "m",
                Role::Assistant,
                vec![
                    Part::Other {
                        kind: "step-start".to_string(),
                        raw: json!({ "type": "step-start" }),
                    },
                    Part::Tool(failed),
                ],
            )],
            ChatStatus::Idle,
        );

        let view = render_conversation(&snapshot);
        let blocks = &view.messages[0].blocks;
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::Tool {
                key,
                name,
                state,
                output,
                error_text,
                ..
            } => {
                assert_eq!(key, "m-1");
                assert_eq!(name, "performSecretCalculation");
                assert_eq!(*state, ToolState::OutputError);
                assert!(output.is_none());
                assert_eq!(error_text.as_deref(), Some("bad input"));
            }
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let snapshot = scenario(ChatStatus::Streaming);
        assert_eq!(render_conversation(&snapshot), render_conversation(&snapshot));
    }
}
