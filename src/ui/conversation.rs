//! Conversation fragment.
//!
//! Renders a [`ConversationView`] as the `#conversation` element. The same
//! markup is served on page load, by the view endpoint and in every SSE
//! `view` event, so the client only ever swaps the whole element.

use std::fmt::Write;

use serde_json::Value;

use crate::conversation::{ChatStatus, Role};
use crate::render::{Block, ConversationView, MessageAction, MessageView, SourcesView};

use super::{attr, icons, text};

/// Render the conversation of `session_id`.
#[must_use]
pub fn conversation_fragment(session_id: &str, view: &ConversationView) -> String {
    let mut html = format!(
        r#"<div id="conversation" class="conversation" data-session-id="{}" data-status="{}" aria-live="polite">"#,
        attr(session_id),
        view.status.as_str(),
    );

    if view.messages.is_empty() {
        html.push_str(
            r#"<div class="conversation-empty"><p>Ask anything. Attach files, pick a model, or turn on search.</p></div>"#,
        );
    }

    for message in &view.messages {
        html.push_str(&message_html(session_id, message));
    }

    if view.loading {
        let _ = write!(
            html,
            r#"<div class="loader" role="status">{}<span class="sr-only">Loading</span></div>"#,
            icons::LOADER
        );
    }

    if view.status == ChatStatus::Error {
        let _ = write!(
            html,
            r#"<div class="chat-error" role="alert"><span>Something went wrong while generating a reply.</span>{}</div>"#,
            retry_button(session_id)
        );
    }

    html.push_str("</div>");
    html
}

fn message_html(session_id: &str, message: &MessageView) -> String {
    let mut html = format!(
        r#"<div class="message-group from-{role}" data-message-id="{id}">"#,
        role = message.role.as_str(),
        id = attr(&message.id),
    );

    if let Some(sources) = &message.sources {
        html.push_str(&sources_html(sources));
    }

    for block in &message.blocks {
        html.push_str(&block_html(session_id, block));
    }

    html.push_str("</div>");
    html
}

fn sources_html(sources: &SourcesView) -> String {
    let mut html = format!(
        r#"<details class="sources"><summary>{}{}</summary><ul>"#,
        icons::BOOK,
        text(&sources.label()),
    );
    for source in &sources.items {
        let _ = write!(
            html,
            r#"<li><a href="{}" target="_blank" rel="noreferrer">{}</a></li>"#,
            attr(&source.url),
            text(source.title()),
        );
    }
    html.push_str("</ul></details>");
    html
}

fn block_html(session_id: &str, block: &Block) -> String {
    match block {
        Block::Text {
            key,
            role,
            text: body,
            actions,
        } => {
            let mut html = format!(
                r#"<div class="message from-{}" id="part-{}"><div class="message-content">{}</div></div>"#,
                role.as_str(),
                attr(key),
                text(body),
            );
            if *role == Role::Assistant && !actions.is_empty() {
                html.push_str(&actions_html(session_id, actions));
            }
            html
        }
        Block::Reasoning {
            key,
            text: body,
            streaming,
        } => {
            let (open, label) = if *streaming {
                (" open", "Thinking...")
            } else {
                ("", "Reasoning")
            };
            format!(
                r#"<details class="reasoning" id="part-{key}" data-streaming="{streaming}"{open}><summary>{icon}{label}</summary><div class="reasoning-content">{body}</div></details>"#,
                key = attr(key),
                icon = icons::BRAIN,
                body = text(body),
            )
        }
        Block::Tool {
            key,
            name,
            state,
            input,
            output,
            error_text,
        } => {
            let mut html = format!(
                r#"<details class="tool" id="part-{key}" data-state="{state}"><summary>{icon}<span class="tool-name">{name}</span><span class="badge badge-{state}">{label}</span></summary><div class="tool-content"><div class="tool-input"><h4>Parameters</h4><pre><code>{input}</code></pre></div>"#,
                key = attr(key),
                state = attr(state.as_str()),
                icon = icons::WRENCH,
                name = text(name),
                label = state.label(),
                input = text(&pretty(input)),
            );
            if let Some(error) = error_text {
                let _ = write!(
                    html,
                    r#"<div class="tool-output tool-error"><h4>Error</h4><div>{}</div></div>"#,
                    text(error)
                );
            } else if let Some(output) = output {
                let _ = write!(
                    html,
                    r#"<div class="tool-output"><h4>Result</h4><pre><code>{}</code></pre></div>"#,
                    text(&pretty(output))
                );
            }
            html.push_str("</div></details>");
            html
        }
    }
}

fn actions_html(session_id: &str, actions: &[MessageAction]) -> String {
    let mut html = String::from(r#"<div class="message-actions">"#);
    for action in actions {
        match action {
            MessageAction::Retry => html.push_str(&retry_button(session_id)),
            MessageAction::Copy { text: copied } => {
                let _ = write!(
                    html,
                    r#"<button type="button" class="action" data-action="copy" data-copy-text="{}" title="{label}" aria-label="{label}">{}</button>"#,
                    attr(copied),
                    icons::COPY,
                    label = action.label(),
                );
            }
        }
    }
    html.push_str("</div>");
    html
}

fn retry_button(session_id: &str) -> String {
    format!(
        r#"<button type="button" class="action" data-action="retry" data-url="/api/sessions/{}/regenerate" title="Retry" aria-label="Retry">{}</button>"#,
        attr(session_id),
        icons::REFRESH,
    )
}

/// Strings are shown as-is, anything else as indented JSON.
fn pretty(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationSnapshot, Message, Part, ToolPart};
    use crate::render::render_conversation;
    use serde_json::json;

    fn render(messages: Vec<Message>, status: ChatStatus) -> String {
        let view = render_conversation(&ConversationSnapshot::new(messages, status));
        conversation_fragment("s1", &view)
    }

    #[test]
    fn test_empty_conversation() {
        let html = render(Vec::new(), ChatStatus::Idle);
        assert!(html.starts_with(r#"<div id="conversation""#));
        assert!(html.contains("conversation-empty"));
        assert!(!html.contains(r#"class="loader""#));
    }

    #[test]
    fn test_reply_with_sources_and_actions() {
        let messages = vec![
            Message::with_id("u1", Role::User, vec![Part::text("hi <there>")]),
            Message::with_id(
                "a1",
                Role::Assistant,
                vec![
                    Part::source_url("https://a.example"),
                    Part::source_url("https://a.example"),
                    Part::text("Hello \"friend\""),
                ],
            ),
        ];
        let html = render(messages, ChatStatus::Idle);

        assert!(html.contains("hi &lt;there&gt;"));
        assert!(html.contains("Used 2 sources"));
        assert_eq!(html.matches(r#"href="https://a.example""#).count(), 2);
        assert!(html.contains(r#"data-action="retry""#));
        assert!(html.contains(r#"data-url="/api/sessions/s1/regenerate""#));
        assert!(html.contains(r#"data-copy-text="Hello &quot;friend&quot;""#));
    }

    #[test]
    fn test_no_actions_on_user_message() {
        let html = render(
            vec![Message::with_id("u1", Role::User, vec![Part::text("hi")])],
            ChatStatus::Submitted,
        );
        assert!(!html.contains("data-action"));
        assert!(html.contains(r#"class="loader""#));
    }

    #[test]
    fn test_streaming_reasoning_is_open() {
        let html = render(
            vec![Message::with_id(
                "a1",
                Role::Assistant,
                vec![Part::reasoning("pondering")],
            )],
            ChatStatus::Streaming,
        );
        assert!(html.contains(r#"data-streaming="true" open"#));
        assert!(html.contains("Thinking..."));

        let html = render(
            vec![Message::with_id(
                "a1",
                Role::Assistant,
                vec![Part::reasoning("pondering")],
            )],
            ChatStatus::Idle,
        );
        assert!(html.contains(r#"data-streaming="false">"#));
    }

    #[test]
    fn test_tool_error_is_rendered_inline() {
        let mut tool = ToolPart::new("performSecretCalculation", "c1", json!({ "a": 1 }));
        tool.fail("missing field `b`");
        let html = render(
            vec![Message::with_id("a1", Role::Assistant, vec![Part::Tool(tool)])],
            ChatStatus::Idle,
        );

        assert!(html.contains(r#"data-state="output-error""#));
        assert!(html.contains("performSecretCalculation"));
        assert!(html.contains("missing field `b`"));
        assert!(html.contains("\"a\": 1"));
    }

    #[test]
    fn test_unfamiliar_tool_state_gets_generic_badge() {
        let part: Part = serde_json::from_value(json!({
            "type": "tool-performSecretCalculation",
            "toolCallId": "c1",
            "state": "approval-requested",
            "input": { "a": 1, "b": 2 }
        }))
        .unwrap();
        let html = render(
            vec![Message::with_id("a1", Role::Assistant, vec![part])],
            ChatStatus::Streaming,
        );

        assert!(html.contains(r#"data-state="approval-requested""#));
        assert!(html.contains(">Waiting</span>"));
        assert!(!html.contains("<h4>Result</h4>"));
    }

    #[test]
    fn test_error_status_offers_retry() {
        let html = render(
            vec![Message::with_id("u1", Role::User, vec![Part::text("hi")])],
            ChatStatus::Error,
        );
        assert!(html.contains(r#"class="chat-error""#));
        assert!(html.contains(r#"data-action="retry""#));
    }

    #[test]
    fn test_carriage_returns_never_reach_markup() {
        let html = render(
            vec![Message::with_id("a1", Role::Assistant, vec![Part::text("a\r\nb")])],
            ChatStatus::Idle,
        );
        assert!(!html.contains('\r'));
    }
}
