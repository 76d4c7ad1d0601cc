//! Prompt form.

use std::fmt::Write;

use crate::compose::Composer;
use crate::config::ModelOption;
use crate::conversation::ChatStatus;

use super::{attr, icons, text};

/// Icon and label of the submit button for a status.
fn submit_face(status: ChatStatus) -> (&'static str, &'static str) {
    match status {
        ChatStatus::Submitted => (icons::LOADER, "Sending"),
        ChatStatus::Streaming => (icons::STOP, "Generating"),
        ChatStatus::Error => (icons::X, "Failed, send again"),
        ChatStatus::Idle => (icons::SEND, "Send"),
    }
}

/// Render the prompt form of `session_id`.
#[must_use]
pub fn composer(
    session_id: &str,
    draft: &Composer,
    models: &[ModelOption],
    status: ChatStatus,
) -> String {
    let mut options = String::new();
    for model in models {
        let selected = if model.value == draft.model() {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            options,
            r#"<option value="{}"{selected}>{}</option>"#,
            attr(&model.value),
            text(&model.name),
        );
    }

    let (submit_icon, submit_label) = submit_face(status);
    let search_class = if draft.web_search() {
        "toggle active"
    } else {
        "toggle"
    };

    format!(
        r#"<form id="composer" class="prompt-input" data-session-id="{session}" data-action="/api/sessions/{session}/messages" data-status="{status}">
    <textarea name="text" placeholder="What would you like to know?" rows="2">{input}</textarea>
    <div class="prompt-attachments" data-attachments></div>
    <div class="prompt-toolbar">
        <div class="prompt-tools">
            <label class="tool-button" title="Add attachments">{paperclip}<input type="file" name="files" multiple hidden></label>
            <button type="button" class="{search_class}" data-action="toggle-search" aria-pressed="{web_search}">{globe}<span>Search</span></button>
            <input type="hidden" name="webSearch" value="{web_search}">
            <select name="model" aria-label="Model">{options}</select>
        </div>
        <button type="submit" class="submit" data-status="{status}" aria-label="{submit_label}" title="{submit_label}">{submit_icon}</button>
    </div>
</form>"#,
        session = attr(session_id),
        status = status.as_str(),
        input = text(draft.input()),
        paperclip = icons::PAPERCLIP,
        web_search = draft.web_search(),
        globe = icons::GLOBE,
    )
}
