//! Prompt submission.
//!
//! The composer forwards a user turn to the session together with the
//! selected model and the web-search flag. Empty submissions never reach the
//! session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::FilePart;
use crate::error::Result;

/// Text sent when a prompt carries attachments but no text.
pub const DEFAULT_ATTACHMENT_PLACEHOLDER: &str = "Sent with attachments";

const OCTET_STREAM: &str = "application/octet-stream";

/// A file picked in the composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Original filename.
    #[serde(default)]
    pub filename: Option<String>,
    /// Media type reported by the browser, if any.
    #[serde(default)]
    pub media_type: Option<String>,
    /// Data URL of the file contents.
    pub url: String,
}

impl Attachment {
    /// Convert into a message part, guessing the media type from the
    /// filename when the browser did not report one.
    #[must_use]
    pub fn into_file_part(self) -> FilePart {
        let media_type = self
            .media_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                self.filename.as_deref().map_or_else(
                    || OCTET_STREAM.to_string(),
                    |name| mime_guess::from_path(name).first_or_octet_stream().to_string(),
                )
            });

        FilePart {
            media_type,
            filename: self.filename,
            url: self.url,
        }
    }
}

/// What the user typed and attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PromptSubmission {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub files: Vec<Attachment>,
}

/// A user turn as handed to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessage {
    /// Never empty.
    pub text: String,
    pub files: Vec<FilePart>,
}

/// Per-request metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Catalog id of the selected model.
    pub model: String,
    /// Whether web search is enabled.
    pub web_search: bool,
}

/// Outbound interface of the chat session.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Append a user turn and start generating a reply.
    async fn send_message(&self, message: SendMessage, options: RequestOptions) -> Result<()>;

    /// Generate the last assistant turn again.
    async fn regenerate(&self) -> Result<()>;
}

/// Result of a submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The message was forwarded to the session.
    Dispatched,
    /// Nothing to send; no call was made.
    Rejected,
}

/// Turn a raw submission into a message, or `None` when it is empty.
#[must_use]
pub fn prepare(submission: PromptSubmission, placeholder: &str) -> Option<SendMessage> {
    let has_text = !submission.text.is_empty();
    let has_files = !submission.files.is_empty();
    if !(has_text || has_files) {
        return None;
    }

    let text = if has_text {
        submission.text
    } else {
        placeholder.to_string()
    };

    Some(SendMessage {
        text,
        files: submission
            .files
            .into_iter()
            .map(Attachment::into_file_part)
            .collect(),
    })
}

/// Forward a submission to the session.
pub async fn submit(
    backend: &dyn ChatBackend,
    submission: PromptSubmission,
    options: RequestOptions,
    placeholder: &str,
) -> Result<SubmitOutcome> {
    let Some(message) = prepare(submission, placeholder) else {
        tracing::debug!(name: "chat.submit.rejected", "Ignoring empty submission");
        return Ok(SubmitOutcome::Rejected);
    };

    tracing::info!(
        name: "chat.submit",
        model = %options.model,
        web_search = options.web_search,
        text_length = message.text.len(),
        attachments = message.files.len(),
        "Submitting prompt"
    );
    backend.send_message(message, options).await?;
    Ok(SubmitOutcome::Dispatched)
}

/// Composer state: the draft text, selected model and search toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composer {
    input: String,
    model: String,
    web_search: bool,
}

impl Composer {
    /// Start with an empty draft and the given model selected.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            input: String::new(),
            model: model.into(),
            web_search: false,
        }
    }

    /// Restore the selection used for a previous request.
    #[must_use]
    pub fn from_options(options: &RequestOptions) -> Self {
        Self {
            input: String::new(),
            model: options.model.clone(),
            web_search: options.web_search,
        }
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn web_search(&self) -> bool {
        self.web_search
    }

    pub fn set_web_search(&mut self, enabled: bool) {
        self.web_search = enabled;
    }

    /// Options for the next request.
    #[must_use]
    pub fn options(&self) -> RequestOptions {
        RequestOptions {
            model: self.model.clone(),
            web_search: self.web_search,
        }
    }

    /// Submit the draft with the given attachments. The draft is cleared
    /// once the session accepted the message.
    pub async fn submit(
        &mut self,
        backend: &dyn ChatBackend,
        files: Vec<Attachment>,
        placeholder: &str,
    ) -> Result<SubmitOutcome> {
        let submission = PromptSubmission {
            text: self.input.clone(),
            files,
        };
        let outcome = submit(backend, submission, self.options(), placeholder).await?;
        if outcome == SubmitOutcome::Dispatched {
            self.input.clear();
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        sent: Mutex<Vec<(SendMessage, RequestOptions)>>,
        regenerated: Mutex<usize>,
    }

    #[async_trait]
    impl ChatBackend for RecordingBackend {
        async fn send_message(&self, message: SendMessage, options: RequestOptions) -> Result<()> {
            self.sent.lock().unwrap().push((message, options));
            Ok(())
        }

        async fn regenerate(&self) -> Result<()> {
            *self.regenerated.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn png() -> Attachment {
        Attachment {
            filename: Some("cat.png".to_string()),
            media_type: None,
            url: "data:image/png;base64,AAAA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_submission_makes_no_call() {
        let backend = RecordingBackend::default();
        let mut composer = Composer::new("openai/gpt-5-nano");

        let outcome = composer
            .submit(&backend, Vec::new(), DEFAULT_ATTACHMENT_PLACEHOLDER)
            .await
            .unwrap();

        assert_eq!(outcome, SubmitOutcome::Rejected);
        assert!(backend.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attachment_only_uses_placeholder() {
        let backend = RecordingBackend::default();
        let mut composer = Composer::new("openai/gpt-5-nano");

        composer
            .submit(&backend, vec![png()], DEFAULT_ATTACHMENT_PLACEHOLDER)
            .await
            .unwrap();

        let sent = backend.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.text, "Sent with attachments");
        assert_eq!(sent[0].0.files[0].media_type, "image/png");
    }

    #[tokio::test]
    async fn test_metadata_forwarded_and_draft_cleared() {
        let backend = RecordingBackend::default();
        let mut composer = Composer::new("deepseek/deepseek-r1");
        composer.set_web_search(true);
        composer.set_input("what is 2 + 3?");

        let outcome = composer
            .submit(&backend, Vec::new(), DEFAULT_ATTACHMENT_PLACEHOLDER)
            .await
            .unwrap();

        assert_eq!(outcome, SubmitOutcome::Dispatched);
        assert_eq!(composer.input(), "");
        let sent = backend.sent.lock().unwrap();
        assert_eq!(sent[0].0.text, "what is 2 + 3?");
        assert_eq!(
            sent[0].1,
            RequestOptions {
                model: "deepseek/deepseek-r1".to_string(),
                web_search: true,
            }
        );
    }

    #[test]
    fn test_text_is_forwarded_verbatim() {
        let message = prepare(
            PromptSubmission {
                text: "  spaced  ".to_string(),
                files: Vec::new(),
            },
            DEFAULT_ATTACHMENT_PLACEHOLDER,
        )
        .unwrap();
        assert_eq!(message.text, "  spaced  ");
    }

    #[test]
    fn test_unknown_extension_falls_back_to_octet_stream() {
        let part = Attachment {
            filename: Some("blob.zzzunknown".to_string()),
            media_type: Some(String::new()),
            url: "data:,".to_string(),
        }
        .into_file_part();
        assert_eq!(part.media_type, "application/octet-stream");
    }
}
