//! Agents produce the assistant side of a conversation.
//!
//! An [`Agent`] turns the conversation history into a stream of
//! [`AgentEvent`]s. The session folds those events into the trailing
//! assistant message; agents never touch session storage themselves.
//!
//! # Agents
//!
//! - [`LocalAgent`]: offline responder that exercises every part kind
//!
//! # Tools
//!
//! - [`Tool`]: named tool with a JSON input schema
//! - [`ToolSet`]: tool lookup by name
//! - [`SecretCalculation`]: the bundled `performSecretCalculation` tool

mod local;
mod tools;

pub use local::LocalAgent;
pub use tools::{SECRET_CALCULATION, SecretCalculation, Tool, ToolSet};

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::compose::RequestOptions;
use crate::conversation::Message;

/// Incremental output of an agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AgentEvent {
    /// A new assistant message begins.
    #[serde(rename = "start")]
    Start {
        /// Id of the assistant message.
        message_id: String,
    },

    /// Text to append to the current text part.
    #[serde(rename = "text.delta")]
    TextDelta { text: String },

    /// Text to append to the current reasoning part.
    #[serde(rename = "reasoning.delta")]
    ReasoningDelta { text: String },

    /// A cited source.
    #[serde(rename = "source")]
    Source { url: String },

    /// A tool call with complete input.
    #[serde(rename = "tool.input")]
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        input: serde_json::Value,
    },

    /// Result of a tool call.
    #[serde(rename = "tool.output")]
    ToolOutput {
        tool_call_id: String,
        output: serde_json::Value,
    },

    /// A tool call failed.
    #[serde(rename = "tool.error")]
    ToolError {
        tool_call_id: String,
        error_text: String,
    },

    /// The run failed.
    #[serde(rename = "error")]
    Error { message: String },

    /// The run completed.
    #[serde(rename = "finish")]
    Finish,
}

impl AgentEvent {
    /// Stable event name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::TextDelta { .. } => "text.delta",
            Self::ReasoningDelta { .. } => "reasoning.delta",
            Self::Source { .. } => "source",
            Self::ToolInputAvailable { .. } => "tool.input",
            Self::ToolOutput { .. } => "tool.output",
            Self::ToolError { .. } => "tool.error",
            Self::Error { .. } => "error",
            Self::Finish => "finish",
        }
    }
}

/// Input of an agent run.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Conversation history, ending with the user turn to answer.
    pub messages: Vec<Message>,
    /// Model and search settings for this turn.
    pub options: RequestOptions,
}

/// Stream of events produced by a run.
pub type AgentStream = BoxStream<'static, AgentEvent>;

/// Something that can answer a conversation.
#[async_trait::async_trait]
pub trait Agent: Send + Sync + std::fmt::Debug {
    /// Start a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be started at all. Failures after
    /// the stream started are reported as [`AgentEvent::Error`].
    async fn run(&self, request: AgentRequest) -> anyhow::Result<AgentStream>;
}
