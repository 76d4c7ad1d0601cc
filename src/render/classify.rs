//! Part classification.

use serde_json::Value;

use crate::conversation::{Part, ToolPart, ToolState};

static NULL_OUTPUT: Value = Value::Null;

/// Which visual block a part turns into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderPlan<'a> {
    /// A message bubble.
    Text { text: &'a str },
    /// A reasoning disclosure.
    Reasoning { text: &'a str },
    /// A tool trace.
    Tool(ToolTrace<'a>),
    /// Nothing is rendered inline for this part.
    Skip,
}

/// Data needed to draw a tool trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolTrace<'a> {
    /// Tool name without the tag prefix.
    pub name: &'a str,
    /// Execution state.
    pub state: &'a ToolState,
    /// Input arguments.
    pub input: &'a Value,
    /// Settled result, if any.
    pub outcome: ToolOutcome<'a>,
}

/// Result section of a tool trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolOutcome<'a> {
    /// No result yet.
    Pending,
    /// Output of a successful call.
    Output(&'a Value),
    /// Error text of a failed call.
    Error(&'a str),
}

impl<'a> From<&'a ToolPart> for ToolTrace<'a> {
    fn from(tool: &'a ToolPart) -> Self {
        // Output and error text only count once the matching state is reached.
        let outcome = match (&tool.state, &tool.output, &tool.error_text) {
            (ToolState::OutputAvailable, Some(output), _) => ToolOutcome::Output(output),
            (ToolState::OutputAvailable, None, _) => ToolOutcome::Output(&NULL_OUTPUT),
            (ToolState::OutputError, _, Some(error)) => ToolOutcome::Error(error),
            (ToolState::OutputError, _, None) => ToolOutcome::Error(""),
            _ => ToolOutcome::Pending,
        };

        Self {
            name: &tool.name,
            state: &tool.state,
            input: &tool.input,
            outcome,
        }
    }
}

/// Decide how a single part is rendered.
///
/// Tool parts are recognized by their tag family, so any tool name renders
/// as a trace. Source and file parts are shown elsewhere (or not at all) and
/// unknown kinds are skipped.
#[must_use]
pub fn classify(part: &Part) -> RenderPlan<'_> {
    match part {
        Part::Text { text } => RenderPlan::Text { text },
        Part::Reasoning { text } => RenderPlan::Reasoning { text },
        Part::Tool(tool) => RenderPlan::Tool(ToolTrace::from(tool)),
        Part::SourceUrl(_) | Part::File(_) | Part::Other { .. } => RenderPlan::Skip,
    }
}
