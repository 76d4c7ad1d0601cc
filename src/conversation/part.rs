//! Typed message parts.
//!
//! Parts travel as JSON objects tagged by a `type` field. Tool invocations
//! use an open tag family (`tool-<name>`), so the tool name is recovered
//! from the tag rather than from a fixed list of variants.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Tag prefix shared by every tool-invocation part.
pub const TOOL_PREFIX: &str = "tool-";

/// One typed fragment of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Plain assistant or user text.
    Text {
        /// The text content.
        text: String,
    },
    /// Model reasoning shown in a collapsible block.
    Reasoning {
        /// The reasoning text.
        text: String,
    },
    /// A cited source.
    SourceUrl(SourceUrl),
    /// An attached file.
    File(FilePart),
    /// A single tool call record.
    Tool(ToolPart),
    /// Any part kind this crate does not know about. Kept verbatim.
    Other {
        /// The raw `type` tag.
        kind: String,
        /// The full JSON object as received.
        raw: Value,
    },
}

/// Coarse part kind, independent of payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Text,
    Reasoning,
    SourceUrl,
    File,
    Tool,
    Other,
}

/// A source citation attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUrl {
    /// Source URL.
    pub url: String,
    /// Provider-assigned source identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Optional title supplied by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A file attached to a message, usually as a data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    /// IANA media type, e.g. `image/png`.
    pub media_type: String,
    /// Original filename, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Data or remote URL.
    pub url: String,
}

/// Execution state of a tool invocation.
///
/// States this crate has no special handling for (approval requests,
/// denials) are kept verbatim in [`ToolState::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolState {
    /// Arguments are still being streamed.
    #[default]
    InputStreaming,
    /// Arguments are complete, execution pending.
    InputAvailable,
    /// The tool returned an output.
    OutputAvailable,
    /// The tool failed; see `error_text`.
    OutputError,
    /// Any other wire state.
    Other(String),
}

impl ToolState {
    /// Wire name of this state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InputStreaming => "input-streaming",
            Self::InputAvailable => "input-available",
            Self::OutputAvailable => "output-available",
            Self::OutputError => "output-error",
            Self::Other(state) => state,
        }
    }

    /// Human readable label for the trace header.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::InputStreaming => "Pending",
            Self::InputAvailable => "Running",
            Self::OutputAvailable => "Completed",
            Self::OutputError => "Error",
            Self::Other(_) => "Waiting",
        }
    }

    /// Whether the invocation has reached a final state.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::OutputAvailable | Self::OutputError)
    }
}

impl From<String> for ToolState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "input-streaming" => Self::InputStreaming,
            "input-available" => Self::InputAvailable,
            "output-available" => Self::OutputAvailable,
            "output-error" => Self::OutputError,
            _ => Self::Other(state),
        }
    }
}

impl From<ToolState> for String {
    fn from(state: ToolState) -> Self {
        match state {
            ToolState::Other(state) => state,
            known => known.as_str().to_string(),
        }
    }
}

/// A tool invocation record.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPart {
    /// Tool name, the tag suffix after [`TOOL_PREFIX`].
    pub name: String,
    /// Identifier correlating the call with its result.
    pub tool_call_id: String,
    /// Current execution state.
    pub state: ToolState,
    /// Tool input arguments.
    pub input: Value,
    /// Tool output, meaningful once `state` is `output-available`.
    pub output: Option<Value>,
    /// Error text, meaningful once `state` is `output-error`.
    pub error_text: Option<String>,
}

impl ToolPart {
    /// Start a new invocation with complete input.
    #[must_use]
    pub fn new(name: impl Into<String>, tool_call_id: impl Into<String>, input: Value) -> Self {
        Self {
            name: name.into(),
            tool_call_id: tool_call_id.into(),
            state: ToolState::InputAvailable,
            input,
            output: None,
            error_text: None,
        }
    }

    /// Full `type` tag, e.g. `tool-performSecretCalculation`.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("{TOOL_PREFIX}{}", self.name)
    }

    /// Record a successful result.
    pub fn complete(&mut self, output: Value) {
        self.state = ToolState::OutputAvailable;
        self.output = Some(output);
        self.error_text = None;
    }

    /// Record a failure.
    pub fn fail(&mut self, error_text: impl Into<String>) {
        self.state = ToolState::OutputError;
        self.output = None;
        self.error_text = Some(error_text.into());
    }
}

/// Wire body of a tool part; the tag is handled separately.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolBody<'a> {
    tool_call_id: &'a str,
    state: &'a ToolState,
    input: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_text: Option<&'a str>,
}

impl ToolPart {
    /// Read a tool part field by field. Never fails: absent or mistyped
    /// fields fall back to their defaults so the part still renders as a
    /// tool trace.
    fn from_raw(name: &str, raw: &Value) -> Self {
        let field = |key: &str| raw.get(key).filter(|v| !v.is_null());
        Self {
            name: name.to_string(),
            tool_call_id: field("toolCallId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            state: field("state")
                .and_then(Value::as_str)
                .map(|s| ToolState::from(s.to_string()))
                .unwrap_or_default(),
            input: field("input").cloned().unwrap_or(Value::Null),
            output: field("output").cloned(),
            error_text: field("errorText").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TextBody {
    #[serde(default)]
    text: String,
}

impl Part {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a reasoning part.
    #[must_use]
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning { text: text.into() }
    }

    /// Create a source-url part with no id or title.
    #[must_use]
    pub fn source_url(url: impl Into<String>) -> Self {
        Self::SourceUrl(SourceUrl {
            url: url.into(),
            source_id: None,
            title: None,
        })
    }

    /// The coarse kind of this part.
    #[must_use]
    pub fn kind(&self) -> PartKind {
        match self {
            Self::Text { .. } => PartKind::Text,
            Self::Reasoning { .. } => PartKind::Reasoning,
            Self::SourceUrl(_) => PartKind::SourceUrl,
            Self::File(_) => PartKind::File,
            Self::Tool(_) => PartKind::Tool,
            Self::Other { .. } => PartKind::Other,
        }
    }

    /// The wire `type` tag.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::Text { .. } => "text".to_string(),
            Self::Reasoning { .. } => "reasoning".to_string(),
            Self::SourceUrl(_) => "source-url".to_string(),
            Self::File(_) => "file".to_string(),
            Self::Tool(tool) => tool.tag(),
            Self::Other { kind, .. } => kind.clone(),
        }
    }

    /// Text content for text parts.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Decode a part from its JSON object.
    ///
    /// Unknown tags and malformed bodies become [`Part::Other`] instead of
    /// failing, so a single odd part never breaks a whole conversation.
    /// Any `tool-` tag always yields [`Part::Tool`]. Only a missing or
    /// non-string `type` tag is rejected.
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let kind = match raw.get("type").and_then(Value::as_str) {
            Some(kind) => kind.to_string(),
            None => {
                return Err(serde::de::Error::custom(
                    "message part is missing a string `type` tag",
                ));
            }
        };

        let decoded = match kind.as_str() {
            "text" => serde_json::from_value::<TextBody>(raw.clone()).map(|b| Self::Text { text: b.text }),
            "reasoning" => {
                serde_json::from_value::<TextBody>(raw.clone()).map(|b| Self::Reasoning { text: b.text })
            }
            "source-url" => serde_json::from_value(raw.clone()).map(Self::SourceUrl),
            "file" => serde_json::from_value(raw.clone()).map(Self::File),
            tag if tag.starts_with(TOOL_PREFIX) => {
                return Ok(Self::Tool(ToolPart::from_raw(&tag[TOOL_PREFIX.len()..], &raw)));
            }
            _ => return Ok(Self::Other { kind, raw }),
        };

        Ok(decoded.unwrap_or_else(|e| {
            tracing::debug!(part_type = %kind, error = %e, "Keeping malformed part as opaque");
            Self::Other { kind, raw }
        }))
    }

    /// Encode this part as its JSON object.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = match self {
            Self::Text { text } | Self::Reasoning { text } => {
                serde_json::to_value(TextBody { text: text.clone() })?
            }
            Self::SourceUrl(source) => serde_json::to_value(source)?,
            Self::File(file) => serde_json::to_value(file)?,
            Self::Tool(tool) => serde_json::to_value(ToolBody {
                tool_call_id: &tool.tool_call_id,
                state: &tool.state,
                input: &tool.input,
                output: tool.output.as_ref(),
                error_text: tool.error_text.as_deref(),
            })?,
            Self::Other { raw, .. } => return Ok(raw.clone()),
        };

        if let Value::Object(map) = &mut value {
            map.insert("type".to_string(), Value::String(self.tag()));
        }
        Ok(value)
    }
}

impl Serialize for Part {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(serde::de::Error::custom)
    }
}
