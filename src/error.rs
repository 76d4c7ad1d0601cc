//! Error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced by the chat session and HTTP layer.
#[derive(Error, Debug)]
pub enum ChatError {
    /// No session with this id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The requested model is not in the catalog.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Regenerate was requested without a user turn to answer.
    #[error("nothing to regenerate")]
    NothingToRegenerate,

    /// A tool rejected its input or failed.
    #[error("tool `{name}` failed: {message}")]
    Tool {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// The agent could not start a run.
    #[error("agent failed: {0}")]
    Agent(String),
}

impl ChatError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "session_not_found",
            Self::UnknownModel(_) => "unknown_model",
            Self::NothingToRegenerate => "nothing_to_regenerate",
            Self::Tool { .. } => "tool_failed",
            Self::Agent(_) => "agent_failed",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::UnknownModel(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NothingToRegenerate => StatusCode::CONFLICT,
            Self::Tool { .. } | Self::Agent(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Result alias for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ChatError::SessionNotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ChatError::UnknownModel("m".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ChatError::NothingToRegenerate.code(), "nothing_to_regenerate");
    }

    #[test]
    fn test_tool_error_message() {
        let err = ChatError::Tool {
            name: "calc".into(),
            message: "missing field `a`".into(),
        };
        assert_eq!(err.to_string(), "tool `calc` failed: missing field `a`");
    }
}
