//! Source citation grouping.

use serde::Serialize;

use crate::conversation::{Message, Part, Role};

/// A cited source. The URL doubles as identifier and display title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    /// Link target.
    pub url: String,
}

impl Source {
    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.url
    }
}

/// Collect the `source-url` parts of an assistant message in order.
///
/// Repeated URLs are kept; user and system messages have no sources.
#[must_use]
pub fn sources(message: &Message) -> Vec<Source> {
    if message.role != Role::Assistant {
        return Vec::new();
    }

    message
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::SourceUrl(source) => Some(Source {
                url: source.url.clone(),
            }),
            _ => None,
        })
        .collect()
}
