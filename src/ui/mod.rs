//! HTML rendering.
//!
//! Views are plain `String`s built with `format!`, like the page shell.
//! Every dynamic value passes through [`text`] or [`attr`].
//!
//! # Structure
//!
//! - [`page`]: the document shell
//! - [`conversation`]: the conversation fragment streamed over SSE
//! - [`composer`]: the prompt form
//! - [`icons`]: inline SVG icons

pub mod composer;
pub mod conversation;
pub mod icons;
pub mod page;

pub use composer::composer;
pub use conversation::conversation_fragment;
pub use page::{chat_page, html_shell};

use std::borrow::Cow;

/// Escape text content.
///
/// Carriage returns become character references so the markup can travel
/// as SSE data.
#[must_use]
pub fn text(value: &str) -> Cow<'_, str> {
    strip_cr(html_escape::encode_text(value))
}

/// Escape a double-quoted attribute value.
#[must_use]
pub fn attr(value: &str) -> Cow<'_, str> {
    strip_cr(html_escape::encode_double_quoted_attribute(value))
}

fn strip_cr(value: Cow<'_, str>) -> Cow<'_, str> {
    if value.contains('\r') {
        Cow::Owned(value.replace('\r', "&#13;"))
    } else {
        value
    }
}
