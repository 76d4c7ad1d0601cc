//! Streaming tail detection.

use crate::conversation::{ChatStatus, Message};

/// Whether `part_index` of `message` is the live tail of an in-progress
/// response.
///
/// Holds only while the conversation is streaming, the message is the most
/// recently appended one and the part is its most recent part. As soon as
/// any of these stops holding the part is considered complete.
#[must_use]
pub fn is_streaming_tail(
    message: &Message,
    part_index: usize,
    status: ChatStatus,
    last_message_id: Option<&str>,
) -> bool {
    status == ChatStatus::Streaming
        && last_message_id == Some(message.id.as_str())
        && message.last_part_index() == Some(part_index)
}
