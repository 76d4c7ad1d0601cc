//! Message-part rendering rules.
//!
//! Turns a [`ConversationSnapshot`](crate::conversation::ConversationSnapshot)
//! into a [`ConversationView`]. Every function here is pure and synchronous;
//! markup lives in [`crate::ui`].
//!
//! # Structure
//!
//! - [`classify`]: what block a part becomes
//! - [`streaming`]: which part is the live tail of a response
//! - [`actions`]: where retry and copy are offered
//! - [`sources`]: grouped citations
//! - [`view`]: composition into a view model

pub mod actions;
pub mod classify;
pub mod sources;
pub mod streaming;
pub mod view;

pub use actions::{MessageAction, show_actions};
pub use classify::{RenderPlan, ToolOutcome, ToolTrace, classify};
pub use sources::{Source, sources};
pub use streaming::is_streaming_tail;
pub use view::{Block, ConversationView, MessageView, SourcesView, render_conversation};
