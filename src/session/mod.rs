//! Session and conversation thread management.
//!
//! Sessions hold the message history and chat status of one conversation in
//! memory. They receive user turns through [`ChatBackend`](crate::compose::ChatBackend),
//! run the agent in the background and publish a new snapshot after every
//! agent event.
//!
//! # Architecture
//!
//! - [`ChatSession`]: a single conversation
//! - [`SessionStore`]: thread-safe store for all active sessions
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use agent_chat_view::agent::LocalAgent;
//! use agent_chat_view::session::SessionStore;
//!
//! let store = SessionStore::new(Arc::new(LocalAgent::default()));
//! let session = store.create();
//!
//! assert!(session.snapshot().is_empty());
//! assert_eq!(store.len(), 1);
//! ```

mod thread;

pub use thread::{ChatSession, DEFAULT_SESSION_TIMEOUT, SessionStore};
