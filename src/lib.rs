//! Agent Chat View
//!
//! A streaming chat interface over an agent that reasons, cites sources and
//! calls tools. Conversations are plain data; rendering them is a pure
//! function of a snapshot, and the server ships the rendered HTML to the
//! browser over SSE whenever the snapshot changes.
//!
//! # Architecture
//!
//! - **Model**: typed messages and parts, immutable snapshots
//! - **Render**: part classification, streaming and action rules, source grouping
//! - **Session**: in-memory conversations driven by an [`agent::Agent`]
//! - **Server**: Axum routes, SSE view stream, HTML fragments
//!
//! # Modules
//!
//! - [`conversation`]: messages, parts, chat status, snapshots
//! - [`render`]: snapshot to view model
//! - [`compose`]: prompt submission
//! - [`agent`]: agents and tools
//! - [`session`]: conversation and session management
//! - [`ui`]: HTML rendering
//! - [`server`]: HTTP routes

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod agent;
pub mod compose;
pub mod config;
pub mod conversation;
pub mod error;
pub mod render;
pub mod server;
pub mod session;
pub mod ui;

use std::sync::Arc;

use crate::agent::ToolSet;
use crate::config::AppConfig;
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session store for conversation management.
    pub sessions: SessionStore,
    /// Tools the agent may call.
    pub tools: ToolSet,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
