//! Shared types for the Scribe assistant.
//!
//! This crate defines the domain types exchanged between the engine and the
//! UI (chat turns, stream frames) and the wire types of the two consumed
//! backends (chat sessions, templates).

pub mod session_id;
pub mod templates;
pub mod turns;

pub use session_id::SessionId;
pub use templates::{DetailRecord, TemplateChunk, TemplateSummary};
pub use turns::{ChatTurn, Role, StreamFrame, TurnStatus};
