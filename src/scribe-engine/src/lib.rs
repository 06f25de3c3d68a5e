//! Core business logic for the Scribe assistant.
//!
//! The centerpiece is the streaming chat pipeline: the SSE frame decoder
//! ([`sse`]), the append-only message store ([`conversation`]) and the
//! session controller ([`session`]) that ties submission, session identity
//! and stream consumption together. The [`client`] and [`templates`]
//! modules hold the HTTP collaborators the pipeline talks to.

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod session;
pub mod sse;
pub mod templates;

pub use client::{ChatBackend, ChatClient, FrameStream};
pub use config::ScribeConfig;
pub use conversation::ChatSession;
pub use error::{Result, ScribeError};
pub use session::{SessionController, SessionUpdate};
pub use templates::{TemplatesClient, combine_chunks};
