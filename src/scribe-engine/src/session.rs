//! Streaming session controller.
//!
//! Owns the chat session state, the pending-input draft and the
//! request/consume loop. All mutation happens on the owner's task: the
//! spawned worker only performs network I/O and reports back through
//! [`SessionUpdate`] messages, which the owner applies one at a time. That
//! keeps the single-writer invariant on the session while deltas stay
//! progressively observable between suspensions.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scribe_protocol::{SessionId, StreamFrame};

use crate::client::ChatBackend;
use crate::conversation::ChatSession;
use crate::error::Result;

/// State change reported by the streaming worker.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// The server minted a session identifier.
    SessionCreated(SessionId),
    /// One decoded text delta for the in-flight assistant turn.
    Delta(String),
    /// The stream ended naturally.
    Completed,
    /// The exchange failed; the in-flight turn keeps its partial content.
    Failed(String),
}

enum Finished {
    Done,
    Cancelled,
}

/// Controller for one chat session.
pub struct SessionController {
    session: ChatSession,
    draft: String,
    backend: Arc<dyn ChatBackend>,
    updates_tx: mpsc::UnboundedSender<SessionUpdate>,
    cancel: CancellationToken,
}

impl SessionController {
    /// Create a controller and the update channel its workers report on.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        (
            Self {
                session: ChatSession::new(),
                draft: String::new(),
                backend,
                updates_tx,
                cancel: CancellationToken::new(),
            },
            updates_rx,
        )
    }

    /// Read access to the session state.
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// The pending-input buffer.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn push_draft_char(&mut self, c: char) {
        self.draft.push(c);
    }

    pub fn pop_draft_char(&mut self) {
        self.draft.pop();
    }

    /// Loading predicate derived from the active turn's status.
    pub fn is_streaming(&self) -> bool {
        self.session.is_streaming()
    }

    /// Submit the current draft.
    ///
    /// No-op (returns false) when the trimmed draft is empty or a turn is
    /// already streaming. Otherwise appends the user turn and the streaming
    /// assistant placeholder, clears the draft, and spawns the worker that
    /// acquires the session identifier (at most once per session) and
    /// consumes the response stream.
    pub fn submit(&mut self) -> bool {
        let text = self.draft.trim().to_string();
        if text.is_empty() || self.session.is_streaming() {
            return false;
        }
        if let Err(err) = self.session.begin_exchange(&text) {
            tracing::warn!(%err, "exchange rejected");
            return false;
        }
        self.draft.clear();

        let backend = Arc::clone(&self.backend);
        let existing = self.session.id().cloned();
        let tx = self.updates_tx.clone();
        let cancel = self.cancel.child_token();
        tokio::spawn(run_exchange(backend, existing, text, tx, cancel));
        true
    }

    /// Apply one worker update to the session. Each call is atomic from
    /// the observer's point of view: state is never seen mid-delta.
    pub fn apply(&mut self, update: SessionUpdate) {
        let outcome = match update {
            SessionUpdate::SessionCreated(id) => {
                self.session.set_id(id);
                Ok(())
            }
            SessionUpdate::Delta(delta) => self.session.append_delta(&delta),
            SessionUpdate::Completed => self.session.finish_active(),
            SessionUpdate::Failed(reason) => {
                tracing::warn!(%reason, "exchange failed");
                self.session.fail_active()
            }
        };
        if let Err(err) = outcome {
            tracing::warn!(%err, "dropped stale session update");
        }
    }

    /// Stop consuming and release the transport. Safe to call more than
    /// once; in-flight workers observe the token and exit without reporting.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// One full exchange: acquire identity if needed, send, consume.
async fn run_exchange(
    backend: Arc<dyn ChatBackend>,
    existing: Option<SessionId>,
    text: String,
    tx: mpsc::UnboundedSender<SessionUpdate>,
    cancel: CancellationToken,
) {
    match drive_exchange(backend, existing, text, &tx, &cancel).await {
        Ok(Finished::Done) => {
            let _ = tx.send(SessionUpdate::Completed);
        }
        Ok(Finished::Cancelled) => {}
        Err(err) => {
            let _ = tx.send(SessionUpdate::Failed(err.to_string()));
        }
    }
}

async fn drive_exchange(
    backend: Arc<dyn ChatBackend>,
    existing: Option<SessionId>,
    text: String,
    tx: &mpsc::UnboundedSender<SessionUpdate>,
    cancel: &CancellationToken,
) -> Result<Finished> {
    let session_id = match existing {
        Some(id) => id,
        None => {
            let id = tokio::select! {
                _ = cancel.cancelled() => return Ok(Finished::Cancelled),
                created = backend.create_session() => created?,
            };
            let _ = tx.send(SessionUpdate::SessionCreated(id.clone()));
            id
        }
    };

    let mut stream = tokio::select! {
        _ = cancel.cancelled() => return Ok(Finished::Cancelled),
        sent = backend.send_message(&session_id, &text) => sent?,
    };

    // Single suspension point per frame; dropping the stream on
    // cancellation releases the transport.
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return Ok(Finished::Cancelled),
            frame = stream.next() => frame,
        };
        match frame {
            Some(Ok(StreamFrame::Delta(delta))) => {
                if tx.send(SessionUpdate::Delta(delta)).is_err() {
                    return Ok(Finished::Cancelled);
                }
            }
            Some(Ok(StreamFrame::End)) | None => return Ok(Finished::Done),
            Some(Err(err)) => return Err(err),
        }
    }
}
