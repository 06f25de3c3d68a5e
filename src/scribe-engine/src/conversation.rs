//! Append-only message store for one chat session.
//!
//! The store is the single owner of the turn list. All mutation goes
//! through its methods, which uphold the session invariants: at most one
//! turn is streaming at a time and it is always the last one; a user turn
//! is immediately followed by its paired assistant turn; content only grows
//! while a turn is streaming. Readers get `&[ChatTurn]` snapshots and never
//! mutate.

use scribe_protocol::{ChatTurn, SessionId, TurnStatus};

use crate::error::{Result, ScribeError};

/// State of one chat session: identity plus the ordered turn list.
///
/// The active turn is tracked by an explicit index rather than the
/// "last element" convention, so extending the model cannot silently
/// redirect mutation to the wrong entry.
#[derive(Debug, Default)]
pub struct ChatSession {
    id: Option<SessionId>,
    turns: Vec<ChatTurn>,
    active: Option<usize>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The server-assigned session identifier, once known.
    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// Store the server-assigned identifier. Write-once: a second call with
    /// a different value is ignored and logged, never applied.
    pub fn set_id(&mut self, id: SessionId) {
        match &self.id {
            None => self.id = Some(id),
            Some(existing) if *existing == id => {}
            Some(existing) => {
                tracing::warn!(%existing, attempted = %id, "ignoring session id rebind");
            }
        }
    }

    /// Read snapshot of all turns.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Loading predicate: whether an assistant turn is currently streaming.
    pub fn is_streaming(&self) -> bool {
        self.active_turn()
            .map(|t| t.status.is_streaming())
            .unwrap_or(false)
    }

    /// The turn currently receiving deltas, if any.
    pub fn active_turn(&self) -> Option<&ChatTurn> {
        self.active.and_then(|i| self.turns.get(i))
    }

    /// Append a completed user turn and its streaming assistant
    /// placeholder, in that order. Fails if an exchange is already in
    /// flight.
    pub fn begin_exchange(&mut self, text: &str) -> Result<()> {
        if self.is_streaming() {
            return Err(ScribeError::Validation(
                "an exchange is already streaming".to_string(),
            ));
        }
        self.turns.push(ChatTurn::user(text));
        self.turns.push(ChatTurn::assistant_placeholder());
        self.active = Some(self.turns.len() - 1);
        Ok(())
    }

    /// Append a delta to the active turn's content.
    pub fn append_delta(&mut self, delta: &str) -> Result<()> {
        let turn = self.active_turn_mut()?;
        turn.content.push_str(delta);
        Ok(())
    }

    /// Mark the active turn complete and release the handle.
    pub fn finish_active(&mut self) -> Result<()> {
        let turn = self.active_turn_mut()?;
        turn.status = TurnStatus::Complete;
        self.active = None;
        Ok(())
    }

    /// Mark the active turn errored and release the handle. Content
    /// received so far is kept; there is no rollback.
    pub fn fail_active(&mut self) -> Result<()> {
        let turn = self.active_turn_mut()?;
        turn.status = TurnStatus::Errored;
        self.active = None;
        Ok(())
    }

    fn active_turn_mut(&mut self) -> Result<&mut ChatTurn> {
        let idx = self.active.ok_or_else(|| {
            ScribeError::Validation("no turn is currently streaming".to_string())
        })?;
        self.turns
            .get_mut(idx)
            .ok_or_else(|| ScribeError::Validation("active turn out of range".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use scribe_protocol::Role;

    use super::*;

    #[test]
    fn test_begin_exchange_appends_pair_in_order() {
        let mut session = ChatSession::new();
        session.begin_exchange("hello").expect("begin");

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[1].role, Role::Assistant);
        assert!(turns[1].status.is_streaming());
        assert!(session.is_streaming());
    }

    #[test]
    fn test_begin_exchange_rejected_while_streaming() {
        let mut session = ChatSession::new();
        session.begin_exchange("first").expect("begin");
        assert!(session.begin_exchange("second").is_err());
        assert_eq!(session.turns().len(), 2);
    }

    #[test]
    fn test_deltas_accumulate_and_finish() {
        let mut session = ChatSession::new();
        session.begin_exchange("hi").expect("begin");
        for delta in ["Hel", "lo", " world"] {
            session.append_delta(delta).expect("delta");
        }
        session.finish_active().expect("finish");

        let last = session.turns().last().expect("assistant turn");
        assert_eq!(last.content, "Hello world");
        assert_eq!(last.status, TurnStatus::Complete);
        assert!(!session.is_streaming());
    }

    #[test]
    fn test_fail_keeps_partial_content() {
        let mut session = ChatSession::new();
        session.begin_exchange("hi").expect("begin");
        session.append_delta("Par").expect("delta");
        session.append_delta("tial").expect("delta");
        session.fail_active().expect("fail");

        let last = session.turns().last().expect("assistant turn");
        assert_eq!(last.content, "Partial");
        assert_eq!(last.status, TurnStatus::Errored);
    }

    #[test]
    fn test_delta_without_active_turn_is_rejected() {
        let mut session = ChatSession::new();
        assert!(session.append_delta("x").is_err());
    }

    #[test]
    fn test_session_id_is_write_once() {
        let mut session = ChatSession::new();
        session.set_id(SessionId::new("s-1"));
        session.set_id(SessionId::new("s-2"));
        assert_eq!(session.id().map(SessionId::as_str), Some("s-1"));
    }
}
