//! crates/onboarding_core/src/conversation.rs
//!
//! The conversation log of a session. Turns are only ever appended; the web
//! layer publishes the turns added since a remembered position, and a report
//! keeps a snapshot of the log taken when the session completes.

use crate::domain::ConversationTurn;

/// Ordered, append-only record of the turns exchanged in one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn all(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.clone()
    }

    /// Turns appended after the log had `mark` entries.
    pub fn since(&self, mark: usize) -> &[ConversationTurn] {
        self.turns.get(mark..).unwrap_or_default()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Only used when a session is restarted.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
