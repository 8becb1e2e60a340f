//! Conversational memory: a bounded, in-process window of recent turns.
//!
//! - **Ordered**: turns are kept oldest first
//! - **Bounded**: never holds more than `capacity` turns
//! - **Pair-aligned**: [`ConversationMemory::record_exchange`] drops whole
//!   exchanges, so the window always starts with a user turn
//! - **Volatile**: nothing is persisted; cleared on shutdown

use std::collections::VecDeque;

use aide_core::message::{Role, Turn};

/// Smallest capacity that still holds one exchange.
pub const MIN_CAPACITY: usize = 2;

#[derive(Debug, Clone)]
pub struct ConversationMemory {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationMemory {
    /// Create an empty memory holding at most `capacity` turns
    /// (raised to [`MIN_CAPACITY`] if smaller).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            turns: VecDeque::new(),
            capacity,
        }
    }

    /// Append one turn, evicting the oldest turns beyond capacity.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    /// Record one completed exchange, evicting the oldest turns if needed.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.append(Turn::user(question));
        self.append(Turn::assistant(answer));

        // An assistant turn without its question is noise
        while self
            .turns
            .front()
            .is_some_and(|turn| turn.role() != Role::User)
        {
            self.turns.pop_front();
        }
    }

    /// Copy of the current window, oldest first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
