//! Bounded, time-aware memory of recent turns.
//!
//! A FIFO ring of at most `limit` turns. Freshness is evaluated lazily when
//! the memory is read; nothing is evicted because of age.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};

use solace_core::config::MemoryConfig;
use solace_core::types::Turn;

// =============================================================================
// TurnMemory
// =============================================================================

/// Rolling memory of the most recent turns of one conversation.
#[derive(Debug, Clone)]
pub struct TurnMemory {
    turns: VecDeque<Turn>,
    limit: usize,
    expiry: TimeDelta,
}

impl TurnMemory {
    /// Create an empty memory holding at most `limit` turns, each fresh for `expiry`.
    pub fn new(limit: usize, expiry: TimeDelta) -> Self {
        Self {
            turns: VecDeque::with_capacity(limit),
            limit,
            expiry,
        }
    }

    /// Create an empty memory from the `[memory]` config section.
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(
            config.limit,
            TimeDelta::minutes(i64::from(config.expiry_minutes)),
        )
    }

    /// Append a turn, evicting the oldest ones once the limit is exceeded.
    pub fn record(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.limit {
            self.turns.pop_front();
        }
    }

    /// The most recently recorded turn.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    /// The last response, if the last turn is still fresh.
    pub fn fresh_last(&self) -> Option<&str> {
        self.fresh_last_at(Utc::now())
    }

    /// The last response, if `now - last.timestamp < expiry`.
    pub fn fresh_last_at(&self, now: DateTime<Utc>) -> Option<&str> {
        self.last()
            .filter(|turn| now.signed_duration_since(turn.timestamp) < self.expiry)
            .map(|turn| turn.response.as_str())
    }

    /// True iff the last turn's message equals `message`, ignoring case.
    ///
    /// Only the immediately preceding turn is compared.
    pub fn is_repeat(&self, message: &str) -> bool {
        self.last()
            .is_some_and(|turn| turn.user_message.to_lowercase() == message.to_lowercase())
    }

    /// Turns in insertion order, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn expiry(&self) -> TimeDelta {
        self.expiry
    }
}

impl Default for TurnMemory {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

// =============================================================================
// Tests
// =============================================================================
