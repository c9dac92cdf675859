//! Bounded per-target message log with live broadcast.
//!
//! Every outgoing command, incoming result/error and unsolicited event is
//! appended here, keyed by target. Each target's buffer keeps at most
//! `capacity` entries and evicts the oldest first.
//!
//! Appends are published on a [`broadcast`] channel. Having no subscriber,
//! or a subscriber that lags behind, is a normal state and never affects
//! the append.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::identifiers::TargetId;
use crate::protocol::{Direction, Message};

// ============================================================================
// Constants
// ============================================================================

/// Default per-target entry cap.
pub const DEFAULT_LOG_CAPACITY: usize = 100_000;

/// Slots in the broadcast ring; slow subscribers skip ahead past this.
const BROADCAST_CAPACITY: usize = 1024;

// ============================================================================
// MessageFilter
// ============================================================================

/// Direction selector for [`MessageFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionFilter {
    /// Both directions.
    #[default]
    All,
    /// Commands only.
    Outgoing,
    /// Results, errors and events only.
    Incoming,
}

/// Query over a target's messages.
///
/// `search` is matched case-insensitively against the method name and the
/// JSON text of `params` and `result`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFilter {
    /// Direction selector.
    #[serde(default)]
    pub direction: DirectionFilter,
    /// Free-text search term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl MessageFilter {
    /// Creates a filter matching everything.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one direction.
    #[inline]
    #[must_use]
    pub fn with_direction(mut self, direction: DirectionFilter) -> Self {
        self.direction = direction;
        self
    }

    /// Adds a search term. Empty terms match everything.
    #[inline]
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.is_empty()).then(|| search.to_lowercase());
        self
    }

    /// Returns `true` if `message` passes the filter.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        let direction_ok = match self.direction {
            DirectionFilter::All => true,
            DirectionFilter::Outgoing => message.direction == Direction::Outgoing,
            DirectionFilter::Incoming => message.direction == Direction::Incoming,
        };
        if !direction_ok {
            return false;
        }

        let Some(term) = self.search.as_deref() else {
            return true;
        };
        let term = term.to_lowercase();

        message.method.to_lowercase().contains(&term)
            || [&message.params, &message.result]
                .into_iter()
                .flatten()
                .any(|value| value.to_string().to_lowercase().contains(&term))
    }
}

// ============================================================================
// MessageLog
// ============================================================================

/// Per-target ring buffers of [`Message`]s.
pub struct MessageLog {
    /// Buffers by target.
    buffers: Mutex<FxHashMap<TargetId, VecDeque<Message>>>,
    /// Per-target cap.
    capacity: usize,
    /// Live feed of appended messages.
    feed: broadcast::Sender<Message>,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl MessageLog {
    /// Creates a log with the given per-target cap (at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            buffers: Mutex::new(FxHashMap::default()),
            capacity: capacity.max(1),
            feed,
        }
    }

    /// Returns the per-target cap.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a message and publishes it to subscribers.
    pub fn append(&self, target_id: &TargetId, message: Message) {
        {
            let mut buffers = self.buffers.lock();
            let buffer = buffers.entry(target_id.clone()).or_default();
            buffer.push_back(message.clone());
            if buffer.len() > self.capacity {
                buffer.pop_front();
            }
        }

        trace!(
            target_id = %target_id,
            method = %message.method,
            direction = ?message.direction,
            "Message logged"
        );

        // No subscriber is not an error.
        let _ = self.feed.send(message);
    }

    /// Returns a snapshot of a target's messages, oldest first.
    #[must_use]
    pub fn get(&self, target_id: &TargetId) -> Vec<Message> {
        self.buffers
            .lock()
            .get(target_id)
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns a filtered snapshot of a target's messages.
    #[must_use]
    pub fn query(&self, target_id: &TargetId, filter: &MessageFilter) -> Vec<Message> {
        self.buffers
            .lock()
            .get(target_id)
            .map(|buffer| {
                buffer
                    .iter()
                    .filter(|message| filter.matches(message))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns every target's messages merged by timestamp.
    ///
    /// The sort is stable, so each target's own order is preserved.
    #[must_use]
    pub fn get_all(&self) -> Vec<Message> {
        let mut all: Vec<Message> = self
            .buffers
            .lock()
            .values()
            .flat_map(|buffer| buffer.iter().cloned())
            .collect();
        all.sort_by_key(|message| message.timestamp);
        all
    }

    /// Returns the number of messages held for a target.
    #[must_use]
    pub fn len(&self, target_id: &TargetId) -> usize {
        self.buffers.lock().get(target_id).map_or(0, VecDeque::len)
    }

    /// Returns `true` if no target has any message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.lock().values().all(VecDeque::is_empty)
    }

    /// Clears one target's buffer, or every buffer when `target_id` is `None`.
    pub fn clear(&self, target_id: Option<&TargetId>) {
        let mut buffers = self.buffers.lock();
        match target_id {
            Some(target_id) => {
                buffers.remove(target_id);
            }
            None => buffers.clear(),
        }
    }

    /// Subscribes to the live feed of appended messages.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.feed.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
