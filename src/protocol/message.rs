//! Logged units of protocol traffic.
//!
//! A [`Message`] is one entry in the per-target message log: an outgoing
//! command, the incoming result or error for it, or an unsolicited event.
//! The serialized layout is also the export format.
//!
//! # Format
//!
//! ```json
//! {
//!   "direction": "incoming",
//!   "method": "Page.frameNavigated",
//!   "result": { ... },
//!   "timestamp": 1760000000000,
//!   "isEvent": true,
//!   "targetId": "A1B2"
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::identifiers::TargetId;

// ============================================================================
// Direction
// ============================================================================

/// Which way a message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Command sent to the browser.
    Outgoing,
    /// Result, error or event received from the browser.
    Incoming,
}

// ============================================================================
// Message
// ============================================================================

/// Immutable record of one piece of protocol traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Direction of travel.
    pub direction: Direction,

    /// CDP method or event name.
    pub method: String,

    /// Command parameters (outgoing only).
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub params: Option<Value>,

    /// Command result or event payload (incoming only).
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,

    /// Error text of a failed command (incoming only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,

    /// `true` for unsolicited events.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_event: bool,

    /// Target the traffic belongs to.
    pub target_id: TargetId,
}

impl Message {
    /// Creates an outgoing command entry.
    #[must_use]
    pub fn outgoing(target_id: TargetId, method: impl Into<String>, params: Value) -> Self {
        Self {
            direction: Direction::Outgoing,
            method: method.into(),
            params: Some(params),
            result: None,
            error: None,
            timestamp: now_millis(),
            is_event: false,
            target_id,
        }
    }

    /// Creates an incoming result entry.
    #[must_use]
    pub fn result(target_id: TargetId, method: impl Into<String>, result: Value) -> Self {
        Self {
            direction: Direction::Incoming,
            method: method.into(),
            params: None,
            result: Some(result),
            error: None,
            timestamp: now_millis(),
            is_event: false,
            target_id,
        }
    }

    /// Creates an incoming error entry.
    #[must_use]
    pub fn error(target_id: TargetId, method: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            direction: Direction::Incoming,
            method: method.into(),
            params: None,
            result: None,
            error: Some(error.into()),
            timestamp: now_millis(),
            is_event: false,
            target_id,
        }
    }

    /// Creates an unsolicited event entry.
    ///
    /// The event params are stored under `result`.
    #[must_use]
    pub fn event(target_id: TargetId, method: impl Into<String>, params: Value) -> Self {
        Self {
            is_event: true,
            ..Self::result(target_id, method, params)
        }
    }

    /// Returns `true` if this entry records a failed command.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Current wall-clock time in milliseconds.
fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Keeps an explicit `null` as `Some(Value::Null)` so that entries survive
/// an export/import round trip unchanged.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// ============================================================================
// Tests
// ============================================================================
