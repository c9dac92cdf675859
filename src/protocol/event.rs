//! Event message types.
//!
//! Events are unsolicited notifications pushed by the browser. Session
//! scoped events (e.g. `Page.frameNavigated`) carry the `sessionId` of the
//! target they belong to; `Target.*` lifecycle events are browser-level.
//!
//! # Lifecycle Events
//!
//! | Method | Meaning |
//! |--------|---------|
//! | `Target.detachedFromTarget` | A flat session was closed (by us, the user or the browser) |
//! | `Target.targetDestroyed` | The tab no longer exists |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::{SessionId, TargetId};

// ============================================================================
// Event
// ============================================================================

/// An event notification from the browser.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... },
///   "sessionId": "8E1C..."
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,

    /// Session the event was emitted on (absent for browser-level events).
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

impl Event {
    /// Returns the domain name from the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let event = Event { method: "Page.loadEventFired".into(), .. };
    /// assert_eq!(event.domain(), "Page");
    /// ```
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "Target.detachedFromTarget" => {
                let Some(session_id) = self.str_param("sessionId") else {
                    return ParsedEvent::Other;
                };
                ParsedEvent::DetachedFromTarget {
                    session_id: SessionId::new(session_id),
                    target_id: self.str_param("targetId").map(TargetId::new),
                }
            }
            "Target.targetDestroyed" => match self.str_param("targetId") {
                Some(target_id) => ParsedEvent::TargetDestroyed {
                    target_id: TargetId::new(target_id),
                },
                None => ParsedEvent::Other,
            },
            _ => ParsedEvent::Other,
        }
    }

    /// Gets a string parameter.
    fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Lifecycle events the backend reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    /// A flat session was detached.
    DetachedFromTarget {
        /// The closed session.
        session_id: SessionId,
        /// Target of the session (newer browsers omit it).
        target_id: Option<TargetId>,
    },

    /// A target was destroyed.
    TargetDestroyed {
        /// The destroyed target.
        target_id: TargetId,
    },

    /// Any other event; routed to the message log as-is.
    Other,
}

// ============================================================================
// Tests
// ============================================================================
