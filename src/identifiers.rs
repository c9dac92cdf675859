//! Type-safe identifiers for debugging entities.
//!
//! Newtype wrappers keep target ids, CDP session ids and request ids from
//! being mixed up at compile time.
//!
//! | Type | Wraps | Source |
//! |------|-------|--------|
//! | [`TargetId`] | `String` | Browser (`Target.getTargets`, tab id) |
//! | [`SessionId`] | `String` | `Target.attachToTarget` |
//! | [`RequestId`] | `u64` | Local counter, CDP message `id` |
//! | [`LogicalFrameId`] | `"main"` / `"frame-<n>"` | Frame discovery |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

// ============================================================================
// Constants
// ============================================================================

/// Logical id of the top-level document.
const MAIN_FRAME: &str = "main";

/// Prefix of logical ids for nested frames.
const CHILD_FRAME_PREFIX: &str = "frame-";

/// Global request counter. CDP ids only need to be unique per connection.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// TargetId
// ============================================================================

/// Identifier of a debuggable surface (a browser tab).
///
/// Serializes as a string. Deserializes from a string or from a numeric
/// tab id, which front-ends commonly send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    /// Creates a target id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TargetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for TargetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(id) => Self(id),
            Raw::Number(id) => Self(id.to_string()),
        })
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// CDP flat-session identifier returned by `Target.attachToTarget`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// CDP message id used for request/response correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Returns the next unused request id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw id (used when parsing responses).
    #[inline]
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// LogicalFrameId
// ============================================================================

/// Caller-facing frame reference.
///
/// Either the top-level document (`"main"`) or the n-th nested frame in
/// pre-order traversal order, root excluded (`"frame-<n>"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogicalFrameId {
    /// The root frame.
    #[default]
    Main,
    /// Zero-based pre-order index among child frames.
    Child(usize),
}

impl LogicalFrameId {
    /// Returns `true` for the root frame.
    #[inline]
    #[must_use]
    pub fn is_main(&self) -> bool {
        matches!(self, Self::Main)
    }

    /// Returns the child index, if any.
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Main => None,
            Self::Child(index) => Some(*index),
        }
    }
}

impl fmt::Display for LogicalFrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str(MAIN_FRAME),
            Self::Child(index) => write!(f, "{CHILD_FRAME_PREFIX}{index}"),
        }
    }
}

impl FromStr for LogicalFrameId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == MAIN_FRAME {
            return Ok(Self::Main);
        }

        s.strip_prefix(CHILD_FRAME_PREFIX)
            .and_then(|index| index.parse::<usize>().ok())
            .map(Self::Child)
            .ok_or_else(|| Error::invalid_argument(format!("Invalid frame id: {s:?}")))
    }
}

impl Serialize for LogicalFrameId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LogicalFrameId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_increase() {
        let a = RequestId::next();
        let b = RequestId::next();
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_logical_frame_parse() {
        assert_eq!("main".parse::<LogicalFrameId>().unwrap(), LogicalFrameId::Main);
        assert_eq!(
            "frame-12".parse::<LogicalFrameId>().unwrap(),
            LogicalFrameId::Child(12)
        );
        assert!("frame-".parse::<LogicalFrameId>().is_err());
        assert!("frame--1".parse::<LogicalFrameId>().is_err());
        assert!("iframe-1".parse::<LogicalFrameId>().is_err());
    }

    #[test]
    fn test_logical_frame_display() {
        assert_eq!(LogicalFrameId::Main.to_string(), "main");
        assert_eq!(LogicalFrameId::Child(3).to_string(), "frame-3");
    }

    #[test]
    fn test_logical_frame_serde() {
        let json = serde_json::to_string(&LogicalFrameId::Child(2)).unwrap();
        assert_eq!(json, "\"frame-2\"");

        let parsed: LogicalFrameId = serde_json::from_str("\"main\"").unwrap();
        assert!(parsed.is_main());
        assert!(serde_json::from_str::<LogicalFrameId>("\"top\"").is_err());
    }

    #[test]
    fn test_target_id_display() {
        let id = TargetId::from("ABC123");
        assert_eq!(id.to_string(), "ABC123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ABC123\"");
    }

    #[test]
    fn test_target_id_from_numeric_tab_id() {
        let numeric: TargetId = serde_json::from_str("42").unwrap();
        assert_eq!(numeric, TargetId::from("42"));

        let text: TargetId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(text, numeric);

        assert!(serde_json::from_str::<TargetId>("-1").is_err());
        assert!(serde_json::from_str::<TargetId>("true").is_err());
    }
}
