//! Request and Response message types.
//!
//! Defines the CDP wire format for commands sent to the browser and the
//! responses correlated to them by `id`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SessionId};

// ============================================================================
// Request
// ============================================================================

/// A command request from local end to the browser.
///
/// # Format
///
/// ```json
/// {
///   "id": 7,
///   "method": "Domain.methodName",
///   "params": { ... },
///   "sessionId": "8E1C..."
/// }
/// ```
///
/// `sessionId` is omitted for browser-level commands (`Target.*`, `Browser.*`).
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Command name in `Domain.methodName` format.
    pub method: String,

    /// Command parameters (always an object on the wire).
    pub params: Value,

    /// Flat session the command is routed to.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl Request {
    /// Creates a browser-level request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            id: RequestId::next(),
            method: method.into(),
            params: normalize_params(params),
            session_id: None,
        }
    }

    /// Creates a session-scoped request with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn for_session(session_id: SessionId, method: impl Into<String>, params: Value) -> Self {
        Self {
            session_id: Some(session_id),
            ..Self::new(method, params)
        }
    }
}

/// CDP rejects `null` params; an empty object is the neutral value.
fn normalize_params(params: Value) -> Value {
    if params.is_null() {
        Value::Object(Map::new())
    } else {
        params
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from the browser.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 7, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 7, "error": { "code": -32601, "message": "'Foo.bar' wasn't found" } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error object (if error).
    #[serde(default)]
    pub error: Option<ProtocolError>,

    /// Session the response belongs to.
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] carrying the CDP error object.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(Error::command(error.code, error.message)),
            None => Ok(self.result.unwrap_or_else(|| Value::Object(Map::new()))),
        }
    }
}

// ============================================================================
// ProtocolError
// ============================================================================

/// CDP error object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtocolError {
    /// JSON-RPC style error code.
    pub code: i64,
    /// Human readable message.
    pub message: String,
}

// ============================================================================
// Tests
// ============================================================================
