//! Error types for the CDP inspector.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cdp_inspector::{Error, Result};
//!
//! async fn example(inspector: &Inspector) -> Result<()> {
//!     let target = TargetId::from("A1B2");
//!     inspector
//!         .execute(&target, LogicalFrameId::Main, "Page.reload", json!({}))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidArgument`], [`Error::Command`] |
//! | Session | [`Error::Attach`], [`Error::AlreadyAttached`], [`Error::SessionNotFound`], [`Error::Detach`] |
//! | Frames | [`Error::FrameNotFound`] |
//! | Batches | [`Error::BatchParse`] |
//! | Execution | [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{LogicalFrameId, RequestId, TargetId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when inspector options or the endpoint are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Invalid argument supplied by the caller.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Protocol violation or unexpected response shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The browser rejected a command.
    ///
    /// Carries the CDP error object verbatim. This is what gets logged as
    /// the incoming error entry.
    #[error("{message}")]
    Command {
        /// CDP error code (e.g. `-32601` for an unknown method).
        code: i64,
        /// CDP error message.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Attaching a debugger session failed.
    ///
    /// The session remains unattached.
    #[error("Failed to attach to target {target_id}: {message}")]
    Attach {
        /// Target the attach was attempted on.
        target_id: TargetId,
        /// Reason reported by the backend.
        message: String,
    },

    /// Another controller already holds the debugging session.
    ///
    /// Not user-visible: the registry treats it as a successful attach.
    #[error("Another debugger is already attached to target {target_id}")]
    AlreadyAttached {
        /// The target that is already being debugged.
        target_id: TargetId,
    },

    /// No debugger session exists for the target.
    #[error("No session for target: {target_id}")]
    SessionNotFound {
        /// The target without a session.
        target_id: TargetId,
    },

    /// Detaching a debugger session failed.
    ///
    /// Logged and skipped during bulk detach, never escalated.
    #[error("Failed to detach from target {target_id}: {message}")]
    Detach {
        /// Target the detach was attempted on.
        target_id: TargetId,
        /// Reason reported by the backend.
        message: String,
    },

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Logical frame id does not map to any frame in the tree.
    #[error("Frame not found: {frame_id} in target {target_id}")]
    FrameNotFound {
        /// Target whose frame tree was searched.
        target_id: TargetId,
        /// The unresolved logical frame id.
        frame_id: LogicalFrameId,
    },

    // ========================================================================
    // Batch Errors
    // ========================================================================
    /// Malformed batch text.
    ///
    /// Returned before any command of the batch runs.
    #[error("Invalid batch at {command}: {message}")]
    BatchParse {
        /// Offending command (method name) or line.
        command: String,
        /// What was wrong with it.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Command request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a command error from a CDP error object.
    #[inline]
    pub fn command(code: i64, message: impl Into<String>) -> Self {
        Self::Command {
            code,
            message: message.into(),
        }
    }

    /// Creates an attach error.
    #[inline]
    pub fn attach(target_id: TargetId, message: impl Into<String>) -> Self {
        Self::Attach {
            target_id,
            message: message.into(),
        }
    }

    /// Creates an already-attached error.
    #[inline]
    pub fn already_attached(target_id: TargetId) -> Self {
        Self::AlreadyAttached { target_id }
    }

    /// Creates a session not found error.
    #[inline]
    pub fn session_not_found(target_id: TargetId) -> Self {
        Self::SessionNotFound { target_id }
    }

    /// Creates a detach error.
    #[inline]
    pub fn detach(target_id: TargetId, message: impl Into<String>) -> Self {
        Self::Detach {
            target_id,
            message: message.into(),
        }
    }

    /// Creates a frame not found error.
    #[inline]
    pub fn frame_not_found(target_id: TargetId, frame_id: LogicalFrameId) -> Self {
        Self::FrameNotFound {
            target_id,
            frame_id,
        }
    }

    /// Creates a batch parse error.
    #[inline]
    pub fn batch_parse(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BatchParse {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if another controller already holds the session.
    #[inline]
    #[must_use]
    pub fn is_already_attached(&self) -> bool {
        matches!(self, Self::AlreadyAttached { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the error is a usage error on the caller's side.
    ///
    /// Usage errors never reach the protocol and are never logged.
    #[inline]
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::FrameNotFound { .. } | Self::BatchParse { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
