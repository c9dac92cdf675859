//! CDP Inspector - Chrome DevTools Protocol session and message routing.
//!
//! This library drives browser targets (tabs) over the DevTools Protocol on
//! behalf of an interactive front-end: it attaches debugging sessions on
//! demand, runs commands in the main document or in nested frames, runs
//! command batches and records every piece of traffic in a bounded,
//! searchable, exportable log.
//!
//! # Architecture
//!
//! ```text
//! ControlRequest ──► Inspector ──► CommandExecutor ──► DebuggerBackend ──► browser
//!                        │              │   │   │              │
//!                        │   SessionRegistry │  MessageLog ◄───┤ events
//!                        │        FrameResolver                │
//!                        └──── notification pump ◄─────────────┘ detach / destroyed
//! ```
//!
//! Key design principles:
//!
//! - One [`Inspector`] per process owns all state; clones share it
//! - One debugging session per target, attached lazily
//! - Frames are addressed as `main` / `frame-<n>` and resolved against a
//!   fresh frame tree on every command
//! - Failures are reported, never fatal: batches continue past failing
//!   commands, detach-all never stops on one target
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_inspector::{Inspector, LogicalFrameId, Result, TargetId};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let inspector = Inspector::builder()
//!         .endpoint("ws://127.0.0.1:9222/devtools/browser/<id>")
//!         .connect()
//!         .await?;
//!
//!     let tab = TargetId::from("A1B2C3");
//!     let result = inspector
//!         .execute(&tab, LogicalFrameId::Main, "Runtime.evaluate", json!({"expression": "1+1"}))
//!         .await?;
//!     println!("{result}");
//!
//!     for message in inspector.messages(&tab) {
//!         println!("{:?} {}", message.direction, message.method);
//!     }
//!
//!     inspector.terminate_all_sessions().await;
//!     inspector.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`inspector`] | [`Inspector`], builder, options, control surface |
//! | [`session`] | Registry, frame resolver, message log, executor, batches |
//! | [`discovery`] | In-page frame listing |
//! | [`export`] | JSON export / re-import of message logs |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | CDP wire types |
//! | [`transport`] | Debugger backend and WebSocket connection |

// ============================================================================
// Modules
// ============================================================================

/// In-page frame discovery.
pub mod discovery;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Message log export.
pub mod export;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Service object, configuration and control surface.
pub mod inspector;

/// CDP wire types and frame trees.
pub mod protocol;

/// Session engine: registry, frames, log, executor, batches.
pub mod session;

/// Debugger backend and WebSocket transport.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use inspector::{
    ControlEnvelope, ControlRequest, ControlResponse, Inspector, InspectorBuilder,
    InspectorOptions,
};

// Session types
pub use session::{
    BatchProgress, BulkCommand, BulkOutcome, BulkReport, DirectionFilter, MessageFilter,
    SessionState,
};

// Frame discovery
pub use discovery::FrameDescriptor;

// Wire types
pub use protocol::{Direction, Message};

// Backend types
pub use transport::{BackendNotification, CdpBackend, DebuggerBackend, NotificationReceiver};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{LogicalFrameId, RequestId, SessionId, TargetId};
