//! Browser transport layer.
//!
//! This module handles communication between the session engine and the
//! browser's DevTools endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Session engine  │                              │  Browser        │
//! │                  │         WebSocket            │  (DevTools)     │
//! │  CdpBackend      │◄────────────────────────────►│                 │
//! │  → Connection    │   /devtools/browser/<id>     │  Target domain  │
//! │                  │                              │  flat sessions  │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - WebSocket handshake with the browser
//! 2. `CdpBackend::connect` - Version check, target discovery enabled
//! 3. `DebuggerBackend::attach` - One flat session per target
//! 4. Notifications - Events, detaches and destroyed targets pushed to the
//!    engine on a channel
//! 5. `Connection::shutdown` - Close the WebSocket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backend` | `DebuggerBackend` trait and its CDP implementation |
//! | `connection` | WebSocket connection and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// Debugger backend trait and CDP implementation.
pub mod backend;

/// WebSocket connection and event loop.
pub mod connection;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use backend::{BackendNotification, CdpBackend, DebuggerBackend, NotificationReceiver};
pub use connection::{Connection, ConnectionEvent, EventHandler};
