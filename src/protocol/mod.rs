//! CDP protocol message types.
//!
//! This module defines the wire format spoken with the browser and the
//! records kept in the message log.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Browser | Command request |
//! | `Response` | Browser → Local | Command response |
//! | `Event` | Browser → Local | Unsolicited notification |
//! | `Message` | Both | Log record of any of the above |
//!
//! # Command Naming
//!
//! Commands follow CDP's `Domain.methodName` format:
//!
//! - `Page.navigate`
//! - `Runtime.evaluate`
//! - `Target.attachToTarget`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Event types and lifecycle parsing |
//! | `frame_tree` | `Page.getFrameTree` snapshot |
//! | `message` | Message log records |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Event message types.
pub mod event;

/// Frame tree snapshot.
pub mod frame_tree;

/// Message log records.
pub mod message;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{Event, ParsedEvent};
pub use frame_tree::{Frame, FrameTree};
pub use message::{Direction, Message};
pub use request::{ProtocolError, Request, Response};
