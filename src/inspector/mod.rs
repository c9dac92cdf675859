//! Engine entry point.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Inspector`] | Service object owning all engine state |
//! | [`InspectorBuilder`] | Endpoint and options, then connect |
//! | [`InspectorOptions`] | Engine configuration |
//! | [`ControlRequest`] | Inbound front-end request |
//! | [`ControlResponse`] | Answer to a control request |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder that connects to a browser.
pub mod builder;

/// Control request/response surface.
pub mod control;

/// Inspector service object.
pub mod core;

/// Engine configuration.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::InspectorBuilder;
pub use control::{ControlEnvelope, ControlRequest, ControlResponse};
pub use core::Inspector;
pub use options::{DEFAULT_PROTOCOL_VERSION, InspectorOptions};
