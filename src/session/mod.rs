//! Session engine.
//!
//! Everything between a control request and the debugger backend:
//!
//! | Module | Description |
//! |--------|-------------|
//! | `registry` | One debugger session per target, attach/detach lifecycle |
//! | `frames` | Logical frame id to protocol frame id |
//! | `log` | Bounded per-target message log with live feed |
//! | `executor` | Single command: attach, focus, resolve, log, send |
//! | `bulk` | Batch text parsing and sequential execution |

// ============================================================================
// Submodules
// ============================================================================

/// Batch parsing and execution.
pub mod bulk;

/// Single-command execution.
pub mod executor;

/// Logical frame resolution.
pub mod frames;

/// Bounded message log.
pub mod log;

/// Session lifecycle.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use bulk::{BatchProgress, BulkCommand, BulkOutcome, BulkReport, BulkRunner, parse_batch};
pub use executor::CommandExecutor;
pub use frames::{FrameResolver, ResolvedFrame};
pub use log::{DEFAULT_LOG_CAPACITY, DirectionFilter, MessageFilter, MessageLog};
pub use registry::{SessionConfig, SessionRegistry, SessionState};
