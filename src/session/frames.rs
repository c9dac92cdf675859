//! Logical frame resolution.
//!
//! Maps a [`LogicalFrameId`] onto the protocol frame id by fetching a fresh
//! frame tree on every call. Trees change under navigation, so nothing is
//! cached.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::{LogicalFrameId, TargetId};
use crate::transport::DebuggerBackend;

// ============================================================================
// ResolvedFrame
// ============================================================================

/// Protocol frame a logical id resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedFrame {
    /// The top-level document.
    Root(String),
    /// A nested frame.
    Child(String),
}

impl ResolvedFrame {
    /// Returns the protocol frame id.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> &str {
        match self {
            Self::Root(id) | Self::Child(id) => id,
        }
    }

    /// Returns `true` for the top-level document.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root(_))
    }
}

// ============================================================================
// FrameResolver
// ============================================================================

/// Resolves logical frame ids against a target's live frame tree.
#[derive(Clone)]
pub struct FrameResolver {
    backend: Arc<dyn DebuggerBackend>,
}

impl FrameResolver {
    /// Creates a resolver over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn DebuggerBackend>) -> Self {
        Self { backend }
    }

    /// Resolves `frame` on `target_id`.
    ///
    /// # Errors
    ///
    /// - [`Error::FrameNotFound`] if the index is past the last child frame
    /// - Any backend error from fetching the frame tree
    pub async fn resolve(
        &self,
        target_id: &TargetId,
        frame: LogicalFrameId,
    ) -> Result<ResolvedFrame> {
        let tree = self.backend.get_frame_tree(target_id).await?;

        let resolved = match frame.index() {
            None => ResolvedFrame::Root(tree.root_id().to_string()),
            Some(index) => tree
                .child_at(index)
                .map(|child| ResolvedFrame::Child(child.id.clone()))
                .ok_or_else(|| Error::frame_not_found(target_id.clone(), frame))?,
        };

        debug!(target_id = %target_id, %frame, frame_id = resolved.frame_id(), "Frame resolved");
        Ok(resolved)
    }
}

// ============================================================================
// Tests
// ============================================================================
