//! Frame tree snapshot as returned by `Page.getFrameTree`.
//!
//! Only the fields the resolver and discovery need are modelled; unknown
//! fields are ignored.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Frame
// ============================================================================

/// A single frame of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Protocol-level frame id.
    pub id: String,

    /// Parent frame id (absent for the root).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Document URL.
    #[serde(default)]
    pub url: String,

    /// Frame name attribute, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ============================================================================
// FrameTree
// ============================================================================

/// Hierarchical frame snapshot: a frame plus its nested child trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTree {
    /// The frame at this level.
    pub frame: Frame,

    /// Nested frames, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_frames: Vec<FrameTree>,
}

impl FrameTree {
    /// Returns the root frame's protocol id.
    #[inline]
    #[must_use]
    pub fn root_id(&self) -> &str {
        &self.frame.id
    }

    /// Returns every child frame in pre-order, root excluded.
    ///
    /// The position of a frame in the returned list is its logical index
    /// (`"frame-<index>"`).
    #[must_use]
    pub fn child_frames(&self) -> Vec<&Frame> {
        let mut frames = Vec::new();
        let mut stack: Vec<&FrameTree> = self.child_frames.iter().rev().collect();

        while let Some(node) = stack.pop() {
            frames.push(&node.frame);
            stack.extend(node.child_frames.iter().rev());
        }

        frames
    }

    /// Returns the child frame visited at `index` in pre-order.
    #[must_use]
    pub fn child_at(&self, index: usize) -> Option<&Frame> {
        self.child_frames().into_iter().nth(index)
    }
}

// ============================================================================
// Tests
// ============================================================================
