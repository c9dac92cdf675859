//! Inbound control surface.
//!
//! Front-ends drive the engine with JSON requests tagged by `action`:
//!
//! | Action | Fields | Response |
//! |--------|--------|----------|
//! | `executeCDP` | `targetId`, `frameId`, `method`, `params` | `success`, `result` / `error` |
//! | `executeBulk` | `targetId`, `frameId`, `commands` | `success`, `results` / `error` |
//! | `getMessages` | `targetId?`, `filter?` | `messages` |
//! | `clearMessages` | `targetId?` | `success` |
//! | `terminateAllSessions` | | `success`, `count` |
//! | `getFrames` | `targetId` | `success`, `frames` / `error` |
//!
//! `tabId` is accepted as an alias of `targetId`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::discovery::FrameDescriptor;
use crate::error::Error;
use crate::identifiers::{LogicalFrameId, TargetId};
use crate::protocol::Message;
use crate::session::{BulkOutcome, MessageFilter};

use super::core::Inspector;

// ============================================================================
// Types
// ============================================================================

/// A control request and the channel its answer goes to.
pub type ControlEnvelope = (ControlRequest, oneshot::Sender<ControlResponse>);

/// Request from a front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ControlRequest {
    /// Run one protocol command.
    #[serde(rename = "executeCDP", rename_all = "camelCase")]
    ExecuteCdp {
        /// Target to run on.
        #[serde(alias = "tabId")]
        target_id: TargetId,
        /// Frame to run in.
        #[serde(default)]
        frame_id: LogicalFrameId,
        /// CDP method.
        method: String,
        /// Command parameters.
        #[serde(default)]
        params: Value,
    },

    /// Run a batch of commands.
    #[serde(rename = "executeBulk", rename_all = "camelCase")]
    ExecuteBulk {
        /// Target to run on.
        #[serde(alias = "tabId")]
        target_id: TargetId,
        /// Frame to run in.
        #[serde(default)]
        frame_id: LogicalFrameId,
        /// Batch text.
        commands: String,
    },

    /// Read logged messages.
    #[serde(rename = "getMessages", rename_all = "camelCase")]
    GetMessages {
        /// Target to read; every target when absent.
        #[serde(default, alias = "tabId")]
        target_id: Option<TargetId>,
        /// Optional direction/search filter.
        #[serde(default)]
        filter: MessageFilter,
    },

    /// Clear logged messages.
    #[serde(rename = "clearMessages", rename_all = "camelCase")]
    ClearMessages {
        /// Target to clear; every target when absent.
        #[serde(default, alias = "tabId")]
        target_id: Option<TargetId>,
    },

    /// Detach every session.
    #[serde(rename = "terminateAllSessions")]
    TerminateAllSessions,

    /// List a target's frames.
    #[serde(rename = "getFrames", rename_all = "camelCase")]
    GetFrames {
        /// Target to inspect.
        #[serde(alias = "tabId")]
        target_id: TargetId,
    },
}

impl ControlRequest {
    /// Returns the wire action name.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::ExecuteCdp { .. } => "executeCDP",
            Self::ExecuteBulk { .. } => "executeBulk",
            Self::GetMessages { .. } => "getMessages",
            Self::ClearMessages { .. } => "clearMessages",
            Self::TerminateAllSessions => "terminateAllSessions",
            Self::GetFrames { .. } => "getFrames",
        }
    }
}

/// Answer to a [`ControlRequest`].
///
/// Only the fields relevant to the action are present on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    /// Whether the action succeeded.
    pub success: bool,

    /// Command result (`executeCDP`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error text of a failed action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Logged messages (`getMessages`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,

    /// Per-command outcomes (`executeBulk`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<BulkOutcome>>,

    /// Detached session count (`terminateAllSessions`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// Frame list (`getFrames`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<Vec<FrameDescriptor>>,
}

impl ControlResponse {
    /// Successful response with no payload.
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Failed response carrying the error text.
    #[must_use]
    pub fn failure(error: &Error) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

// ============================================================================
// Inspector - Control
// ============================================================================

impl Inspector {
    /// Answers one control request.
    ///
    /// Failures are reported in the response, never as a panic.
    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        debug!(action = request.action(), "Control request");

        match request {
            ControlRequest::ExecuteCdp {
                target_id,
                frame_id,
                method,
                params,
            } => match self.execute(&target_id, frame_id, &method, params).await {
                Ok(result) => ControlResponse {
                    result: Some(result),
                    ..ControlResponse::ok()
                },
                Err(e) => ControlResponse::failure(&e),
            },

            ControlRequest::ExecuteBulk {
                target_id,
                frame_id,
                commands,
            } => match self.execute_bulk(&target_id, frame_id, &commands).await {
                Ok(report) => ControlResponse {
                    results: Some(report.outcomes),
                    ..ControlResponse::ok()
                },
                Err(e) => ControlResponse::failure(&e),
            },

            ControlRequest::GetMessages { target_id, filter } => {
                let messages = match target_id {
                    Some(target_id) => self.query_messages(&target_id, &filter),
                    None => self
                        .all_messages()
                        .into_iter()
                        .filter(|message| filter.matches(message))
                        .collect(),
                };
                ControlResponse {
                    messages: Some(messages),
                    ..ControlResponse::ok()
                }
            }

            ControlRequest::ClearMessages { target_id } => {
                self.clear_messages(target_id.as_ref());
                ControlResponse::ok()
            }

            ControlRequest::TerminateAllSessions => ControlResponse {
                count: Some(self.terminate_all_sessions().await),
                ..ControlResponse::ok()
            },

            ControlRequest::GetFrames { target_id } => {
                match self.discover_frames(&target_id).await {
                    Ok(frames) => ControlResponse {
                        frames: Some(frames),
                        ..ControlResponse::ok()
                    },
                    Err(e) => ControlResponse::failure(&e),
                }
            }
        }
    }

    /// Serves control requests until every sender is dropped.
    ///
    /// Each request runs on its own task so a slow command never blocks the
    /// channel. Returns once the channel closes; in-flight requests finish
    /// on their own.
    pub async fn serve(&self, mut requests: mpsc::Receiver<ControlEnvelope>) {
        while let Some((request, reply)) = requests.recv().await {
            let inspector = self.clone();
            tokio::spawn(async move {
                let action = request.action();
                let response = inspector.handle(request).await;
                if reply.send(response).is_err() {
                    warn!(action, "Control requester went away before the reply");
                }
            });
        }
        debug!("Control channel closed");
    }
}

// ============================================================================
// Tests
// ============================================================================
