//! Single-command execution.
//!
//! [`CommandExecutor`] ties the registry, the frame resolver and the message
//! log together to run one protocol command end-to-end:
//!
//! 1. Ensure the target's session is attached
//! 2. Focus the target
//! 3. Resolve the logical frame; nested frames add `params.frameId`
//! 4. Log the outgoing command
//! 5. Send it
//! 6. Log the incoming result or error, and return it

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::{LogicalFrameId, TargetId};
use crate::protocol::Message;
use crate::transport::DebuggerBackend;

use super::frames::FrameResolver;
use super::log::MessageLog;
use super::registry::SessionRegistry;

// ============================================================================
// CommandExecutor
// ============================================================================

/// Runs protocol commands with attach, frame resolution and logging.
#[derive(Clone)]
pub struct CommandExecutor {
    backend: Arc<dyn DebuggerBackend>,
    registry: Arc<SessionRegistry>,
    resolver: FrameResolver,
    log: Arc<MessageLog>,
}

impl CommandExecutor {
    /// Creates an executor over shared engine state.
    #[must_use]
    pub fn new(
        backend: Arc<dyn DebuggerBackend>,
        registry: Arc<SessionRegistry>,
        log: Arc<MessageLog>,
    ) -> Self {
        Self {
            resolver: FrameResolver::new(Arc::clone(&backend)),
            backend,
            registry,
            log,
        }
    }

    /// Executes `method` on `frame` of `target_id`.
    ///
    /// `params` must be a JSON object; `null` stands for `{}`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `params` is not an object
    /// - [`Error::Attach`] if the session cannot be attached
    /// - [`Error::FrameNotFound`] if the logical frame does not exist
    /// - The protocol error of a rejected command, after it was logged
    pub async fn execute(
        &self,
        target_id: &TargetId,
        frame: LogicalFrameId,
        method: &str,
        params: Value,
    ) -> Result<Value> {
        let mut params = into_object(params)?;

        self.registry.ensure_attached(target_id).await?;
        self.registry.focus(target_id).await;

        let resolved = self.resolver.resolve(target_id, frame).await?;
        if !resolved.is_root() {
            params.insert(
                "frameId".to_string(),
                Value::String(resolved.frame_id().to_string()),
            );
        }
        let params = Value::Object(params);

        self.log.append(
            target_id,
            Message::outgoing(target_id.clone(), method, params.clone()),
        );

        debug!(target_id = %target_id, method, %frame, "Executing command");

        match self.backend.send_command(target_id, method, params).await {
            Ok(result) => {
                self.log.append(
                    target_id,
                    Message::result(target_id.clone(), method, result.clone()),
                );
                Ok(result)
            }
            Err(e) => {
                warn!(target_id = %target_id, method, error = %e, "Command failed");
                self.log.append(
                    target_id,
                    Message::error(target_id.clone(), method, e.to_string()),
                );
                Err(e)
            }
        }
    }
}

/// Unwraps command params into a JSON object.
fn into_object(params: Value) -> Result<Map<String, Value>> {
    match params {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(Error::invalid_argument(format!(
            "Command params must be a JSON object, got {other}"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
