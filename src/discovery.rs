//! Frame discovery inside a page.
//!
//! Evaluates a small script in the target's main document that walks
//! `window.frames` in pre-order and reports each frame under the same
//! logical id the executor accepts (`main`, `frame-0`, `frame-1`, ...).
//!
//! Frames whose location cannot be read from the main document are still
//! listed, flagged as restricted, so indexes stay aligned with
//! `Page.getFrameTree`.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::{LogicalFrameId, TargetId};
use crate::session::SessionRegistry;
use crate::transport::DebuggerBackend;

// ============================================================================
// Constants
// ============================================================================

/// URL reported for frames the scan may not inspect.
pub const RESTRICTED_URL: &str = "cross-origin or restricted";

/// Script evaluated in the main document.
const FRAME_SCAN_SCRIPT: &str = r#"(() => {
  const RESTRICTED = "cross-origin or restricted";
  const out = [{ frameId: "main", url: location.href, name: window.name || "", isMainFrame: true, restricted: false }];
  let index = 0;
  const stack = [];
  for (let i = window.frames.length - 1; i >= 0; i--) stack.push(window.frames[i]);
  while (stack.length > 0) {
    const frame = stack.pop();
    const entry = { frameId: "frame-" + index++, url: RESTRICTED, name: "", isMainFrame: false, restricted: true };
    try {
      entry.url = frame.location.href;
      entry.name = frame.name || "";
      entry.restricted = false;
    } catch (e) {}
    out.push(entry);
    let children = 0;
    try { children = frame.frames.length; } catch (e) {}
    for (let i = children - 1; i >= 0; i--) {
      try { stack.push(frame.frames[i]); } catch (e) {}
    }
  }
  return out;
})()"#;

// ============================================================================
// FrameDescriptor
// ============================================================================

/// One frame as seen from the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDescriptor {
    /// Logical id usable with the executor.
    pub frame_id: LogicalFrameId,
    /// Document URL, or [`RESTRICTED_URL`].
    pub url: String,
    /// Frame name (may be empty).
    #[serde(default)]
    pub name: String,
    /// Whether this is the top-level document.
    pub is_main_frame: bool,
    /// Whether the frame's location was inaccessible.
    #[serde(default)]
    pub restricted: bool,
}

// ============================================================================
// Discovery
// ============================================================================

/// Lists the frames of `target_id`, main document first.
///
/// The scan exchange bypasses the message log.
///
/// # Errors
///
/// - [`Error::Attach`] if the session cannot be attached
/// - [`Error::Command`] if evaluation is rejected
/// - [`Error::Protocol`] if the scan returns an unexpected shape
pub async fn discover_frames(
    registry: &SessionRegistry,
    backend: &dyn DebuggerBackend,
    target_id: &TargetId,
) -> Result<Vec<FrameDescriptor>> {
    registry.ensure_attached(target_id).await?;

    let response = backend
        .send_command(
            target_id,
            "Runtime.evaluate",
            json!({ "expression": FRAME_SCAN_SCRIPT, "returnByValue": true }),
        )
        .await?;

    let frames = parse_scan_result(&response)?;
    debug!(target_id = %target_id, count = frames.len(), "Frames discovered");
    Ok(frames)
}

/// Extracts descriptors from a `Runtime.evaluate` response.
fn parse_scan_result(response: &Value) -> Result<Vec<FrameDescriptor>> {
    if let Some(details) = response.get("exceptionDetails") {
        let text = details
            .pointer("/exception/description")
            .or_else(|| details.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("unknown exception");
        return Err(Error::protocol(format!("Frame scan threw: {text}")));
    }

    let value = response
        .pointer("/result/value")
        .cloned()
        .ok_or_else(|| Error::protocol("Frame scan returned no value"))?;

    serde_json::from_value(value)
        .map_err(|e| Error::protocol(format!("Unexpected frame scan result: {e}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::session::{MessageLog, SessionConfig};
    use crate::transport::mock::MockBackend;

    fn scan_value() -> Value {
        json!({
            "result": {
                "type": "object",
                "value": [
                    { "frameId": "main", "url": "https://a.test/", "name": "", "isMainFrame": true, "restricted": false },
                    { "frameId": "frame-0", "url": "https://a.test/inner", "name": "ads", "isMainFrame": false, "restricted": false },
                    { "frameId": "frame-1", "url": RESTRICTED_URL, "name": "", "isMainFrame": false, "restricted": true }
                ]
            }
        })
    }

    #[test]
    fn test_parse_scan_result() {
        let frames = parse_scan_result(&scan_value()).expect("parse");

        assert_eq!(frames.len(), 3);
        assert!(frames[0].is_main_frame);
        assert_eq!(frames[0].frame_id, LogicalFrameId::Main);
        assert_eq!(frames[1].frame_id, LogicalFrameId::Child(0));
        assert_eq!(frames[1].name, "ads");
        assert!(frames[2].restricted);
        assert_eq!(frames[2].url, RESTRICTED_URL);
    }

    #[test]
    fn test_parse_scan_exception() {
        let response = json!({
            "result": { "type": "object" },
            "exceptionDetails": { "text": "Uncaught", "exception": { "description": "ReferenceError: x" } }
        });
        let err = parse_scan_result(&response).expect_err("exception");
        assert!(err.to_string().contains("ReferenceError"));
    }

    #[test]
    fn test_parse_scan_missing_value() {
        let err = parse_scan_result(&json!({ "result": {} })).expect_err("no value");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_descriptor_wire_names() {
        let descriptor = FrameDescriptor {
            frame_id: LogicalFrameId::Child(3),
            url: "about:blank".to_string(),
            name: String::new(),
            is_main_frame: false,
            restricted: false,
        };
        let value = serde_json::to_value(&descriptor).expect("serialize");
        assert_eq!(value["frameId"], "frame-3");
        assert_eq!(value["isMainFrame"], false);
    }

    #[tokio::test]
    async fn test_discover_attaches_and_skips_log() {
        let backend = Arc::new(MockBackend::new());
        backend.respond("Runtime.evaluate", Ok(scan_value()));
        let log = Arc::new(MessageLog::default());
        let registry = SessionRegistry::new(
            backend.clone(),
            log.clone(),
            SessionConfig {
                protocol_version: "1.3".to_string(),
                required_domains: Vec::new(),
                activate_on_focus: false,
            },
        );
        let target = TargetId::from("T1");

        let frames = discover_frames(&registry, backend.as_ref(), &target)
            .await
            .expect("discover");

        assert_eq!(frames.len(), 3);
        assert!(registry.is_attached(&target));
        assert!(log.is_empty());

        let commands = backend.commands.lock();
        assert_eq!(commands[0].1, "Runtime.evaluate");
        assert_eq!(commands[0].2["returnByValue"], true);
    }
}
