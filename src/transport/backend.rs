//! Upstream debugger interface.
//!
//! [`DebuggerBackend`] is the seam between the session engine and the
//! browser's instrumentation interface. [`CdpBackend`] implements it over a
//! single DevTools WebSocket using flat `Target.attachToTarget` sessions.
//!
//! Asynchronous notifications (events, detaches, destroyed targets) are
//! delivered on a separate [`BackendNotification`] channel returned when the
//! backend is created.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{SessionId, TargetId};
use crate::protocol::{FrameTree, ParsedEvent, Request};

use super::connection::{Connection, ConnectionEvent};

// ============================================================================
// Constants
// ============================================================================

/// Reason reported when the browser closes a flat session.
pub const REASON_TARGET_DETACHED: &str = "target_detached";

/// Reason reported when the WebSocket to the browser goes away.
pub const REASON_CONNECTION_CLOSED: &str = "connection_closed";

// ============================================================================
// BackendNotification
// ============================================================================

/// Asynchronous notification from the browser.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendNotification {
    /// Unsolicited protocol event on an attached target.
    Event {
        /// Target the event belongs to.
        target_id: TargetId,
        /// Event name.
        method: String,
        /// Event payload.
        params: Value,
    },

    /// The debugging session for a target was dropped.
    Detached {
        /// The target that lost its session.
        target_id: TargetId,
        /// Why the session ended.
        reason: String,
    },

    /// The target ceased to exist.
    TargetDestroyed {
        /// The destroyed target.
        target_id: TargetId,
    },
}

/// Receiving half of the notification channel.
pub type NotificationReceiver = mpsc::UnboundedReceiver<BackendNotification>;

// ============================================================================
// DebuggerBackend
// ============================================================================

/// The browser's instrumentation interface.
///
/// Every method is per target; session bookkeeping beyond the raw protocol
/// (attach-before-use, focus, logging) lives in the session engine.
#[async_trait]
pub trait DebuggerBackend: Send + Sync {
    /// Attaches a debugging session to `target_id`.
    ///
    /// Returns [`Error::AlreadyAttached`] when another controller already
    /// holds the session.
    async fn attach(&self, target_id: &TargetId, protocol_version: &str) -> Result<()>;

    /// Detaches the debugging session from `target_id`.
    async fn detach(&self, target_id: &TargetId) -> Result<()>;

    /// Sends one protocol command and returns its result.
    async fn send_command(&self, target_id: &TargetId, method: &str, params: Value)
    -> Result<Value>;

    /// Enables notifications of a capability domain (`Page`, `Runtime`, ...).
    async fn enable(&self, target_id: &TargetId, domain: &str) -> Result<()> {
        self.send_command(target_id, &format!("{domain}.enable"), json!({}))
            .await
            .map(|_| ())
    }

    /// Fetches a fresh frame tree snapshot.
    async fn get_frame_tree(&self, target_id: &TargetId) -> Result<FrameTree> {
        let result = self
            .send_command(target_id, "Page.getFrameTree", json!({}))
            .await?;
        let tree = result
            .get("frameTree")
            .cloned()
            .ok_or_else(|| Error::protocol("No frameTree in Page.getFrameTree response"))?;
        Ok(serde_json::from_value(tree)?)
    }

    /// Brings the target to the foreground.
    async fn activate(&self, target_id: &TargetId) -> Result<()>;

    /// Releases the browser connection. Later calls fail.
    fn shutdown(&self) {}
}

// ============================================================================
// Sessions
// ============================================================================

/// Bidirectional target ↔ session map.
#[derive(Default)]
struct Sessions {
    by_target: FxHashMap<TargetId, SessionId>,
    by_session: FxHashMap<SessionId, TargetId>,
}

impl Sessions {
    fn insert(&mut self, target_id: TargetId, session_id: SessionId) {
        self.by_session.insert(session_id.clone(), target_id.clone());
        self.by_target.insert(target_id, session_id);
    }

    fn remove_target(&mut self, target_id: &TargetId) -> Option<SessionId> {
        let session_id = self.by_target.remove(target_id)?;
        self.by_session.remove(&session_id);
        Some(session_id)
    }

    fn remove_session(&mut self, session_id: &SessionId) -> Option<TargetId> {
        let target_id = self.by_session.remove(session_id)?;
        self.by_target.remove(&target_id);
        Some(target_id)
    }
}

// ============================================================================
// CdpBackend
// ============================================================================

/// [`DebuggerBackend`] over a browser DevTools WebSocket.
///
/// # Example
///
/// ```ignore
/// let (backend, notifications) =
///     CdpBackend::connect("ws://127.0.0.1:9222/devtools/browser/…", Duration::from_secs(30)).await?;
/// backend.attach(&TargetId::from("A1B2"), "1.3").await?;
/// ```
pub struct CdpBackend {
    /// Browser-level connection.
    connection: Connection,
    /// Flat sessions by target (shared with the event handler).
    sessions: Arc<RwLock<Sessions>>,
    /// Protocol version reported by `Browser.getVersion`.
    protocol_version: String,
}

impl CdpBackend {
    /// Connects to the browser and starts routing notifications.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] / [`Error::ConnectionTimeout`] if the
    ///   WebSocket cannot be opened
    /// - [`Error::Command`] if target discovery cannot be enabled
    pub async fn connect(
        ws_url: &str,
        command_timeout: Duration,
    ) -> Result<(Arc<Self>, NotificationReceiver)> {
        let connection = Connection::connect(ws_url, command_timeout).await?;
        let sessions = Arc::new(RwLock::new(Sessions::default()));
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let handler_sessions = Arc::clone(&sessions);
        connection.set_event_handler(Box::new(move |event| {
            route_connection_event(event, &handler_sessions, &notify_tx);
        }));

        let version = connection
            .send(Request::new("Browser.getVersion", json!({})))
            .await?
            .into_result()?;
        let protocol_version = version
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        connection
            .send(Request::new(
                "Target.setDiscoverTargets",
                json!({ "discover": true }),
            ))
            .await?
            .into_result()?;

        let product = version
            .get("product")
            .and_then(Value::as_str)
            .unwrap_or_default();
        info!(
            ws_url,
            protocol_version = %protocol_version,
            product,
            "Connected to browser"
        );

        Ok((
            Arc::new(Self {
                connection,
                sessions,
                protocol_version,
            }),
            notify_rx,
        ))
    }

    /// Returns the session for a target.
    fn session_for(&self, target_id: &TargetId) -> Result<SessionId> {
        self.sessions
            .read()
            .by_target
            .get(target_id)
            .cloned()
            .ok_or_else(|| Error::session_not_found(target_id.clone()))
    }

    /// Sends a browser-level command.
    async fn browser_command(&self, method: &str, params: Value) -> Result<Value> {
        self.connection
            .send(Request::new(method, params))
            .await?
            .into_result()
    }
}

#[async_trait]
impl DebuggerBackend for CdpBackend {
    async fn attach(&self, target_id: &TargetId, protocol_version: &str) -> Result<()> {
        if !version_supported(&self.protocol_version, protocol_version) {
            return Err(Error::attach(
                target_id.clone(),
                format!(
                    "Requested protocol version {protocol_version} is not supported by browser ({})",
                    self.protocol_version
                ),
            ));
        }

        if self.sessions.read().by_target.contains_key(target_id) {
            return Err(Error::already_attached(target_id.clone()));
        }

        let result = self
            .browser_command(
                "Target.attachToTarget",
                json!({ "targetId": target_id.as_str(), "flatten": true }),
            )
            .await
            .map_err(|e| match e {
                Error::Command { message, .. } => Error::attach(target_id.clone(), message),
                other => other,
            })?;

        let session_id = result
            .get("sessionId")
            .and_then(Value::as_str)
            .map(SessionId::new)
            .ok_or_else(|| Error::protocol("No sessionId in Target.attachToTarget response"))?;

        debug!(target_id = %target_id, session_id = %session_id, "Flat session attached");
        self.sessions.write().insert(target_id.clone(), session_id);
        Ok(())
    }

    async fn detach(&self, target_id: &TargetId) -> Result<()> {
        let session_id = self
            .sessions
            .write()
            .remove_target(target_id)
            .ok_or_else(|| Error::session_not_found(target_id.clone()))?;

        self.browser_command(
            "Target.detachFromTarget",
            json!({ "sessionId": session_id.as_str() }),
        )
        .await
        .map_err(|e| Error::detach(target_id.clone(), e.to_string()))?;

        debug!(target_id = %target_id, session_id = %session_id, "Flat session detached");
        Ok(())
    }

    async fn send_command(
        &self,
        target_id: &TargetId,
        method: &str,
        params: Value,
    ) -> Result<Value> {
        let session_id = self.session_for(target_id)?;
        trace!(target_id = %target_id, method, "Sending session command");
        self.connection
            .send(Request::for_session(session_id, method, params))
            .await?
            .into_result()
    }

    async fn activate(&self, target_id: &TargetId) -> Result<()> {
        self.browser_command(
            "Target.activateTarget",
            json!({ "targetId": target_id.as_str() }),
        )
        .await
        .map(|_| ())
    }

    fn shutdown(&self) {
        self.connection.shutdown();
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Routes one connection event to the notification channel.
fn route_connection_event(
    event: ConnectionEvent,
    sessions: &RwLock<Sessions>,
    notify_tx: &mpsc::UnboundedSender<BackendNotification>,
) {
    let notifications = match event {
        ConnectionEvent::Closed => {
            let mut sessions = sessions.write();
            let targets: Vec<TargetId> = sessions.by_target.keys().cloned().collect();
            *sessions = Sessions::default();
            targets
                .into_iter()
                .map(|target_id| BackendNotification::Detached {
                    target_id,
                    reason: REASON_CONNECTION_CLOSED.to_string(),
                })
                .collect()
        }

        ConnectionEvent::Event(event) => match event.parse() {
            ParsedEvent::DetachedFromTarget {
                session_id,
                target_id,
            } => {
                let removed = sessions.write().remove_session(&session_id);
                removed
                    .or(target_id)
                    .map(|target_id| BackendNotification::Detached {
                        target_id,
                        reason: REASON_TARGET_DETACHED.to_string(),
                    })
                    .into_iter()
                    .collect()
            }

            ParsedEvent::TargetDestroyed { target_id } => {
                sessions.write().remove_target(&target_id);
                vec![BackendNotification::TargetDestroyed { target_id }]
            }

            ParsedEvent::Other => {
                let target_id = event
                    .session_id
                    .as_ref()
                    .and_then(|session_id| sessions.read().by_session.get(session_id).cloned());

                match target_id {
                    Some(target_id) => vec![BackendNotification::Event {
                        target_id,
                        method: event.method,
                        params: event.params,
                    }],
                    None => {
                        trace!(method = %event.method, "Dropping event without attached target");
                        Vec::new()
                    }
                }
            }
        },
    };

    for notification in notifications {
        if notify_tx.send(notification).is_err() {
            warn!("Notification receiver dropped");
            break;
        }
    }
}

/// Returns `true` if a browser speaking `browser` can serve `requested`.
///
/// Majors must match and the requested minor must not be newer.
fn version_supported(browser: &str, requested: &str) -> bool {
    fn split(version: &str) -> Option<(u32, u32)> {
        let (major, minor) = version.split_once('.')?;
        Some((major.parse().ok()?, minor.parse().ok()?))
    }

    match (split(browser), split(requested)) {
        (Some((b_major, b_minor)), Some((r_major, r_minor))) => {
            b_major == r_major && r_minor <= b_minor
        }
        // Browsers that do not report a version are assumed compatible.
        (None, Some(_)) => true,
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::Event;

    fn sessions_with(target: &str, session: &str) -> RwLock<Sessions> {
        let mut sessions = Sessions::default();
        sessions.insert(TargetId::from(target), SessionId::new(session));
        RwLock::new(sessions)
    }

    fn event(json: Value) -> ConnectionEvent {
        ConnectionEvent::Event(serde_json::from_value::<Event>(json).expect("event"))
    }

    #[test]
    fn test_version_supported() {
        assert!(version_supported("1.3", "1.3"));
        assert!(version_supported("1.3", "1.2"));
        assert!(!version_supported("1.2", "1.3"));
        assert!(!version_supported("2.0", "1.3"));
        assert!(version_supported("", "1.3"));
        assert!(!version_supported("1.3", "latest"));
    }

    #[test]
    fn test_route_session_event() {
        let sessions = sessions_with("T1", "S1");
        let (tx, mut rx) = mpsc::unbounded_channel();

        route_connection_event(
            event(json!({"method": "Page.loadEventFired", "params": {"timestamp": 1.0}, "sessionId": "S1"})),
            &sessions,
            &tx,
        );

        assert_eq!(
            rx.try_recv().expect("notification"),
            BackendNotification::Event {
                target_id: TargetId::from("T1"),
                method: "Page.loadEventFired".to_string(),
                params: json!({"timestamp": 1.0}),
            }
        );
    }

    #[test]
    fn test_route_drops_unknown_session_event() {
        let sessions = sessions_with("T1", "S1");
        let (tx, mut rx) = mpsc::unbounded_channel();

        route_connection_event(
            event(json!({"method": "Page.loadEventFired", "params": {}, "sessionId": "S9"})),
            &sessions,
            &tx,
        );

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_route_detached() {
        let sessions = sessions_with("T1", "S1");
        let (tx, mut rx) = mpsc::unbounded_channel();

        route_connection_event(
            event(json!({"method": "Target.detachedFromTarget", "params": {"sessionId": "S1"}})),
            &sessions,
            &tx,
        );

        assert_eq!(
            rx.try_recv().expect("notification"),
            BackendNotification::Detached {
                target_id: TargetId::from("T1"),
                reason: REASON_TARGET_DETACHED.to_string(),
            }
        );
        assert!(sessions.read().by_target.is_empty());
    }

    #[test]
    fn test_route_target_destroyed() {
        let sessions = sessions_with("T1", "S1");
        let (tx, mut rx) = mpsc::unbounded_channel();

        route_connection_event(
            event(json!({"method": "Target.targetDestroyed", "params": {"targetId": "T1"}})),
            &sessions,
            &tx,
        );

        assert_eq!(
            rx.try_recv().expect("notification"),
            BackendNotification::TargetDestroyed {
                target_id: TargetId::from("T1")
            }
        );
        assert!(sessions.read().by_session.is_empty());
    }

    #[test]
    fn test_route_connection_closed_detaches_everything() {
        let sessions = sessions_with("T1", "S1");
        sessions
            .write()
            .insert(TargetId::from("T2"), SessionId::new("S2"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        route_connection_event(ConnectionEvent::Closed, &sessions, &tx);

        let mut detached = Vec::new();
        while let Ok(BackendNotification::Detached { target_id, reason }) = rx.try_recv() {
            assert_eq!(reason, REASON_CONNECTION_CLOSED);
            detached.push(target_id);
        }
        detached.sort();
        assert_eq!(detached, vec![TargetId::from("T1"), TargetId::from("T2")]);
    }
}
