//! Inspector service object.
//!
//! One [`Inspector`] owns all engine state: the backend, the session
//! registry, the message log, the executor and the bulk runner. It also runs
//! the notification pump that feeds browser events into the log and
//! session drops into the registry.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::discovery::{self, FrameDescriptor};
use crate::error::Result;
use crate::export;
use crate::identifiers::{LogicalFrameId, TargetId};
use crate::protocol::Message;
use crate::session::{
    BatchProgress, BulkReport, BulkRunner, CommandExecutor, MessageFilter, MessageLog,
    SessionRegistry,
};
use crate::transport::{BackendNotification, DebuggerBackend, NotificationReceiver};

use super::builder::InspectorBuilder;
use super::options::InspectorOptions;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state.
pub(crate) struct InspectorInner {
    pub backend: Arc<dyn DebuggerBackend>,
    pub registry: Arc<SessionRegistry>,
    pub log: Arc<MessageLog>,
    pub executor: CommandExecutor,
    pub bulk: BulkRunner,
    pub options: InspectorOptions,
    pump: Mutex<Option<JoinHandle<()>>>,
}

// ============================================================================
// Inspector
// ============================================================================

/// Protocol session and message routing engine.
///
/// Cheap to clone; clones share state. Dropping the last clone releases the
/// backend and its connection; the notification pump then stops on its own.
#[derive(Clone)]
pub struct Inspector {
    pub(crate) inner: Arc<InspectorInner>,
}

impl fmt::Debug for Inspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inspector")
            .field("attached", &self.inner.registry.attached_count())
            .field("focused", &self.inner.registry.focused())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Inspector - Construction
// ============================================================================

impl Inspector {
    /// Creates a builder that connects to a browser endpoint.
    #[inline]
    #[must_use]
    pub fn builder() -> InspectorBuilder {
        InspectorBuilder::new()
    }

    /// Starts the engine over an already connected backend.
    ///
    /// Must be called inside a Tokio runtime; the notification pump is
    /// spawned immediately.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if `options` are invalid.
    pub fn with_backend(
        backend: Arc<dyn DebuggerBackend>,
        notifications: NotificationReceiver,
        options: InspectorOptions,
    ) -> Result<Self> {
        options.validate()?;

        let log = Arc::new(MessageLog::new(options.log_capacity));
        let registry = Arc::new(SessionRegistry::new(
            Arc::clone(&backend),
            Arc::clone(&log),
            options.session_config(),
        ));
        let executor =
            CommandExecutor::new(Arc::clone(&backend), Arc::clone(&registry), Arc::clone(&log));
        let bulk = BulkRunner::new(executor.clone());

        let pump = tokio::spawn(pump_notifications(
            notifications,
            Arc::downgrade(&registry),
            Arc::downgrade(&log),
        ));

        debug!(capacity = options.log_capacity, "Inspector started");

        Ok(Self {
            inner: Arc::new(InspectorInner {
                backend,
                registry,
                log,
                executor,
                bulk,
                options,
                pump: Mutex::new(Some(pump)),
            }),
        })
    }

    /// Returns the active options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &InspectorOptions {
        &self.inner.options
    }

    /// Returns the session registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }
}

// ============================================================================
// Inspector - Commands
// ============================================================================

impl Inspector {
    /// Executes one protocol command on a frame of a target.
    ///
    /// # Errors
    ///
    /// See [`CommandExecutor::execute`].
    pub async fn execute(
        &self,
        target_id: &TargetId,
        frame: LogicalFrameId,
        method: &str,
        params: Value,
    ) -> Result<Value> {
        self.inner
            .executor
            .execute(target_id, frame, method, params)
            .await
    }

    /// Parses and runs a batch of commands.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BatchParse`] if the text is malformed.
    pub async fn execute_bulk(
        &self,
        target_id: &TargetId,
        frame: LogicalFrameId,
        text: &str,
    ) -> Result<BulkReport> {
        self.inner.bulk.run(target_id, frame, text).await
    }

    /// Lists the frames of a target.
    ///
    /// # Errors
    ///
    /// See [`discovery::discover_frames`].
    pub async fn discover_frames(&self, target_id: &TargetId) -> Result<Vec<FrameDescriptor>> {
        discovery::discover_frames(&self.inner.registry, self.inner.backend.as_ref(), target_id)
            .await
    }

    /// Detaches every session and clears the message log.
    ///
    /// Returns the number of sessions detached.
    pub async fn terminate_all_sessions(&self) -> usize {
        self.inner.registry.detach_all().await
    }
}

// ============================================================================
// Inspector - Messages
// ============================================================================

impl Inspector {
    /// Returns a target's messages, oldest first.
    #[must_use]
    pub fn messages(&self, target_id: &TargetId) -> Vec<Message> {
        self.inner.log.get(target_id)
    }

    /// Returns every target's messages ordered by timestamp.
    #[must_use]
    pub fn all_messages(&self) -> Vec<Message> {
        self.inner.log.get_all()
    }

    /// Returns a target's messages matching `filter`.
    #[must_use]
    pub fn query_messages(&self, target_id: &TargetId, filter: &MessageFilter) -> Vec<Message> {
        self.inner.log.query(target_id, filter)
    }

    /// Clears one target's messages, or all when `target_id` is `None`.
    pub fn clear_messages(&self, target_id: Option<&TargetId>) {
        self.inner.log.clear(target_id);
    }

    /// Writes a target's messages into `dir` as a JSON export.
    ///
    /// # Errors
    ///
    /// See [`export::write`].
    pub async fn export_messages(&self, target_id: &TargetId, dir: &Path) -> Result<PathBuf> {
        let messages = self.inner.log.get(target_id);
        export::write(dir, target_id, &messages).await
    }

    /// Subscribes to every message appended to the log.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.inner.log.subscribe()
    }

    /// Subscribes to bulk batch progress.
    #[must_use]
    pub fn subscribe_progress(&self) -> watch::Receiver<BatchProgress> {
        self.inner.bulk.subscribe_progress()
    }
}

// ============================================================================
// Inspector - Shutdown
// ============================================================================

impl Inspector {
    /// Stops the notification pump and releases the backend.
    ///
    /// Sessions are not detached; call
    /// [`terminate_all_sessions`](Self::terminate_all_sessions) first for a
    /// clean exit.
    pub fn shutdown(&self) {
        if let Some(pump) = self.inner.pump.lock().take() {
            pump.abort();
        }
        self.inner.backend.shutdown();
        info!("Inspector shut down");
    }
}

// ============================================================================
// Notification Pump
// ============================================================================

/// Routes backend notifications until the backend drops its sender or the
/// engine is gone.
///
/// Holds the engine weakly so the pump never keeps the backend alive.
async fn pump_notifications(
    mut notifications: NotificationReceiver,
    registry: Weak<SessionRegistry>,
    log: Weak<MessageLog>,
) {
    while let Some(notification) = notifications.recv().await {
        let (Some(registry), Some(log)) = (registry.upgrade(), log.upgrade()) else {
            break;
        };
        route_notification(notification, &registry, &log);
    }
    debug!("Notification pump stopped");
}

/// Applies one notification to the engine state.
fn route_notification(
    notification: BackendNotification,
    registry: &SessionRegistry,
    log: &MessageLog,
) {
    match notification {
        BackendNotification::Event {
            target_id,
            method,
            params,
        } => {
            log.append(&target_id, Message::event(target_id.clone(), method, params));
        }
        BackendNotification::Detached { target_id, reason } => {
            registry.on_detached(&target_id, &reason);
        }
        BackendNotification::TargetDestroyed { target_id } => {
            registry.on_target_destroyed(&target_id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::protocol::frame_tree::tests::node;
    use crate::session::DirectionFilter;
    use crate::transport::mock::MockBackend;

    fn inspector() -> (
        Arc<MockBackend>,
        mpsc::UnboundedSender<BackendNotification>,
        Inspector,
    ) {
        let backend = Arc::new(MockBackend::new());
        backend.set_frame_tree("T1", node("ROOT", vec![node("CHILD", vec![])]));
        backend.set_frame_tree("T2", node("ROOT2", vec![]));
        let (tx, rx) = mpsc::unbounded_channel();
        let inspector = Inspector::with_backend(backend.clone(), rx, InspectorOptions::default())
            .expect("valid options");
        (backend, tx, inspector)
    }

    fn t(id: &str) -> TargetId {
        TargetId::from(id)
    }

    /// Waits until the pump has applied pending notifications.
    async fn settle<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_invalid_options_rejected() {
        let (_, rx) = mpsc::unbounded_channel();
        let result = Inspector::with_backend(
            Arc::new(MockBackend::new()),
            rx,
            InspectorOptions::new().with_log_capacity(0),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_execute_logs_round_trip() {
        let (_, _tx, inspector) = inspector();

        let result = inspector
            .execute(&t("T1"), LogicalFrameId::Main, "Runtime.evaluate", json!({"expression": "1+1"}))
            .await
            .expect("execute");

        assert_eq!(result, json!({"echo": {"expression": "1+1"}}));
        assert_eq!(inspector.messages(&t("T1")).len(), 2);
        assert!(inspector.registry().is_attached(&t("T1")));
    }

    #[tokio::test]
    async fn test_events_are_logged() {
        let (_, tx, inspector) = inspector();
        let mut feed = inspector.subscribe();

        tx.send(BackendNotification::Event {
            target_id: t("T1"),
            method: "Page.loadEventFired".to_string(),
            params: json!({"timestamp": 1.0}),
        })
        .expect("send");

        let message = feed.recv().await.expect("event");
        assert!(message.is_event);
        assert_eq!(message.result, Some(json!({"timestamp": 1.0})));
        assert_eq!(message.params, None);

        let incoming = inspector.query_messages(
            &t("T1"),
            &MessageFilter::new().with_direction(DirectionFilter::Incoming),
        );
        assert_eq!(incoming.len(), 1);
    }

    #[tokio::test]
    async fn test_detach_notification_forces_reattach() {
        let (backend, tx, inspector) = inspector();
        inspector
            .execute(&t("T1"), LogicalFrameId::Main, "Page.reload", json!({}))
            .await
            .expect("first");

        tx.send(BackendNotification::Detached {
            target_id: t("T1"),
            reason: "canceled_by_user".to_string(),
        })
        .expect("send");
        settle(|| !inspector.registry().is_attached(&t("T1"))).await;
        assert_eq!(inspector.registry().focused(), None);

        inspector
            .execute(&t("T1"), LogicalFrameId::Main, "Page.reload", json!({}))
            .await
            .expect("second");
        assert_eq!(backend.attach_count(), 2);
    }

    #[tokio::test]
    async fn test_target_destroyed_drops_session() {
        let (_, tx, inspector) = inspector();
        inspector
            .execute(&t("T2"), LogicalFrameId::Main, "Page.reload", json!({}))
            .await
            .expect("execute");

        tx.send(BackendNotification::TargetDestroyed { target_id: t("T2") })
            .expect("send");

        settle(|| inspector.registry().attached_count() == 0).await;
    }

    #[tokio::test]
    async fn test_focus_switches_between_targets() {
        let (backend, _tx, inspector) = inspector();

        for target in ["T1", "T1", "T2"] {
            inspector
                .execute(&t(target), LogicalFrameId::Main, "Page.reload", json!({}))
                .await
                .expect("execute");
        }

        assert_eq!(backend.activate_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inspector.registry().focused(), Some(t("T2")));
    }

    #[tokio::test]
    async fn test_terminate_clears_everything() {
        let (_, _tx, inspector) = inspector();
        for target in ["T1", "T2"] {
            inspector
                .execute(&t(target), LogicalFrameId::Main, "Page.reload", json!({}))
                .await
                .expect("execute");
        }

        assert_eq!(inspector.terminate_all_sessions().await, 2);
        assert!(inspector.all_messages().is_empty());
        assert_eq!(inspector.registry().attached_count(), 0);
    }

    #[tokio::test]
    async fn test_export_messages() {
        let (_, _tx, inspector) = inspector();
        inspector
            .execute(&t("T1"), LogicalFrameId::Main, "Page.reload", json!({}))
            .await
            .expect("execute");
        let dir = tempfile::tempdir().expect("tempdir");

        let path = inspector
            .export_messages(&t("T1"), dir.path())
            .await
            .expect("export");

        let text = tokio::fs::read_to_string(path).await.expect("read");
        assert_eq!(export::from_json(&text).expect("parse"), inspector.messages(&t("T1")));
    }

    #[tokio::test]
    async fn test_dropped_inspector_releases_backend() {
        let (backend, tx, inspector) = inspector();
        inspector
            .execute(&t("T1"), LogicalFrameId::Main, "Page.reload", json!({}))
            .await
            .expect("execute");

        drop(inspector);
        assert_eq!(Arc::strong_count(&backend), 1);

        // The next notification finds the engine gone and ends the pump.
        tx.send(BackendNotification::TargetDestroyed { target_id: t("T1") })
            .expect("send");
        settle(|| tx.is_closed()).await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_pump() {
        let (_, tx, inspector) = inspector();
        inspector.shutdown();
        settle(|| tx.is_closed()).await;
    }
}
