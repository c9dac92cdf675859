//! Session lifecycle per target.
//!
//! The registry owns one session record per target and the "currently
//! focused" marker. Attach is lazy: the executor calls
//! [`SessionRegistry::ensure_attached`] before every command, which is a
//! no-op once the session is attached. Concurrent callers for the same
//! target queue behind one attach gate, so a target is attached at most
//! once at a time.
//!
//! # State Machine
//!
//! ```text
//! Detached ──ensure_attached──► Attaching ──ok / already attached──► Attached
//!     ▲                              │                                  │
//!     └───────────── attach error ───┘     detach / notification ───────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::TargetId;
use crate::transport::DebuggerBackend;

use super::log::MessageLog;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of a target's debugging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    Detached,
    /// Attach in progress.
    Attaching,
    /// Commands may be sent.
    Attached,
}

// ============================================================================
// SessionConfig
// ============================================================================

/// What `ensure_attached` does on a fresh attach.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Protocol version requested on attach.
    pub protocol_version: String,
    /// Domains enabled right after attach.
    pub required_domains: Vec<String>,
    /// Whether focusing a target activates it in the browser.
    pub activate_on_focus: bool,
}

// ============================================================================
// SessionRegistry
// ============================================================================

/// Tracks one attach/detach lifecycle per target.
pub struct SessionRegistry {
    backend: Arc<dyn DebuggerBackend>,
    log: Arc<MessageLog>,
    config: SessionConfig,
    sessions: Mutex<FxHashMap<TargetId, SessionState>>,
    /// Per-target gate held for the whole attach sequence.
    attach_gates: Mutex<FxHashMap<TargetId, Arc<AsyncMutex<()>>>>,
    focused: Mutex<Option<TargetId>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(
        backend: Arc<dyn DebuggerBackend>,
        log: Arc<MessageLog>,
        config: SessionConfig,
    ) -> Self {
        Self {
            backend,
            log,
            config,
            sessions: Mutex::new(FxHashMap::default()),
            attach_gates: Mutex::new(FxHashMap::default()),
            focused: Mutex::new(None),
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Returns the session state of a target.
    #[must_use]
    pub fn state(&self, target_id: &TargetId) -> SessionState {
        self.sessions
            .lock()
            .get(target_id)
            .copied()
            .unwrap_or(SessionState::Detached)
    }

    /// Returns `true` if the target's session is attached.
    #[inline]
    #[must_use]
    pub fn is_attached(&self, target_id: &TargetId) -> bool {
        self.state(target_id) == SessionState::Attached
    }

    /// Returns the number of attached sessions.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|state| **state == SessionState::Attached)
            .count()
    }

    /// Returns the currently focused target.
    #[must_use]
    pub fn focused(&self) -> Option<TargetId> {
        self.focused.lock().clone()
    }

    // ========================================================================
    // Attach
    // ========================================================================

    /// Makes sure `target_id` has an attached session.
    ///
    /// Attaches with the configured protocol version and enables the
    /// required domains. An attach rejected because another controller
    /// already debugs the target counts as attached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attach`] (or the backend's error) if attaching or
    /// enabling a domain fails; the session is left detached.
    pub async fn ensure_attached(&self, target_id: &TargetId) -> Result<()> {
        if self.is_attached(target_id) {
            return Ok(());
        }

        let gate = self.attach_gate(target_id);
        let _attaching = gate.lock().await;

        // A caller queued ahead of us may have finished the attach.
        {
            let mut sessions = self.sessions.lock();
            if sessions.get(target_id) == Some(&SessionState::Attached) {
                return Ok(());
            }
            sessions.insert(target_id.clone(), SessionState::Attaching);
        }

        debug!(target_id = %target_id, version = %self.config.protocol_version, "Attaching debugger");

        match self.attach_and_enable(target_id).await {
            Ok(()) => {
                info!(target_id = %target_id, "Debugger attached");
            }
            Err(e) if e.is_already_attached() => {
                info!(target_id = %target_id, "Debugger already attached");
            }
            Err(e) => {
                self.sessions.lock().remove(target_id);
                warn!(target_id = %target_id, error = %e, "Attach failed");
                return Err(match e {
                    Error::Attach { .. } => e,
                    other => Error::attach(target_id.clone(), other.to_string()),
                });
            }
        }

        self.sessions
            .lock()
            .insert(target_id.clone(), SessionState::Attached);
        Ok(())
    }

    /// Returns the attach gate of a target, creating it on first use.
    fn attach_gate(&self, target_id: &TargetId) -> Arc<AsyncMutex<()>> {
        Arc::clone(
            self.attach_gates
                .lock()
                .entry(target_id.clone())
                .or_default(),
        )
    }

    /// Attaches then enables every required domain.
    async fn attach_and_enable(&self, target_id: &TargetId) -> Result<()> {
        self.backend
            .attach(target_id, &self.config.protocol_version)
            .await?;

        for domain in &self.config.required_domains {
            self.backend.enable(target_id, domain).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Focus
    // ========================================================================

    /// Marks `target_id` as the focused target.
    ///
    /// Activates the target in the browser when focus changes. Activation
    /// failures are logged and never surface. Returns `true` if focus moved.
    pub async fn focus(&self, target_id: &TargetId) -> bool {
        {
            let mut focused = self.focused.lock();
            if focused.as_ref() == Some(target_id) {
                return false;
            }
            *focused = Some(target_id.clone());
        }

        if self.config.activate_on_focus
            && let Err(e) = self.backend.activate(target_id).await
        {
            warn!(target_id = %target_id, error = %e, "Failed to bring target to foreground");
        }

        debug!(target_id = %target_id, "Target focused");
        true
    }

    // ========================================================================
    // Detach
    // ========================================================================

    /// Detaches one target, best-effort.
    ///
    /// Returns `true` if an attached session was detached. Failures are
    /// logged and swallowed; the record is removed either way.
    pub async fn detach(&self, target_id: &TargetId) -> bool {
        let state = self.sessions.lock().remove(target_id);
        self.clear_focus_if(target_id);

        if state != Some(SessionState::Attached) {
            return false;
        }

        match self.backend.detach(target_id).await {
            Ok(()) => {
                debug!(target_id = %target_id, "Debugger detached");
                true
            }
            Err(e) => {
                warn!(target_id = %target_id, error = %e, "Error detaching from target");
                false
            }
        }
    }

    /// Detaches every tracked session.
    ///
    /// Returns how many attached sessions were actually detached. Afterwards
    /// no session, no focus and no logged message remain.
    pub async fn detach_all(&self) -> usize {
        let tracked: Vec<(TargetId, SessionState)> = self
            .sessions
            .lock()
            .iter()
            .map(|(target_id, state)| (target_id.clone(), *state))
            .collect();

        let mut count = 0;
        for (target_id, state) in tracked {
            if state != SessionState::Attached {
                continue;
            }
            match self.backend.detach(&target_id).await {
                Ok(()) => count += 1,
                Err(e) => {
                    warn!(target_id = %target_id, error = %e, "Error detaching from target");
                }
            }
        }

        self.sessions.lock().clear();
        *self.focused.lock() = None;
        self.log.clear(None);

        info!(count, "Terminated CDP session(s)");
        count
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Handles the browser or user dropping a target's debugging session.
    pub fn on_detached(&self, target_id: &TargetId, reason: &str) {
        info!(target_id = %target_id, reason, "Debugger detached from target");
        self.forget(target_id);
    }

    /// Handles a target ceasing to exist.
    pub fn on_target_destroyed(&self, target_id: &TargetId) {
        debug!(target_id = %target_id, "Target destroyed");
        self.forget(target_id);
        self.attach_gates.lock().remove(target_id);
    }

    /// Drops a target's record and focus.
    fn forget(&self, target_id: &TargetId) {
        self.sessions.lock().remove(target_id);
        self.clear_focus_if(target_id);
    }

    /// Clears the focus marker if it points at `target_id`.
    fn clear_focus_if(&self, target_id: &TargetId) {
        let mut focused = self.focused.lock();
        if focused.as_ref() == Some(target_id) {
            *focused = None;
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

    use crate::protocol::Message;
    use crate::transport::mock::{AttachBehavior, MockBackend};

    fn config() -> SessionConfig {
        SessionConfig {
            protocol_version: "1.3".to_string(),
            required_domains: vec!["Page".to_string(), "Runtime".to_string()],
            activate_on_focus: true,
        }
    }

    fn registry() -> (Arc<MockBackend>, Arc<MessageLog>, SessionRegistry) {
        let backend = Arc::new(MockBackend::new());
        let log = Arc::new(MessageLog::default());
        let registry = SessionRegistry::new(backend.clone(), log.clone(), config());
        (backend, log, registry)
    }

    fn t(id: &str) -> TargetId {
        TargetId::from(id)
    }

    #[tokio::test]
    async fn test_ensure_attached_is_idempotent() {
        let (backend, _, registry) = registry();

        registry.ensure_attached(&t("T1")).await.expect("attach");
        registry.ensure_attached(&t("T1")).await.expect("no-op");

        assert_eq!(backend.attach_count(), 1);
        assert_eq!(backend.methods(), vec!["Page.enable", "Runtime.enable"]);
        assert!(registry.is_attached(&t("T1")));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_attach() {
        let (backend, _, registry) = registry();
        backend.set_attach_delay(Duration::from_millis(50));
        let target = t("T1");

        let (first, second) = tokio::join!(
            registry.ensure_attached(&target),
            registry.ensure_attached(&target)
        );

        first.expect("first caller");
        second.expect("second caller");
        assert_eq!(backend.attach_count(), 1);
        assert_eq!(backend.methods(), vec!["Page.enable", "Runtime.enable"]);
        assert!(registry.is_attached(&target));
    }

    #[tokio::test]
    async fn test_queued_caller_retries_after_failed_attach() {
        let (backend, _, registry) = registry();
        backend.set_attach_delay(Duration::from_millis(20));
        backend.set_attach("T1", AttachBehavior::Fail);
        let target = t("T1");

        let (first, second) = tokio::join!(
            registry.ensure_attached(&target),
            registry.ensure_attached(&target)
        );

        assert!(first.is_err());
        assert!(second.is_err());
        assert_eq!(backend.attach_count(), 2);
        assert_eq!(registry.state(&target), SessionState::Detached);
    }

    #[tokio::test]
    async fn test_distinct_targets_attach_independently() {
        let (backend, _, registry) = registry();
        backend.set_attach_delay(Duration::from_millis(20));

        let t1 = t("T1");
        let t2 = t("T2");
        let (a, b) = tokio::join!(
            registry.ensure_attached(&t1),
            registry.ensure_attached(&t2)
        );

        a.expect("T1");
        b.expect("T2");
        assert_eq!(backend.attach_count(), 2);
        assert_eq!(registry.attached_count(), 2);
    }

    #[tokio::test]
    async fn test_already_attached_elsewhere_counts_as_attached() {
        let (backend, _, registry) = registry();
        backend.set_attach("T1", AttachBehavior::AlreadyAttached);

        registry.ensure_attached(&t("T1")).await.expect("treated as success");

        assert_eq!(registry.state(&t("T1")), SessionState::Attached);
        // Domains are not re-enabled on a session someone else owns.
        assert!(backend.methods().is_empty());
    }

    #[tokio::test]
    async fn test_attach_failure_leaves_detached() {
        let (backend, _, registry) = registry();
        backend.set_attach("T1", AttachBehavior::Fail);

        let err = registry.ensure_attached(&t("T1")).await.expect_err("fails");

        assert!(matches!(err, Error::Attach { .. }));
        assert_eq!(registry.state(&t("T1")), SessionState::Detached);
    }

    #[tokio::test]
    async fn test_enable_failure_is_attach_error() {
        let (backend, _, registry) = registry();
        backend.respond("Runtime.enable", Err(Error::command(-32000, "Not allowed")));

        let err = registry.ensure_attached(&t("T1")).await.expect_err("fails");

        assert!(matches!(err, Error::Attach { .. }));
        assert!(!registry.is_attached(&t("T1")));
    }

    #[tokio::test]
    async fn test_detach_all_counts_successes_and_clears() {
        let (backend, log, registry) = registry();
        for id in ["T1", "T2", "T3"] {
            registry.ensure_attached(&t(id)).await.expect("attach");
        }
        backend.fail_detach("T2");
        registry.focus(&t("T3")).await;
        log.append(&t("T1"), Message::outgoing(t("T1"), "Page.reload", json!({})));

        let count = registry.detach_all().await;

        assert_eq!(count, 2);
        assert_eq!(backend.detach_calls.load(Ordering::SeqCst), 3);
        assert_eq!(registry.attached_count(), 0);
        assert!(registry.focused().is_none());
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_detach_swallows_failure() {
        let (backend, _, registry) = registry();
        registry.ensure_attached(&t("T1")).await.expect("attach");
        backend.fail_detach("T1");

        assert!(!registry.detach(&t("T1")).await);
        assert_eq!(registry.state(&t("T1")), SessionState::Detached);
        assert!(!registry.detach(&t("T1")).await);
    }

    #[tokio::test]
    async fn test_focus_moves_once() {
        let (backend, _, registry) = registry();

        assert!(registry.focus(&t("T1")).await);
        assert!(!registry.focus(&t("T1")).await);
        assert!(registry.focus(&t("T2")).await);

        assert_eq!(backend.activate_calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.focused(), Some(t("T2")));
    }

    #[tokio::test]
    async fn test_focus_survives_activation_failure() {
        let (backend, _, registry) = registry();
        backend.fail_activate();

        assert!(registry.focus(&t("T1")).await);
        assert_eq!(registry.focused(), Some(t("T1")));
    }

    #[tokio::test]
    async fn test_notifications_forget_session_and_focus() {
        let (backend, _, registry) = registry();
        registry.ensure_attached(&t("T1")).await.expect("attach");
        registry.ensure_attached(&t("T2")).await.expect("attach");
        registry.focus(&t("T1")).await;

        registry.on_detached(&t("T1"), "canceled_by_user");
        assert!(!registry.is_attached(&t("T1")));
        assert!(registry.focused().is_none());

        registry.focus(&t("T2")).await;
        registry.on_target_destroyed(&t("T2"));
        assert_eq!(registry.attached_count(), 0);
        assert!(registry.focused().is_none());

        // Next use simply re-attaches.
        registry.ensure_attached(&t("T1")).await.expect("re-attach");
        assert_eq!(backend.attach_count(), 3);
    }
}
