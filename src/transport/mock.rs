//! Scripted in-memory backend for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::identifiers::TargetId;
use crate::protocol::FrameTree;

use super::backend::DebuggerBackend;

/// How `attach` should behave for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttachBehavior {
    Succeed,
    AlreadyAttached,
    Fail,
}

/// Backend double that records every call.
pub(crate) struct MockBackend {
    attach_behavior: Mutex<FxHashMap<TargetId, AttachBehavior>>,
    attach_delay: Mutex<Option<Duration>>,
    failing_detach: Mutex<FxHashSet<TargetId>>,
    frame_trees: Mutex<FxHashMap<TargetId, FrameTree>>,
    responses: Mutex<FxHashMap<String, Result<Value>>>,
    failing_activate: Mutex<bool>,
    pub(crate) attach_calls: AtomicUsize,
    pub(crate) detach_calls: AtomicUsize,
    pub(crate) activate_calls: AtomicUsize,
    pub(crate) commands: Mutex<Vec<(TargetId, String, Value)>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            attach_behavior: Mutex::new(FxHashMap::default()),
            attach_delay: Mutex::new(None),
            failing_detach: Mutex::new(FxHashSet::default()),
            frame_trees: Mutex::new(FxHashMap::default()),
            responses: Mutex::new(FxHashMap::default()),
            failing_activate: Mutex::new(false),
            attach_calls: AtomicUsize::new(0),
            detach_calls: AtomicUsize::new(0),
            activate_calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_attach(&self, target: &str, behavior: AttachBehavior) {
        self.attach_behavior
            .lock()
            .insert(TargetId::from(target), behavior);
    }

    /// Makes every attach take `delay` before answering.
    pub(crate) fn set_attach_delay(&self, delay: Duration) {
        *self.attach_delay.lock() = Some(delay);
    }

    pub(crate) fn fail_detach(&self, target: &str) {
        self.failing_detach.lock().insert(TargetId::from(target));
    }

    pub(crate) fn fail_activate(&self) {
        *self.failing_activate.lock() = true;
    }

    pub(crate) fn set_frame_tree(&self, target: &str, tree: FrameTree) {
        self.frame_trees.lock().insert(TargetId::from(target), tree);
    }

    /// Scripts the reply of a method. Unscripted methods echo their params.
    pub(crate) fn respond(&self, method: &str, response: Result<Value>) {
        self.responses.lock().insert(method.to_string(), response);
    }

    /// Returns the methods sent so far, in order.
    pub(crate) fn methods(&self) -> Vec<String> {
        self.commands
            .lock()
            .iter()
            .map(|(_, method, _)| method.clone())
            .collect()
    }

    pub(crate) fn attach_count(&self) -> usize {
        self.attach_calls.load(Ordering::SeqCst)
    }
}

/// Rebuilds a scripted reply (errors are not `Clone`).
fn replay(response: &Result<Value>) -> Result<Value> {
    match response {
        Ok(value) => Ok(value.clone()),
        Err(Error::Command { code, message }) => Err(Error::command(*code, message.clone())),
        Err(other) => Err(Error::protocol(other.to_string())),
    }
}

#[async_trait]
impl DebuggerBackend for MockBackend {
    async fn attach(&self, target_id: &TargetId, _protocol_version: &str) -> Result<()> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.attach_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let behavior = self
            .attach_behavior
            .lock()
            .get(target_id)
            .copied()
            .unwrap_or(AttachBehavior::Succeed);

        match behavior {
            AttachBehavior::Succeed => Ok(()),
            AttachBehavior::AlreadyAttached => Err(Error::already_attached(target_id.clone())),
            AttachBehavior::Fail => Err(Error::attach(target_id.clone(), "Cannot access target")),
        }
    }

    async fn detach(&self, target_id: &TargetId) -> Result<()> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_detach.lock().contains(target_id) {
            return Err(Error::detach(target_id.clone(), "Debugger is not attached"));
        }
        Ok(())
    }

    async fn send_command(
        &self,
        target_id: &TargetId,
        method: &str,
        params: Value,
    ) -> Result<Value> {
        self.commands
            .lock()
            .push((target_id.clone(), method.to_string(), params.clone()));

        if method == "Page.getFrameTree" {
            let tree = self
                .frame_trees
                .lock()
                .get(target_id)
                .cloned()
                .ok_or_else(|| Error::command(-32000, "No frame tree"))?;
            return Ok(json!({ "frameTree": tree }));
        }

        if let Some(response) = self.responses.lock().get(method) {
            return replay(response);
        }

        Ok(json!({ "echo": params }))
    }

    async fn activate(&self, _target_id: &TargetId) -> Result<()> {
        self.activate_calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing_activate.lock() {
            return Err(Error::protocol("No target with given id found"));
        }
        Ok(())
    }
}
