//! Bulk command batches.
//!
//! A batch is free-form text listing commands one after another, each
//! optionally followed by a JSON parameter body:
//!
//! ```text
//! Page.enable
//! Runtime.evaluate
//! {
//!   "expression": "document.title",
//!   "returnByValue": true
//! }
//! ```
//!
//! A body starts on the line after its method.
//!
//! The whole batch is parsed before anything runs; a malformed body aborts
//! the batch. Parsed commands then run strictly one after another, and a
//! failing command never stops the ones after it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::{LogicalFrameId, TargetId};

use super::executor::CommandExecutor;

// ============================================================================
// Constants
// ============================================================================

/// `Domain.method` line.
static METHOD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Za-z0-9]*\.[a-z][A-Za-z0-9]*$").expect("method pattern is valid")
});

// ============================================================================
// Types
// ============================================================================

/// One parsed command of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkCommand {
    /// CDP method.
    pub method: String,
    /// Parameter object (`{}` when the batch gave none).
    pub params: Value,
}

/// Result of one batch command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    /// CDP method.
    pub method: String,
    /// Whether the command succeeded.
    pub success: bool,
    /// Command result (success only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error text (failure only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcomes of a whole batch, in command order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkReport {
    /// Per-command outcomes.
    pub outcomes: Vec<BulkOutcome>,
}

impl BulkReport {
    /// Number of commands that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// Number of commands that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// The failed outcomes, for reporting.
    pub fn failures(&self) -> impl Iterator<Item = &BulkOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

/// Progress of the batch currently running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    /// Commands finished so far.
    pub completed: usize,
    /// Commands in the batch.
    pub total: usize,
    /// Method about to run, if any.
    pub current: Option<String>,
}

impl BatchProgress {
    /// Returns `true` once every command has finished.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.completed == self.total
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Tracks `{`/`}` depth across lines, ignoring braces inside JSON strings.
#[derive(Debug, Default)]
struct BraceScanner {
    depth: i64,
    in_string: bool,
    escaped: bool,
}

impl BraceScanner {
    fn feed(&mut self, line: &str) {
        for c in line.chars() {
            if self.in_string {
                match c {
                    _ if self.escaped => self.escaped = false,
                    '\\' => self.escaped = true,
                    '"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }

            match c {
                '"' => self.in_string = true,
                '{' => self.depth += 1,
                '}' => self.depth -= 1,
                _ => {}
            }
        }
    }

    fn is_balanced(&self) -> bool {
        self.depth <= 0 && !self.in_string
    }
}

/// Body being accumulated for a command.
struct PendingBody {
    text: String,
    scanner: BraceScanner,
}

/// Parses batch text into commands.
///
/// # Errors
///
/// Returns [`Error::BatchParse`] naming the offending command (or line) for
/// malformed JSON, a non-object body, an unterminated body or a stray line
/// that is neither a method nor a body.
pub fn parse_batch(text: &str) -> Result<Vec<BulkCommand>> {
    let mut commands = Vec::new();
    let mut current: Option<String> = None;
    let mut body: Option<PendingBody> = None;

    for (index, line) in text.lines().enumerate() {
        if let Some(pending) = body.as_mut() {
            pending.text.push('\n');
            pending.text.push_str(line);
            pending.scanner.feed(line);

            if pending.scanner.is_balanced() {
                let text = std::mem::take(&mut pending.text);
                body = None;
                if let Some(method) = current.take() {
                    commands.push(finish_body(method, &text)?);
                }
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if METHOD_LINE.is_match(trimmed) {
            if let Some(method) = current.replace(trimmed.to_string()) {
                commands.push(BulkCommand {
                    method,
                    params: Value::Object(Map::new()),
                });
            }
            continue;
        }

        let Some(method) = current.take() else {
            return Err(Error::batch_parse(
                format!("line {}", index + 1),
                format!("expected a method like Domain.method, found {trimmed:?}"),
            ));
        };

        let mut scanner = BraceScanner::default();
        scanner.feed(line);
        if scanner.is_balanced() {
            commands.push(finish_body(method, line)?);
        } else {
            current = Some(method);
            body = Some(PendingBody {
                text: line.to_string(),
                scanner,
            });
        }
    }

    match (current, body) {
        (Some(method), Some(_)) => Err(Error::batch_parse(
            method,
            "unterminated parameter body",
        )),
        (Some(method), None) => {
            commands.push(BulkCommand {
                method,
                params: Value::Object(Map::new()),
            });
            Ok(commands)
        }
        (None, _) => Ok(commands),
    }
}

/// Parses an accumulated body into a command.
fn finish_body(method: String, text: &str) -> Result<BulkCommand> {
    let params: Value = match serde_json::from_str(text) {
        Ok(params) => params,
        Err(e) => return Err(Error::batch_parse(method, e.to_string())),
    };

    if !params.is_object() {
        return Err(Error::batch_parse(method, "parameters must be a JSON object"));
    }

    Ok(BulkCommand { method, params })
}

// ============================================================================
// BulkRunner
// ============================================================================

/// Runs parsed batches sequentially through a [`CommandExecutor`].
pub struct BulkRunner {
    executor: CommandExecutor,
    progress: watch::Sender<BatchProgress>,
}

impl BulkRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(executor: CommandExecutor) -> Self {
        let (progress, _) = watch::channel(BatchProgress::default());
        Self { executor, progress }
    }

    /// Subscribes to batch progress.
    #[must_use]
    pub fn subscribe_progress(&self) -> watch::Receiver<BatchProgress> {
        self.progress.subscribe()
    }

    /// Parses `text` and runs every command on `frame` of `target_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchParse`] if the text is malformed; nothing runs
    /// in that case. Command failures are reported in the [`BulkReport`].
    pub async fn run(
        &self,
        target_id: &TargetId,
        frame: LogicalFrameId,
        text: &str,
    ) -> Result<BulkReport> {
        let commands = parse_batch(text)?;
        Ok(self.run_commands(target_id, frame, commands).await)
    }

    /// Runs already parsed commands, one at a time.
    pub async fn run_commands(
        &self,
        target_id: &TargetId,
        frame: LogicalFrameId,
        commands: Vec<BulkCommand>,
    ) -> BulkReport {
        let total = commands.len();
        let mut outcomes = Vec::with_capacity(total);

        debug!(target_id = %target_id, total, "Running batch");

        for (index, command) in commands.into_iter().enumerate() {
            self.progress.send_replace(BatchProgress {
                completed: index,
                total,
                current: Some(command.method.clone()),
            });

            let outcome = match self
                .executor
                .execute(target_id, frame, &command.method, command.params)
                .await
            {
                Ok(result) => BulkOutcome {
                    method: command.method,
                    success: true,
                    result: Some(result),
                    error: None,
                },
                Err(e) => BulkOutcome {
                    method: command.method,
                    success: false,
                    result: None,
                    error: Some(e.to_string()),
                },
            };
            outcomes.push(outcome);
        }

        self.progress.send_replace(BatchProgress {
            completed: total,
            total,
            current: None,
        });

        let report = BulkReport { outcomes };
        info!(
            target_id = %target_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch finished"
        );
        report
    }
}

// ============================================================================
// Tests
// ============================================================================
