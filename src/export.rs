//! Message log export.
//!
//! Exports are a pretty-printed JSON array of [`Message`]s, two-space
//! indented, in log order. [`from_json`] reads them back unchanged.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`to_json`] | Serialize messages |
//! | [`from_json`] | Parse an export |
//! | [`file_name`] | `cdp-<target>-<timestamp>.json` |
//! | [`write`] | Write an export into a directory |

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::Result;
use crate::identifiers::TargetId;
use crate::protocol::Message;

// ============================================================================
// Functions
// ============================================================================

/// Serializes messages as an indented JSON array.
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if serialization fails.
pub fn to_json(messages: &[Message]) -> Result<String> {
    Ok(serde_json::to_string_pretty(messages)?)
}

/// Parses an export produced by [`to_json`].
///
/// # Errors
///
/// Returns [`crate::Error::Json`] if `text` is not a message array.
pub fn from_json(text: &str) -> Result<Vec<Message>> {
    Ok(serde_json::from_str(text)?)
}

/// Builds the export file name for `target_id` at `at`.
///
/// Colons are not valid in file names on every platform, so the time part
/// uses dashes.
#[must_use]
pub fn file_name(target_id: &TargetId, at: DateTime<Utc>) -> String {
    format!("cdp-{target_id}-{}.json", at.format("%Y-%m-%dT%H-%M-%S"))
}

/// Writes an export of `messages` into `dir` and returns the file path.
///
/// # Errors
///
/// - [`crate::Error::Json`] if serialization fails
/// - [`crate::Error::Io`] if the file cannot be written
pub async fn write(dir: &Path, target_id: &TargetId, messages: &[Message]) -> Result<PathBuf> {
    let path = dir.join(file_name(target_id, Utc::now()));
    let json = to_json(messages)?;

    tokio::fs::write(&path, json).await?;

    info!(
        target_id = %target_id,
        count = messages.len(),
        path = %path.display(),
        "Messages exported"
    );
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================
