//! Builder for connecting an [`Inspector`] to a browser.
//!
//! # Example
//!
//! ```no_run
//! use cdp_inspector::Inspector;
//!
//! # async fn example() -> cdp_inspector::Result<()> {
//! let inspector = Inspector::builder()
//!     .endpoint("ws://127.0.0.1:9222/devtools/browser/0f3c…")
//!     .log_capacity(20_000)
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::{CdpBackend, DebuggerBackend};

use super::core::Inspector;
use super::options::InspectorOptions;

// ============================================================================
// InspectorBuilder
// ============================================================================

/// Builder for configuring an [`Inspector`].
///
/// Use [`Inspector::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct InspectorBuilder {
    /// Browser DevTools WebSocket URL.
    endpoint: Option<String>,
    /// Engine options.
    options: InspectorOptions,
}

impl InspectorBuilder {
    /// Creates a builder with default options and no endpoint.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the browser's DevTools WebSocket URL.
    ///
    /// # Arguments
    ///
    /// * `url` - e.g. `ws://127.0.0.1:9222/devtools/browser/<id>`
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Replaces all engine options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: InspectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the per-target message cap.
    #[inline]
    #[must_use]
    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.options.log_capacity = capacity;
        self
    }

    /// Sets the per-command response timeout.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.options.command_timeout = timeout;
        self
    }

    /// Validates the configuration, connects and starts the engine.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is missing or not `ws`/`wss`, or
    ///   the options are invalid
    /// - [`Error::Connection`] / [`Error::ConnectionTimeout`] if the browser
    ///   cannot be reached
    pub async fn connect(self) -> Result<Inspector> {
        self.options.validate()?;
        let endpoint = self.validate_endpoint()?;

        let (backend, notifications) =
            CdpBackend::connect(endpoint.as_str(), self.options.command_timeout).await?;
        let backend: Arc<dyn DebuggerBackend> = backend;

        Inspector::with_backend(backend, notifications, self.options)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl InspectorBuilder {
    /// Validates the endpoint URL.
    fn validate_endpoint(&self) -> Result<Url> {
        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            Error::config(
                "Endpoint is required. Use .endpoint() to set it.\n\
                 Example: Inspector::builder().endpoint(\"ws://127.0.0.1:9222/devtools/browser/<id>\")",
            )
        })?;

        let url = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid endpoint {endpoint:?}: {e}")))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "Endpoint must use ws:// or wss://, got {}://",
                url.scheme()
            )));
        }

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = InspectorBuilder::new();
        assert!(builder.endpoint.is_none());
        assert_eq!(builder.options, InspectorOptions::default());
    }

    #[test]
    fn test_setters() {
        let builder = InspectorBuilder::new()
            .endpoint("ws://127.0.0.1:9222/devtools/browser/x")
            .log_capacity(10)
            .command_timeout(Duration::from_secs(2));

        assert_eq!(builder.options.log_capacity, 10);
        assert_eq!(builder.options.command_timeout, Duration::from_secs(2));
        assert!(builder.validate_endpoint().is_ok());
    }

    #[test]
    fn test_missing_endpoint() {
        let err = InspectorBuilder::new().validate_endpoint().expect_err("missing");
        assert!(err.to_string().contains("Endpoint is required"));
    }

    #[test]
    fn test_rejects_http_endpoint() {
        let err = InspectorBuilder::new()
            .endpoint("http://127.0.0.1:9222/json/version")
            .validate_endpoint()
            .expect_err("http");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_rejects_garbage_endpoint() {
        assert!(
            InspectorBuilder::new()
                .endpoint("not a url")
                .validate_endpoint()
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_connect_validates_options_first() {
        let err = InspectorBuilder::new()
            .endpoint("ws://127.0.0.1:1/devtools/browser/x")
            .log_capacity(0)
            .connect()
            .await
            .expect_err("invalid options");
        assert!(matches!(err, Error::Config { .. }));
    }
}
