//! Inspector configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use cdp_inspector::InspectorOptions;
//!
//! let options = InspectorOptions::new()
//!     .with_log_capacity(10_000)
//!     .with_required_domains(["Page", "Runtime", "Network"])
//!     .with_command_timeout(Duration::from_secs(10));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::session::{DEFAULT_LOG_CAPACITY, SessionConfig};
use crate::transport::connection::DEFAULT_COMMAND_TIMEOUT;

// ============================================================================
// Constants
// ============================================================================

/// Protocol version requested on attach.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.3";

/// Domains enabled on every fresh session.
const DEFAULT_DOMAINS: [&str; 2] = ["Page", "Runtime"];

// ============================================================================
// InspectorOptions
// ============================================================================

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorOptions {
    /// Protocol version requested on attach (`major.minor`).
    pub protocol_version: String,

    /// Domains enabled right after attach.
    pub required_domains: Vec<String>,

    /// Per-target message cap.
    pub log_capacity: usize,

    /// Bring the target to the foreground when a command switches to it.
    pub focus_on_execute: bool,

    /// Per-command response timeout.
    pub command_timeout: Duration,
}

impl Default for InspectorOptions {
    fn default() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            required_domains: DEFAULT_DOMAINS.iter().map(ToString::to_string).collect(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            focus_on_execute: true,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl InspectorOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the protocol version requested on attach.
    #[inline]
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Replaces the domains enabled after attach.
    #[inline]
    #[must_use]
    pub fn with_required_domains(
        mut self,
        domains: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.required_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-target message cap.
    #[inline]
    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Enables or disables activating targets on focus change.
    #[inline]
    #[must_use]
    pub fn with_focus_on_execute(mut self, enabled: bool) -> Self {
        self.focus_on_execute = enabled;
        self
    }

    /// Sets the per-command response timeout.
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl InspectorOptions {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero log capacity, a zero timeout or a
    /// protocol version that is not `major.minor`.
    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            return Err(Error::config("Log capacity must be greater than zero"));
        }

        if self.command_timeout.is_zero() {
            return Err(Error::config("Command timeout must be greater than zero"));
        }

        let well_formed = self
            .protocol_version
            .split_once('.')
            .is_some_and(|(major, minor)| {
                major.parse::<u32>().is_ok() && minor.parse::<u32>().is_ok()
            });
        if !well_formed {
            return Err(Error::config(format!(
                "Protocol version must look like \"1.3\", got {:?}",
                self.protocol_version
            )));
        }

        if let Some(domain) = self
            .required_domains
            .iter()
            .find(|domain| domain.is_empty() || domain.contains('.'))
        {
            return Err(Error::config(format!("Invalid domain name {domain:?}")));
        }

        Ok(())
    }

    /// Session settings derived from these options.
    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig {
            protocol_version: self.protocol_version.clone(),
            required_domains: self.required_domains.clone(),
            activate_on_focus: self.focus_on_execute,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = InspectorOptions::default();
        assert_eq!(options.protocol_version, "1.3");
        assert_eq!(options.required_domains, vec!["Page", "Runtime"]);
        assert_eq!(options.log_capacity, 100_000);
        assert!(options.focus_on_execute);
        assert_eq!(options.command_timeout, Duration::from_secs(30));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let options = InspectorOptions::new()
            .with_protocol_version("1.2")
            .with_required_domains(["Network"])
            .with_log_capacity(5)
            .with_focus_on_execute(false)
            .with_command_timeout(Duration::from_millis(500));

        let config = options.session_config();
        assert_eq!(config.protocol_version, "1.2");
        assert_eq!(config.required_domains, vec!["Network"]);
        assert!(!config.activate_on_focus);
        assert_eq!(options.log_capacity, 5);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = InspectorOptions::new()
            .with_log_capacity(0)
            .validate()
            .expect_err("invalid");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_bad_version_rejected() {
        for version in ["", "1", "one.three", "1.3.0"] {
            assert!(
                InspectorOptions::new()
                    .with_protocol_version(version)
                    .validate()
                    .is_err(),
                "{version:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_bad_domain_rejected() {
        assert!(
            InspectorOptions::new()
                .with_required_domains(["Page.enable"])
                .validate()
                .is_err()
        );
    }
}
