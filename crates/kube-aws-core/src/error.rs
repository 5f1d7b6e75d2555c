//! Common error types for kube-aws.
//!
//! These errors come from purely local checks: parsing network notation and
//! validating the declared cluster configuration before any provider call.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by local parsing and configuration checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Text that should hold an IPv4 address or CIDR block could not be parsed.
    #[error("invalid network format {input:?}: {reason}")]
    InvalidNetworkFormat {
        /// The offending input.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The declared cluster configuration is inconsistent with itself.
    #[error("invalid cluster configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    pub(crate) fn network_format(input: &str, reason: &'static str) -> Self {
        Self::InvalidNetworkFormat {
            input: input.to_string(),
            reason,
        }
    }
}
