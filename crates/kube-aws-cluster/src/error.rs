//! Error types for preflight validation and stack orchestration.
//!
//! Validator errors describe a mismatch between the declared configuration
//! and the provider's state; they need a human fix and are never retried.
//! Provider errors are carried as [`ApiError`] so transport failures stay
//! distinguishable from service answers.

use kube_aws_core::CoreError;
use thiserror::Error;

use crate::api::ApiError;
use crate::status::StackStatus;

/// A result type using `ClusterError`.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors that can occur while validating or provisioning a cluster.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Local configuration or network notation problem.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The referenced VPC does not exist.
    #[error("could not find vpc {vpc_id} in region {region}")]
    NetworkNotFound {
        /// The configured VPC id.
        vpc_id: String,
        /// The configured region.
        region: String,
    },

    /// The declared VPC CIDR differs from the live one.
    #[error("configured vpcCIDR ({declared}) does not match existing vpc {vpc_id} cidr ({actual})")]
    NetworkCidrMismatch {
        /// The configured VPC id.
        vpc_id: String,
        /// The configured VPC CIDR.
        declared: String,
        /// The CIDR the provider reports.
        actual: String,
    },

    /// The declared instance subnet overlaps an existing subnet.
    #[error("instance cidr ({instance_cidr}) conflicts with existing subnet cidr={subnet_cidr}")]
    SubnetCidrOverlap {
        /// The configured instance CIDR.
        instance_cidr: String,
        /// The conflicting subnet's CIDR.
        subnet_cidr: String,
    },

    /// The configured key pair does not exist in the region.
    #[error("key pair {key_name} does not exist in region {region}")]
    KeyPairNotFound {
        /// The configured key name.
        key_name: String,
        /// The configured region.
        region: String,
    },

    /// No hosted zone matches the configured name.
    #[error("hosted zone {0} does not exist")]
    HostedZoneNotFound(String),

    /// The external DNS name is already taken in the hosted zone.
    #[error("RecordSet for \"{name}\" already exists in Hosted Zone \"{zone}\"")]
    DnsRecordConflict {
        /// The conflicting record name.
        name: String,
        /// The hosted zone name.
        zone: String,
    },

    /// The stack reached a failed terminal status.
    #[error("{}", format_stack_failure(.status, .reason.as_deref(), .messages))]
    StackFailed {
        /// Terminal stack status.
        status: StackStatus,
        /// Stack-level status reason, when reported.
        reason: Option<String>,
        /// Distilled resource failure messages.
        messages: Vec<String>,
    },

    /// The stack settled in a status that is neither success nor failure.
    #[error("unexpected stack status: {0}")]
    UnexpectedStackStatus(StackStatus),

    /// The stack does not exist.
    #[error("stack {0} does not exist")]
    StackNotFound(String),

    /// A provider call failed. Submission errors are surfaced unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),
}

fn format_stack_failure(status: &StackStatus, reason: Option<&str>, messages: &[String]) -> String {
    let mut msg = format!(
        "Stack creation failed: {status} : {}",
        reason.unwrap_or_default()
    );
    if !messages.is_empty() {
        msg.push_str("\n\nPrinting the most recent failed stack events:\n");
        msg.push_str(&messages.join("\n"));
    }
    msg
}

impl ClusterError {
    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Api(ApiError::Transport(_)))
    }

    /// Returns true for configuration/reality mismatches found before
    /// submission. These abort provisioning and need a human fix.
    #[must_use]
    pub const fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::Core(_)
                | Self::NetworkNotFound { .. }
                | Self::NetworkCidrMismatch { .. }
                | Self::SubnetCidrOverlap { .. }
                | Self::KeyPairNotFound { .. }
                | Self::HostedZoneNotFound(_)
                | Self::DnsRecordConflict { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_only_for_transport() {
        assert!(ClusterError::Api(ApiError::Transport("timeout".to_string())).is_retriable());
        assert!(!ClusterError::Api(ApiError::service("Throttling", "slow down")).is_retriable());
        assert!(!ClusterError::HostedZoneNotFound("x".to_string()).is_retriable());
    }

    #[test]
    fn preflight_classification() {
        assert!(ClusterError::KeyPairNotFound {
            key_name: "k".to_string(),
            region: "r".to_string()
        }
        .is_preflight());
        assert!(ClusterError::Core(CoreError::InvalidConfig("x".to_string())).is_preflight());
        assert!(!ClusterError::StackNotFound("s".to_string()).is_preflight());
        assert!(!ClusterError::Api(ApiError::Transport("t".to_string())).is_preflight());
    }

    #[test]
    fn stack_failure_message() {
        let err = ClusterError::StackFailed {
            status: StackStatus::CreateFailed,
            reason: Some("The following resource(s) failed to create".to_string()),
            messages: vec![
                "CREATE_FAILED Computer test_comp BAD HD".to_string(),
                "CREATE_FAILED Computer".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Stack creation failed: CREATE_FAILED : The following resource(s) failed to create\n\n\
             Printing the most recent failed stack events:\n\
             CREATE_FAILED Computer test_comp BAD HD\n\
             CREATE_FAILED Computer"
        );
    }

    #[test]
    fn stack_failure_without_events() {
        let err = ClusterError::StackFailed {
            status: StackStatus::RollbackComplete,
            reason: None,
            messages: vec![],
        };
        assert_eq!(err.to_string(), "Stack creation failed: ROLLBACK_COMPLETE : ");
    }

    #[test]
    fn api_errors_pass_through() {
        let err: ClusterError = ApiError::service("AlreadyExistsException", "Stack [c] already exists").into();
        assert_eq!(err.to_string(), "AlreadyExistsException: Stack [c] already exists");
    }
}
