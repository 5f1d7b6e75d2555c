//! Provider API seams.
//!
//! Each cloud service the preflight and orchestration code talks to is
//! reached through one narrow trait carrying only the calls made here, so
//! tests can substitute the in-memory doubles from [`crate::mock`].
//!
//! Implementations return [`ApiError`], which keeps provider-reported
//! service errors (with their error code) apart from transport failures.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::StackStatus;
use crate::types::{StackEvent, StackHandle, StackTag};

/// Error code the compute service reports for an unknown key pair.
pub const KEY_PAIR_NOT_FOUND: &str = "InvalidKeyPair.NotFound";

/// Error code the compute service reports for an unknown VPC id.
pub const VPC_NOT_FOUND: &str = "InvalidVpcID.NotFound";

/// A result type using `ApiError`.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors returned by provider API implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The service processed the request and rejected it.
    #[error("{code}: {message}")]
    Service {
        /// Provider error code, e.g. `InvalidKeyPair.NotFound`.
        code: String,
        /// Provider message.
        message: String,
    },

    /// The request did not get a service answer (network, auth, throttling).
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// Create a service error.
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The provider error code, if the service answered.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            Self::Transport(_) => None,
        }
    }

    /// Returns true if the service answered with the given error code.
    #[must_use]
    pub fn has_code(&self, expected: &str) -> bool {
        self.code() == Some(expected)
    }
}

/// A VPC as described by the compute service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpc {
    /// VPC id.
    pub vpc_id: String,
    /// Primary IPv4 CIDR, exactly as the provider reports it.
    pub cidr_block: Option<String>,
}

/// A subnet as described by the compute service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Subnet id, when reported.
    pub subnet_id: Option<String>,
    /// IPv4 CIDR, when reported.
    pub cidr_block: Option<String>,
}

/// A key pair as described by the compute service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairInfo {
    /// Key pair name.
    pub key_name: String,
    /// Key fingerprint, when reported.
    pub fingerprint: Option<String>,
}

/// A hosted zone as listed by the DNS service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    /// Zone id.
    pub id: String,
    /// Zone name, fully qualified with a trailing dot.
    pub name: String,
}

/// A record set as listed by the DNS service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    /// Record name, fully qualified with a trailing dot.
    pub name: String,
    /// Record type (`A`, `CNAME`, ...), when reported.
    pub record_type: Option<String>,
}

/// A stack creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStackRequest {
    /// Stack name.
    pub stack_name: String,
    /// Rendered template document.
    pub template_body: String,
    /// Tags to attach. Always present, possibly empty.
    pub tags: Vec<StackTag>,
}

/// A stack as described by the orchestration service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
    /// Provider-assigned stack id.
    pub stack_id: String,
    /// Stack name.
    pub stack_name: String,
    /// Current status.
    pub status: StackStatus,
    /// Reason for the current status, when reported.
    pub status_reason: Option<String>,
    /// Stack outputs keyed by output name.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

/// Compute service calls used to inspect an existing network.
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Describe a VPC by id. Returns `None` if the provider lists no match.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; some providers report an
    /// unknown id as [`VPC_NOT_FOUND`] instead of an empty result.
    async fn describe_vpc(&self, vpc_id: &str) -> ApiResult<Option<Vpc>>;

    /// List the subnets belonging to a VPC (filtered by the provider).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn describe_subnets(&self, vpc_id: &str) -> ApiResult<Vec<Subnet>>;
}

/// Compute service calls used to check instance credentials.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Describe a key pair by name.
    ///
    /// # Errors
    ///
    /// Returns a service error with code [`KEY_PAIR_NOT_FOUND`] if the key
    /// pair does not exist, or any other error if the request fails.
    async fn describe_key_pair(&self, key_name: &str) -> ApiResult<KeyPairInfo>;
}

/// DNS service calls.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// List hosted zones starting at `dns_name`.
    ///
    /// Providers may return zones that merely sort after `dns_name`; callers
    /// filter for an exact match.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_hosted_zones_by_name(&self, dns_name: &str) -> ApiResult<Vec<HostedZone>>;

    /// List all record sets in a zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_resource_record_sets(&self, zone_id: &str) -> ApiResult<Vec<ResourceRecordSet>>;
}

/// Orchestration service calls.
#[async_trait]
pub trait StackApi: Send + Sync {
    /// Submit a stack creation request.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection (template errors, name collisions,
    /// quota) or a transport error.
    async fn create_stack(&self, request: &CreateStackRequest) -> ApiResult<StackHandle>;

    /// Describe a stack by name or id. Returns `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn describe_stack(&self, stack: &str) -> ApiResult<Option<StackDescription>>;

    /// List a stack's resource events in the order the provider returns them.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn describe_stack_events(&self, stack: &str) -> ApiResult<Vec<StackEvent>>;

    /// Ask the provider to validate a template document.
    ///
    /// # Errors
    ///
    /// Returns the provider's validation error verbatim.
    async fn validate_template(&self, template_body: &str) -> ApiResult<()>;

    /// Request deletion of a stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn delete_stack(&self, stack_name: &str) -> ApiResult<()>;
}
