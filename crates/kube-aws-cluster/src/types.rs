//! Domain types for preflight validation and stack orchestration.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kube_aws_core::CidrBlock;
use serde::{Deserialize, Serialize};

use crate::status::StackStatus;

/// Provider-assigned handle of a created stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackHandle(String);

impl StackHandle {
    /// Wrap a provider stack id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The provider stack id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key/value tag attached to a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackTag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl StackTag {
    /// Create a tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One provider-reported event for one stack resource.
///
/// Providers leave fields out freely, so everything but the status is
/// optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    /// Resource status at the time of the event.
    pub resource_status: StackStatus,
    /// Resource type, e.g. `AWS::EC2::Instance`.
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Logical id of the resource in the template.
    #[serde(default)]
    pub logical_resource_id: Option<String>,
    /// Provider explanation of the status.
    #[serde(default)]
    pub resource_status_reason: Option<String>,
    /// When the event happened.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl StackEvent {
    /// Create an event with only a status and resource type.
    pub fn new(status: impl Into<StackStatus>, resource_type: impl Into<String>) -> Self {
        Self {
            resource_status: status.into(),
            resource_type: Some(resource_type.into()),
            logical_resource_id: None,
            resource_status_reason: None,
            timestamp: None,
        }
    }

    /// Set the logical resource id.
    #[must_use]
    pub fn with_logical_id(mut self, id: impl Into<String>) -> Self {
        self.logical_resource_id = Some(id.into());
        self
    }

    /// Set the status reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.resource_status_reason = Some(reason.into());
        self
    }

    /// Set the event timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Live state of a VPC the cluster is placed into.
///
/// Always fetched fresh; never cached between validations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingNetworkState {
    /// VPC id.
    pub vpc_id: String,
    /// VPC CIDR exactly as the provider reports it.
    pub vpc_cidr: String,
    /// CIDRs of the subnets already in the VPC.
    pub subnet_cidrs: Vec<CidrBlock>,
}

/// A hosted zone and the record names it already holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZoneRecord {
    /// Zone id.
    pub id: String,
    /// Zone name with a trailing dot.
    pub name: String,
    /// Record names present in the zone, with trailing dots.
    pub record_names: BTreeSet<String>,
}

/// Summary of a stack returned after waiting or on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackInfo {
    /// Provider stack id.
    pub handle: StackHandle,
    /// Stack name.
    pub name: String,
    /// Current status.
    pub status: StackStatus,
    /// Reason for the current status, when reported.
    pub status_reason: Option<String>,
    /// Stack outputs (e.g. the controller address).
    pub outputs: BTreeMap<String, String>,
}

/// Configuration for stack orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds between stack status polls.
    #[serde(default = "OrchestratorConfig::default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl OrchestratorConfig {
    const fn default_poll_interval() -> u64 {
        3
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `KUBE_AWS_STACK_POLL_INTERVAL_SECS`: seconds between status polls
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("KUBE_AWS_STACK_POLL_INTERVAL_SECS") {
            match val.parse() {
                Ok(n) if n > 0 => config.poll_interval_seconds = n,
                _ => tracing::warn!(
                    value = %val,
                    "Ignoring invalid KUBE_AWS_STACK_POLL_INTERVAL_SECS"
                ),
            }
        }

        config
    }

    /// Get the poll interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: Self::default_poll_interval(),
        }
    }
}
