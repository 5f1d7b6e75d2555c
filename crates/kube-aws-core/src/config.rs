//! Declared cluster configuration.
//!
//! `ClusterConfig` is the already-parsed form of the user's cluster file. The
//! serde field names match the keys users write (`vpcCIDR`, `instanceCIDR`,
//! `externalDNSName`, ...). Reading and templating the file happen elsewhere.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cidr::{self, CidrBlock};
use crate::error::{CoreError, Result};

/// The user's declared intent for a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    /// Cloud region the cluster is deployed into.
    pub region: String,
    /// Availability zone for the instance subnet.
    pub availability_zone: String,
    /// Cluster name, also used as the stack name.
    pub cluster_name: String,
    /// Name of the pre-existing key pair installed on instances.
    pub key_name: String,
    /// DNS name the API endpoint is reachable at.
    #[serde(rename = "externalDNSName")]
    pub external_dns_name: String,
    /// ARN of the KMS key used to encrypt cluster assets.
    pub kms_key_arn: String,

    /// CIDR of the VPC. Must match the live VPC when `vpc_id` is set.
    #[serde(rename = "vpcCIDR")]
    pub vpc_cidr: String,
    /// Existing VPC to reuse. Empty means a new VPC is created.
    pub vpc_id: String,
    /// CIDR of the subnet cluster instances are placed in.
    #[serde(rename = "instanceCIDR")]
    pub instance_cidr: String,
    /// Private address of the controller instance.
    #[serde(rename = "controllerIP")]
    pub controller_ip: String,
    /// Existing route table to associate the instance subnet with.
    pub route_table_id: String,

    /// Whether a DNS record for `external_dns_name` is created.
    pub create_record_set: bool,
    /// TTL of the created record, in seconds.
    #[serde(rename = "recordSetTTL")]
    pub record_set_ttl: i64,
    /// Hosted zone the record is created in.
    pub hosted_zone: String,

    /// Tags attached to the stack. Empty means no tags.
    pub stack_tags: BTreeMap<String, String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            availability_zone: String::new(),
            cluster_name: String::new(),
            key_name: String::new(),
            external_dns_name: String::new(),
            kms_key_arn: String::new(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            vpc_id: String::new(),
            instance_cidr: "10.0.0.0/24".to_string(),
            controller_ip: "10.0.0.50".to_string(),
            route_table_id: String::new(),
            create_record_set: false,
            record_set_ttl: 300,
            hosted_zone: String::new(),
            stack_tags: BTreeMap::new(),
        }
    }
}

impl ClusterConfig {
    /// Name of the stack provisioned for this cluster.
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.cluster_name
    }

    /// Returns true if the cluster is placed into an existing VPC.
    #[must_use]
    pub fn reuses_vpc(&self) -> bool {
        !self.vpc_id.is_empty()
    }

    /// Parsed `vpc_cidr`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidNetworkFormat` if the value is malformed.
    pub fn vpc_block(&self) -> Result<CidrBlock> {
        CidrBlock::parse(&self.vpc_cidr)
    }

    /// Parsed `instance_cidr`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidNetworkFormat` if the value is malformed.
    pub fn instance_block(&self) -> Result<CidrBlock> {
        CidrBlock::parse(&self.instance_cidr)
    }

    /// Check the configuration for internal consistency.
    ///
    /// No provider state is consulted; see the cluster crate for the checks
    /// against live resources.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` for missing or contradictory fields
    /// and `CoreError::InvalidNetworkFormat` for malformed addresses.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("externalDNSName", &self.external_dns_name),
            ("keyName", &self.key_name),
            ("region", &self.region),
            ("availabilityZone", &self.availability_zone),
            ("clusterName", &self.cluster_name),
            ("kmsKeyArn", &self.kms_key_arn),
        ] {
            if value.is_empty() {
                return Err(CoreError::InvalidConfig(format!("{key} must be set")));
            }
        }

        let vpc = self.vpc_block()?;
        let instance = self.instance_block()?;
        if !vpc.contains(&instance) {
            return Err(CoreError::InvalidConfig(format!(
                "vpcCIDR ({}) does not contain instanceCIDR ({})",
                self.vpc_cidr, self.instance_cidr
            )));
        }

        let controller = cidr::parse_addr(&self.controller_ip)?;
        if !instance.contains_addr(controller) {
            return Err(CoreError::InvalidConfig(format!(
                "instanceCIDR ({}) does not contain controllerIP ({})",
                self.instance_cidr, self.controller_ip
            )));
        }

        if self.vpc_id.is_empty() && !self.route_table_id.is_empty() {
            return Err(CoreError::InvalidConfig(
                "vpcId must be specified if routeTableId is specified".to_string(),
            ));
        }

        if self.create_record_set {
            if self.hosted_zone.is_empty() {
                return Err(CoreError::InvalidConfig(
                    "hostedZone cannot be blank when createRecordSet is true".to_string(),
                ));
            }
            if !is_subdomain(&self.external_dns_name, &self.hosted_zone) {
                return Err(CoreError::InvalidConfig(format!(
                    "externalDNSName ({}) must be a subdomain of hostedZone ({})",
                    self.external_dns_name, self.hosted_zone
                )));
            }
            if self.record_set_ttl < 1 {
                return Err(CoreError::InvalidConfig(
                    "recordSetTTL must be at least 1 second".to_string(),
                ));
            }
        } else if !self.hosted_zone.is_empty() {
            return Err(CoreError::InvalidConfig(
                "hostedZone must be blank when createRecordSet is false".to_string(),
            ));
        }

        Ok(())
    }
}

/// Canonical fully-qualified form of a DNS name: exactly one trailing dot.
///
/// ```
/// use kube_aws_core::with_trailing_dot;
///
/// assert_eq!(with_trailing_dot("staging.core-os.net"), "staging.core-os.net.");
/// assert_eq!(with_trailing_dot("staging.core-os.net."), "staging.core-os.net.");
/// ```
#[must_use]
pub fn with_trailing_dot(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Returns true if `name` lies strictly below `zone`.
#[must_use]
pub fn is_subdomain(name: &str, zone: &str) -> bool {
    let name = with_trailing_dot(name);
    let zone = with_trailing_dot(zone);
    name.len() > zone.len()
        && name.ends_with(&zone)
        && name.as_bytes()[name.len() - zone.len() - 1] == b'.'
}
