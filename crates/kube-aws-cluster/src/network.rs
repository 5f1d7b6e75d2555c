//! Validation of an existing VPC the cluster is placed into.
//!
//! When the configuration names a VPC to reuse, the declared VPC CIDR must
//! match the live VPC exactly and the instance subnet must not overlap any
//! subnet already in it. Nothing is validated when a new VPC will be created.

use kube_aws_core::{CidrBlock, ClusterConfig};
use tracing::{debug, info, warn};

use crate::api::{NetworkApi, VPC_NOT_FOUND};
use crate::error::{ClusterError, Result};
use crate::types::ExistingNetworkState;

/// Fetch the CIDR of a VPC exactly as the provider reports it.
///
/// A VPC reported without a CIDR yields an empty string.
///
/// # Errors
///
/// Returns `ClusterError::NetworkNotFound` if the VPC does not exist and
/// `ClusterError::Api` if the request fails.
pub async fn fetch_vpc_cidr(api: &dyn NetworkApi, vpc_id: &str, region: &str) -> Result<String> {
    let not_found = || ClusterError::NetworkNotFound {
        vpc_id: vpc_id.to_string(),
        region: region.to_string(),
    };

    match api.describe_vpc(vpc_id).await {
        Ok(Some(vpc)) => Ok(vpc.cidr_block.unwrap_or_default()),
        Ok(None) => Err(not_found()),
        Err(e) if e.has_code(VPC_NOT_FOUND) => Err(not_found()),
        Err(e) => Err(e.into()),
    }
}

/// Fetch the CIDRs of the subnets already in a VPC.
///
/// Subnets the provider reports without a CIDR are skipped.
///
/// # Errors
///
/// Returns `ClusterError::Core` if the provider reports a malformed subnet
/// CIDR and `ClusterError::Api` if the request fails.
pub async fn fetch_subnet_cidrs(api: &dyn NetworkApi, vpc_id: &str) -> Result<Vec<CidrBlock>> {
    let subnets = api.describe_subnets(vpc_id).await?;
    let mut cidrs = Vec::with_capacity(subnets.len());
    for subnet in subnets {
        let Some(cidr) = subnet.cidr_block else {
            warn!(
                vpc_id,
                subnet_id = ?subnet.subnet_id,
                "Existing subnet has no CIDR, skipping"
            );
            continue;
        };
        cidrs.push(CidrBlock::parse(&cidr)?);
    }
    Ok(cidrs)
}

/// Fetch the full live state of a VPC.
///
/// # Errors
///
/// See [`fetch_vpc_cidr`] and [`fetch_subnet_cidrs`].
pub async fn fetch_network_state(
    api: &dyn NetworkApi,
    vpc_id: &str,
    region: &str,
) -> Result<ExistingNetworkState> {
    let vpc_cidr = fetch_vpc_cidr(api, vpc_id, region).await?;
    let subnet_cidrs = fetch_subnet_cidrs(api, vpc_id).await?;

    debug!(
        vpc_id,
        vpc_cidr = %vpc_cidr,
        subnets = subnet_cidrs.len(),
        "Fetched existing network state"
    );

    Ok(ExistingNetworkState {
        vpc_id: vpc_id.to_string(),
        vpc_cidr,
        subnet_cidrs,
    })
}

/// Check the declared network placement against live VPC state.
///
/// Returns immediately when `vpc_id` is empty: the VPC will be created by
/// the stack and cannot conflict with anything. The VPC CIDR is compared
/// before any subnet is requested.
///
/// # Errors
///
/// - `ClusterError::NetworkNotFound` if the VPC does not exist
/// - `ClusterError::NetworkCidrMismatch` if `vpc_cidr` differs from the live CIDR
/// - `ClusterError::SubnetCidrOverlap` if `instance_cidr` overlaps an existing subnet
/// - `ClusterError::Core` for malformed CIDRs
/// - `ClusterError::Api` if a request fails
pub async fn validate_existing_vpc_state(config: &ClusterConfig, api: &dyn NetworkApi) -> Result<()> {
    if !config.reuses_vpc() {
        debug!("No existing vpc configured, skipping network validation");
        return Ok(());
    }

    let vpc_cidr = fetch_vpc_cidr(api, &config.vpc_id, &config.region).await?;
    check_vpc_cidr(config, &vpc_cidr)?;

    let subnet_cidrs = fetch_subnet_cidrs(api, &config.vpc_id).await?;
    check_subnet_overlap(config, &subnet_cidrs)?;

    info!(
        vpc_id = %config.vpc_id,
        instance_cidr = %config.instance_cidr,
        "Existing vpc validated"
    );

    Ok(())
}

/// Decide whether the declared placement fits previously fetched state.
///
/// # Errors
///
/// Same as [`validate_existing_vpc_state`], minus lookup failures.
pub fn check_network_state(config: &ClusterConfig, state: &ExistingNetworkState) -> Result<()> {
    check_vpc_cidr(config, &state.vpc_cidr)?;
    check_subnet_overlap(config, &state.subnet_cidrs)
}

fn check_vpc_cidr(config: &ClusterConfig, actual: &str) -> Result<()> {
    if actual == config.vpc_cidr {
        return Ok(());
    }
    warn!(
        vpc_id = %config.vpc_id,
        declared = %config.vpc_cidr,
        actual = %actual,
        "Declared vpc cidr does not match existing vpc"
    );
    Err(ClusterError::NetworkCidrMismatch {
        vpc_id: config.vpc_id.clone(),
        declared: config.vpc_cidr.clone(),
        actual: actual.to_string(),
    })
}

fn check_subnet_overlap(config: &ClusterConfig, subnets: &[CidrBlock]) -> Result<()> {
    let instance = config.instance_block()?;
    if let Some(conflict) = subnets.iter().find(|s| instance.overlaps(s)) {
        warn!(
            vpc_id = %config.vpc_id,
            instance_cidr = %config.instance_cidr,
            subnet_cidr = %conflict,
            "Instance cidr overlaps existing subnet"
        );
        return Err(ClusterError::SubnetCidrOverlap {
            instance_cidr: config.instance_cidr.clone(),
            subnet_cidr: conflict.to_string(),
        });
    }
    Ok(())
}
