//! Validation of the hosted zone the external DNS record is created in.

use kube_aws_core::{with_trailing_dot, ClusterConfig};
use tracing::{debug, info, warn};

use crate::api::DnsApi;
use crate::error::{ClusterError, Result};
use crate::types::HostedZoneRecord;

/// Find the hosted zone named exactly `zone_name` and list its record names.
///
/// Both `example.com` and `example.com.` refer to the same zone. Zones the
/// provider lists only because they sort after the requested name are
/// ignored.
///
/// # Errors
///
/// Returns `ClusterError::HostedZoneNotFound` if no zone matches exactly and
/// `ClusterError::Api` if a request fails.
pub async fn fetch_hosted_zone(api: &dyn DnsApi, zone_name: &str) -> Result<HostedZoneRecord> {
    let fqdn = with_trailing_dot(zone_name);

    let zone = api
        .list_hosted_zones_by_name(&fqdn)
        .await?
        .into_iter()
        .find(|z| with_trailing_dot(&z.name) == fqdn)
        .ok_or_else(|| ClusterError::HostedZoneNotFound(zone_name.to_string()))?;

    let record_names = api
        .list_resource_record_sets(&zone.id)
        .await?
        .into_iter()
        .map(|rs| with_trailing_dot(&rs.name))
        .collect();

    let record = HostedZoneRecord {
        id: zone.id,
        name: fqdn,
        record_names,
    };

    debug!(
        zone_id = %record.id,
        zone = %record.name,
        records = record.record_names.len(),
        "Fetched hosted zone"
    );

    Ok(record)
}

/// Check that the hosted zone exists and the external DNS name is free.
///
/// The conflict check runs regardless of `create_record_set`; callers that
/// will not create a record decide whether to invoke this at all.
///
/// # Errors
///
/// - `ClusterError::HostedZoneNotFound` if the zone does not exist
/// - `ClusterError::DnsRecordConflict` if a record with the external name exists
/// - `ClusterError::Api` if a request fails
pub async fn validate_dns_config(config: &ClusterConfig, api: &dyn DnsApi) -> Result<()> {
    let zone = fetch_hosted_zone(api, &config.hosted_zone).await.inspect_err(|e| {
        if matches!(e, ClusterError::HostedZoneNotFound(_)) {
            warn!(hosted_zone = %config.hosted_zone, "Hosted zone not found");
        }
    })?;

    let name = with_trailing_dot(&config.external_dns_name);
    if zone.record_names.contains(&name) {
        warn!(
            name = %name,
            zone = %zone.name,
            "External DNS name already has a record"
        );
        return Err(ClusterError::DnsRecordConflict {
            name,
            zone: zone.name,
        });
    }

    info!(
        external_dns_name = %config.external_dns_name,
        zone = %zone.name,
        "DNS configuration validated"
    );

    Ok(())
}
