//! Validation of the key pair installed on cluster instances.

use kube_aws_core::ClusterConfig;
use tracing::{info, warn};

use crate::api::{IdentityApi, KEY_PAIR_NOT_FOUND};
use crate::error::{ClusterError, Result};

/// Check that the configured key pair exists in the target region.
///
/// # Errors
///
/// Returns `ClusterError::KeyPairNotFound` when the provider reports the key
/// as unknown; any other provider error is returned unchanged.
pub async fn validate_key_pair(config: &ClusterConfig, api: &dyn IdentityApi) -> Result<()> {
    match api.describe_key_pair(&config.key_name).await {
        Ok(key) => {
            info!(key_name = %key.key_name, "Key pair validated");
            Ok(())
        }
        Err(e) if e.has_code(KEY_PAIR_NOT_FOUND) => {
            warn!(
                key_name = %config.key_name,
                region = %config.region,
                "Key pair does not exist"
            );
            Err(ClusterError::KeyPairNotFound {
                key_name: config.key_name.clone(),
                region: config.region.clone(),
            })
        }
        Err(e) => Err(e.into()),
    }
}
