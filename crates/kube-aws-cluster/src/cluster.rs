//! The cluster façade tying configuration, preflight and orchestration
//! together.

use std::sync::Arc;

use kube_aws_core::ClusterConfig;
use tracing::info;

use crate::api::{DnsApi, IdentityApi, NetworkApi, StackApi};
use crate::error::Result;
use crate::types::{OrchestratorConfig, StackInfo};
use crate::{dns, identity, network, stack};

/// Handles to the provider services a cluster needs.
#[derive(Clone)]
pub struct ProviderClients {
    /// Compute service, network calls.
    pub network: Arc<dyn NetworkApi>,
    /// Compute service, key pair calls.
    pub identity: Arc<dyn IdentityApi>,
    /// DNS service.
    pub dns: Arc<dyn DnsApi>,
    /// Orchestration service.
    pub stacks: Arc<dyn StackApi>,
}

/// A declared cluster and the services used to provision it.
pub struct Cluster {
    config: ClusterConfig,
    clients: ProviderClients,
    orchestrator: OrchestratorConfig,
}

impl Cluster {
    /// Create a cluster with the default orchestrator configuration.
    #[must_use]
    pub fn new(config: ClusterConfig, clients: ProviderClients) -> Self {
        Self {
            config,
            clients,
            orchestrator: OrchestratorConfig::default(),
        }
    }

    /// Replace the orchestrator configuration.
    #[must_use]
    pub fn with_orchestrator_config(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// The declared configuration.
    #[must_use]
    pub const fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Check the reused VPC, if any, against live state.
    ///
    /// # Errors
    ///
    /// See [`network::validate_existing_vpc_state`].
    pub async fn validate_existing_vpc_state(&self) -> Result<()> {
        network::validate_existing_vpc_state(&self.config, self.clients.network.as_ref()).await
    }

    /// Check the key pair exists.
    ///
    /// # Errors
    ///
    /// See [`identity::validate_key_pair`].
    pub async fn validate_key_pair(&self) -> Result<()> {
        identity::validate_key_pair(&self.config, self.clients.identity.as_ref()).await
    }

    /// Check the hosted zone exists and the external name is free.
    ///
    /// # Errors
    ///
    /// See [`dns::validate_dns_config`].
    pub async fn validate_dns_config(&self) -> Result<()> {
        dns::validate_dns_config(&self.config, self.clients.dns.as_ref()).await
    }

    /// Run every check that can fail before anything is provisioned.
    ///
    /// Local configuration first, then key pair, network and DNS. The DNS
    /// check only runs when a record set will be created. Stops at the
    /// first failure.
    ///
    /// # Errors
    ///
    /// Returns the first failing check's error.
    pub async fn preflight(&self) -> Result<()> {
        self.config.validate()?;
        self.validate_key_pair().await?;
        self.validate_existing_vpc_state().await?;
        if self.config.create_record_set {
            self.validate_dns_config().await?;
        }

        info!(cluster = %self.config.cluster_name, "Preflight checks passed");
        Ok(())
    }

    /// Validate a rendered template with the provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's validation error.
    pub async fn validate_stack(&self, template_body: &str) -> Result<()> {
        stack::validate_stack(self.clients.stacks.as_ref(), template_body).await
    }

    /// Provision the cluster and wait for the stack to finish.
    ///
    /// Nothing is submitted unless preflight and template validation pass.
    ///
    /// # Errors
    ///
    /// Returns preflight errors, the provider's submission error, or
    /// `ClusterError::StackFailed` with the distilled failure events.
    pub async fn create(&self, template_body: &str) -> Result<StackInfo> {
        self.preflight().await?;
        self.validate_stack(template_body).await?;

        let stacks = self.clients.stacks.as_ref();
        let handle = stack::create_stack(&self.config, stacks, template_body).await?;
        stack::wait_for_stack(stacks, &handle, &self.orchestrator).await
    }

    /// Describe the cluster's stack.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::StackNotFound` if the cluster was never created.
    pub async fn info(&self) -> Result<StackInfo> {
        stack::describe_stack(self.clients.stacks.as_ref(), self.config.stack_name()).await
    }

    /// Request deletion of the cluster's stack.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn destroy(&self) -> Result<()> {
        stack::delete_stack(self.clients.stacks.as_ref(), self.config.stack_name()).await
    }
}
