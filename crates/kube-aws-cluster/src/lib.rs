//! Preflight validation and stack orchestration for kube-aws clusters.
//!
//! Provisioning a cluster is slow and hard to undo, so everything that can
//! be checked against the provider beforehand is checked first:
//!
//! - An existing VPC's CIDR matches the declaration and the instance subnet
//!   does not overlap a subnet already in it
//! - The instance key pair exists in the region
//! - The hosted zone exists and the external DNS name is still free
//!
//! Only then is the stack submitted. Its progress is polled and, on failure,
//! the resource event history is reduced to the few events that name a root
//! cause.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Cluster                               │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌──────────────┐ │
//! │  │  network   │ │  identity  │ │    dns     │ │    stack     │ │
//! │  │  validator │ │  validator │ │  validator │ │ orchestrator │ │
//! │  └────────────┘ └────────────┘ └────────────┘ └──────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!          │              │              │               │
//!          ▼              ▼              ▼               ▼
//!     NetworkApi     IdentityApi       DnsApi         StackApi
//! ```
//!
//! The four API traits are the only contact with the provider. In-memory
//! implementations live in [`mock`] behind the `test-utils` feature.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kube_aws_cluster::{Cluster, ProviderClients};
//! use kube_aws_cluster::mock::{MockDnsApi, MockIdentityApi, MockNetworkApi, MockStackApi};
//!
//! let clients = ProviderClients {
//!     network: Arc::new(MockNetworkApi::new()),
//!     identity: Arc::new(MockIdentityApi::with_keys(&["my-key"])),
//!     dns: Arc::new(MockDnsApi::new()),
//!     stacks: Arc::new(MockStackApi::new()),
//! };
//!
//! let cluster = Cluster::new(config, clients);
//! cluster.preflight().await?;
//! let info = cluster.create(&template).await?;
//! println!("controller: {:?}", info.outputs.get("ControllerIP"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod api;
pub mod cluster;
pub mod dns;
pub mod error;
pub mod identity;
pub mod network;
pub mod stack;
pub mod status;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use api::{ApiError, ApiResult, DnsApi, IdentityApi, NetworkApi, StackApi};
pub use cluster::{Cluster, ProviderClients};
pub use error::{ClusterError, Result};
pub use stack::{is_cancellation_cascade, stack_event_err_msgs};
pub use status::StackStatus;
pub use types::{
    ExistingNetworkState, HostedZoneRecord, OrchestratorConfig, StackEvent, StackHandle,
    StackInfo, StackTag,
};
