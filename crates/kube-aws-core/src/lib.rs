//! Core types and utilities for kube-aws.
//!
//! This crate provides the provider-independent pieces of cluster preflight:
//!
//! - **CIDR arithmetic**: [`CidrBlock`] parsing, containment and overlap
//! - **Configuration**: the declared [`ClusterConfig`] and its local checks
//! - **Error types**: [`CoreError`] shared with the cluster crate
//!
//! # Example
//!
//! ```
//! use kube_aws_core::{cidr, CidrBlock};
//!
//! let subnet: CidrBlock = "10.5.2.0/24".parse().unwrap();
//! let declared: CidrBlock = "10.5.2.0/28".parse().unwrap();
//! assert!(subnet.overlaps(&declared));
//!
//! assert!(!cidr::overlaps("10.5.11.0/24", "10.5.1.0/24").unwrap());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cidr;
pub mod config;
pub mod error;

pub use cidr::CidrBlock;
pub use config::{is_subdomain, with_trailing_dot, ClusterConfig};
pub use error::{CoreError, Result};
