//! Azure Resource Manager control plane for VNetFlow
//!
//! Implements [`vnetflow_cloud::ControlPlane`] on top of the ARM REST API.
//!
//! # Requirements
//!
//! - `AZURE_ACCESS_TOKEN`: bearer token for `https://management.azure.com`
//! - `AZURE_MANAGEMENT_ENDPOINT` (optional): alternate ARM endpoint
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vnetflow_cloud::{ApplyEngine, NetworkConfig};
//! use vnetflow_cloud_azure::{ArmClient, ArmConfig};
//!
//! let config = NetworkConfig::load("input.json").await?;
//! let client = ArmClient::new(ArmConfig::from_env()?);
//! let results = ApplyEngine::from_config(Arc::new(client), &config)
//!     .run(&config)
//!     .await;
//! ```

pub mod arm;
pub mod error;

pub use arm::{ArmClient, ArmConfig};
pub use error::AzureError;
