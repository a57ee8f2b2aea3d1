//! Subscription registry
//!
//! Maps resource-group names to their subscription and location, and VNet
//! names to their owning resource group. Built once per run and shared
//! read-only by every stage.

use crate::error::{CloudError, Result};
use crate::model::{Declared, NetworkConfig};
use std::collections::HashMap;

/// A declared resource group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupRef {
    pub name: String,
    pub subscription_id: String,
    pub location: String,
}

#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    groups: HashMap<String, ResourceGroupRef>,
    vnets: HashMap<String, String>,
}

impl SubscriptionRegistry {
    /// Build the lookup tables from a document
    ///
    /// Duplicate names keep the first declaration. Entries that failed to
    /// parse are left out; their own units report the failure.
    pub fn from_config(config: &NetworkConfig) -> Self {
        let mut groups = HashMap::with_capacity(config.resource_groups.len());
        for rg in config.resource_groups.iter().filter_map(Declared::valid) {
            if groups.contains_key(&rg.resource_group) {
                tracing::warn!(
                    resource_group = %rg.resource_group,
                    subscription_id = %rg.subscription_id,
                    "Duplicate resource group declaration ignored"
                );
                continue;
            }
            groups.insert(
                rg.resource_group.clone(),
                ResourceGroupRef {
                    name: rg.resource_group.clone(),
                    subscription_id: rg.subscription_id.clone(),
                    location: rg.location.clone(),
                },
            );
        }

        let mut vnets = HashMap::with_capacity(config.vnets.len());
        for vnet in config.vnets.iter().filter_map(Declared::valid) {
            vnets
                .entry(vnet.vnet_name.clone())
                .or_insert_with(|| vnet.resource_group.clone());
        }

        Self { groups, vnets }
    }

    /// Subscription owning a resource group
    pub fn resolve(&self, resource_group: &str) -> Result<&str> {
        self.group(resource_group)
            .map(|rg| rg.subscription_id.as_str())
    }

    pub fn group(&self, resource_group: &str) -> Result<&ResourceGroupRef> {
        self.groups
            .get(resource_group)
            .ok_or_else(|| CloudError::SubscriptionNotFound(resource_group.to_string()))
    }

    /// Resource group and subscription of a declared VNet
    pub fn locate_vnet(&self, vnet_name: &str) -> Result<&ResourceGroupRef> {
        let rg = self.vnets.get(vnet_name).ok_or_else(|| {
            CloudError::RemoteNotFound(format!("virtual network {} is not declared", vnet_name))
        })?;
        self.groups.get(rg).ok_or_else(|| {
            CloudError::RemoteNotFound(format!(
                "subscription for resource group {} of virtual network {}",
                rg, vnet_name
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
