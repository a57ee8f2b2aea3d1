//! Apply engine
//!
//! Drives every declared unit of work through
//! resolve → precondition → build → create-or-update → record.
//! Units run strictly one after another; a failing unit yields a failed
//! record and the run moves on.

mod gateway;
mod load_balancer;
mod network;

use crate::control_plane::ControlPlane;
use crate::error::{CloudError, Result};
use crate::model::NetworkConfig;
use crate::registry::SubscriptionRegistry;
use crate::result::ResultCollector;
use std::fmt;
use std::sync::Arc;

/// Resource kinds in the order a run applies them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResourceGroups,
    VirtualNetworks,
    SecurityGroups,
    RouteTables,
    Subnets,
    Peerings,
    PrivateDnsZones,
    DnsLinks,
    PublicIps,
    LocalGateways,
    VpnGateways,
    VpnConnections,
    LoadBalancers,
}

impl Stage {
    pub const ALL: [Stage; 13] = [
        Stage::ResourceGroups,
        Stage::VirtualNetworks,
        Stage::SecurityGroups,
        Stage::RouteTables,
        Stage::Subnets,
        Stage::Peerings,
        Stage::PrivateDnsZones,
        Stage::DnsLinks,
        Stage::PublicIps,
        Stage::LocalGateways,
        Stage::VpnGateways,
        Stage::VpnConnections,
        Stage::LoadBalancers,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ResourceGroups => "resource groups",
            Stage::VirtualNetworks => "virtual networks",
            Stage::SecurityGroups => "network security groups",
            Stage::RouteTables => "route tables",
            Stage::Subnets => "subnets",
            Stage::Peerings => "peerings",
            Stage::PrivateDnsZones => "private DNS zones",
            Stage::DnsLinks => "DNS virtual network links",
            Stage::PublicIps => "public IPs",
            Stage::LocalGateways => "local network gateways",
            Stage::VpnGateways => "VPN gateways",
            Stage::VpnConnections => "VPN connections",
            Stage::LoadBalancers => "load balancers",
        };
        write!(f, "{}", name)
    }
}

pub struct ApplyEngine {
    plane: Arc<dyn ControlPlane>,
    registry: SubscriptionRegistry,
}

impl ApplyEngine {
    pub fn new(plane: Arc<dyn ControlPlane>, registry: SubscriptionRegistry) -> Self {
        Self { plane, registry }
    }

    /// Engine with a registry built from `config`
    pub fn from_config(plane: Arc<dyn ControlPlane>, config: &NetworkConfig) -> Self {
        Self::new(plane, SubscriptionRegistry::from_config(config))
    }

    /// Apply every stage in order and collect one record per unit
    pub async fn run(&self, config: &NetworkConfig) -> ResultCollector {
        let mut collector = ResultCollector::new();
        for stage in Stage::ALL {
            let before = collector.len();
            self.run_stage(stage, config, &mut collector).await;

            let applied = collector.len() - before;
            if applied > 0 {
                tracing::info!(%stage, units = applied, "Stage complete");
            }
        }
        collector
    }

    pub async fn run_stage(&self, stage: Stage, config: &NetworkConfig, out: &mut ResultCollector) {
        match stage {
            Stage::ResourceGroups => self.apply_resource_groups(config, out).await,
            Stage::VirtualNetworks => self.apply_virtual_networks(config, out).await,
            Stage::SecurityGroups => self.apply_security_groups(config, out).await,
            Stage::RouteTables => self.apply_route_tables(config, out).await,
            Stage::Subnets => self.apply_subnets(config, out).await,
            Stage::Peerings => self.apply_peerings(config, out).await,
            Stage::PrivateDnsZones => self.apply_dns_zones(config, out).await,
            Stage::DnsLinks => self.apply_dns_links(config, out).await,
            Stage::PublicIps => self.apply_public_ips(config, out).await,
            Stage::LocalGateways => self.apply_local_gateways(config, out).await,
            Stage::VpnGateways => self.apply_vpn_gateways(config, out).await,
            Stage::VpnConnections => self.apply_vpn_connections(config, out).await,
            Stage::LoadBalancers => self.apply_load_balancers(config, out).await,
        }
    }

    /// Resolve the subscription of `resource_group` and check the group exists
    async fn ensure_group(&self, resource_group: &str) -> Result<&str> {
        let subscription_id = self.registry.resolve(resource_group)?;
        if !self
            .plane
            .resource_group_exists(subscription_id, resource_group)
            .await?
        {
            return Err(CloudError::ResourceGroupMissing(resource_group.to_string()));
        }
        Ok(subscription_id)
    }
}
