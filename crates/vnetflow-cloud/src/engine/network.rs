//! Resource groups, virtual networks and everything attached to them

use super::ApplyEngine;
use crate::error::{CloudError, Result};
use crate::model::{
    Declared, NetworkConfig, PeeringSpec, PrivateDnsZoneSpec, ResourceGroupSpec, SubnetSpec,
    VnetLinkSpec, VnetSpec,
};
use crate::normalize::{self, link, network, route, security};
use crate::resource_id::{ResourceId, types};
use crate::result::{Confirmed, ResultCollector, UnitOfWork};

impl ApplyEngine {
    pub(super) async fn apply_resource_groups(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for entry in &config.resource_groups {
            let unit = UnitOfWork::new("resource group", entry.text("resource_group"))
                .with_name("resource_group", entry.text("resource_group"));
            out.record(unit.finish(self.apply_resource_group(entry).await));
        }
    }

    /// Groups are created in their own declared subscription, with no
    /// existence precondition.
    async fn apply_resource_group(&self, entry: &Declared<ResourceGroupSpec>) -> Result<Confirmed> {
        let spec = entry.parsed()?;
        let id = ResourceId::resource_group(&spec.subscription_id, &spec.resource_group);
        let confirmed = self
            .plane
            .create_or_update(&id, serde_json::json!({ "location": spec.location }))
            .await?;
        Ok(Confirmed::new().location(confirmed.location))
    }

    pub(super) async fn apply_virtual_networks(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for entry in &config.vnets {
            let unit = UnitOfWork::new("virtual network", entry.text("resource_group"))
                .with_name("vnet_name", entry.text("vnet_name"));
            out.record(unit.finish(self.apply_virtual_network(entry).await));
        }
    }

    async fn apply_virtual_network(&self, entry: &Declared<VnetSpec>) -> Result<Confirmed> {
        let vnet = entry.parsed()?;
        let subscription_id = self.ensure_group(&vnet.resource_group).await?;
        let id = vnet_id(subscription_id, vnet);
        let body = network::build_virtual_network(vnet).to_json()?;

        let confirmed = self.plane.create_or_update(&id, body).await?;
        let address_space = confirmed
            .properties
            .get("addressSpace")
            .and_then(|space| space.get("addressPrefixes"))
            .cloned()
            .unwrap_or_else(|| serde_json::json!(vnet.address_space.prefixes()));

        Ok(Confirmed::new()
            .name("vnet_name", confirmed.name.clone())
            .detail("address_space", address_space)
            .location(confirmed.location))
    }

    pub(super) async fn apply_security_groups(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for vnet in config.vnets.iter().filter_map(Declared::valid) {
            for entry in &vnet.subnets {
                if !entry.declares("nsg_name") && !entry.declares("nsg_rules") {
                    continue;
                }
                let mut unit = UnitOfWork::new("network security group", &vnet.resource_group)
                    .with_name("subnet_name", entry.text("subnet_name"));
                if entry.declares("nsg_name") {
                    unit = unit.with_name("nsg_name", entry.text("nsg_name"));
                }
                out.record(unit.finish(self.apply_security_group(vnet, entry).await));
            }
        }
    }

    async fn apply_security_group(
        &self,
        vnet: &VnetSpec,
        entry: &Declared<SubnetSpec>,
    ) -> Result<Confirmed> {
        let subnet = entry.parsed()?;
        let nsg_name = subnet.nsg_name.as_deref().ok_or_else(|| {
            CloudError::missing_field("nsg_name", format!("subnet {}", subnet.subnet_name))
        })?;
        let subscription_id = self.ensure_group(&vnet.resource_group).await?;

        let rules = match &subnet.nsg_rules {
            Some(rules) => rules.parsed()?.as_slice(),
            None => &[],
        };
        let body = security::build_security_group(&vnet.location, rules)?.to_json()?;
        let id = ResourceId::network(
            subscription_id,
            &vnet.resource_group,
            types::NETWORK_SECURITY_GROUPS,
            nsg_name,
        );

        let confirmed = self.plane.create_or_update(&id, body).await?;
        Ok(Confirmed::resource("nsg_name", &confirmed))
    }

    pub(super) async fn apply_route_tables(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for vnet in config.vnets.iter().filter_map(Declared::valid) {
            for entry in &vnet.subnets {
                if !entry.declares("route_table_name") && !entry.declares("routes") {
                    continue;
                }
                let mut unit = UnitOfWork::new("route table", &vnet.resource_group)
                    .with_name("subnet_name", entry.text("subnet_name"));
                if entry.declares("route_table_name") {
                    unit = unit.with_name("route_table_name", entry.text("route_table_name"));
                }
                out.record(unit.finish(self.apply_route_table(vnet, entry).await));
            }
        }
    }

    async fn apply_route_table(
        &self,
        vnet: &VnetSpec,
        entry: &Declared<SubnetSpec>,
    ) -> Result<Confirmed> {
        let subnet = entry.parsed()?;
        let table_name = subnet.route_table_name.as_deref().ok_or_else(|| {
            CloudError::missing_field("route_table_name", format!("subnet {}", subnet.subnet_name))
        })?;
        let subscription_id = self.ensure_group(&vnet.resource_group).await?;

        let routes = match &subnet.routes {
            Some(routes) => routes.parsed()?.as_slice(),
            None => &[],
        };
        let body =
            route::build_route_table(&vnet.location, routes, subnet.disable_bgp_propagation)?
                .to_json()?;
        let id = ResourceId::network(
            subscription_id,
            &vnet.resource_group,
            types::ROUTE_TABLES,
            table_name,
        );

        let confirmed = self.plane.create_or_update(&id, body).await?;
        Ok(Confirmed::resource("route_table_name", &confirmed))
    }

    pub(super) async fn apply_subnets(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for vnet in config.vnets.iter().filter_map(Declared::valid) {
            for entry in &vnet.subnets {
                let unit = UnitOfWork::new("subnet", &vnet.resource_group)
                    .with_name("vnet_name", &vnet.vnet_name)
                    .with_name("subnet_name", entry.text("subnet_name"));
                out.record(unit.finish(self.apply_subnet(vnet, entry).await));
            }
        }
    }

    async fn apply_subnet(
        &self,
        vnet: &VnetSpec,
        entry: &Declared<SubnetSpec>,
    ) -> Result<Confirmed> {
        let subnet = entry.parsed()?;
        let subscription_id = self.ensure_group(&vnet.resource_group).await?;
        let id = vnet_id(subscription_id, vnet).child(types::SUBNETS, &subnet.subnet_name);

        let existing = match self.plane.get(&id).await {
            Ok(resource) => Some(resource),
            Err(CloudError::ResourceNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let local = |resource_type: &str, name: &str| {
            ResourceId::network(subscription_id, &vnet.resource_group, resource_type, name)
        };
        let security_group = subnet
            .nsg_name
            .as_deref()
            .map(|name| local(types::NETWORK_SECURITY_GROUPS, name));
        let route_table = subnet
            .route_table_name
            .as_deref()
            .map(|name| local(types::ROUTE_TABLES, name));

        let body = network::build_subnet(
            existing.as_ref(),
            &subnet.subnet_prefix,
            security_group.as_ref(),
            route_table.as_ref(),
        );
        let confirmed = self.plane.create_or_update(&id, body).await?;

        let prefix = confirmed
            .property::<String>("addressPrefix")
            .unwrap_or_else(|| subnet.subnet_prefix.clone());
        Ok(Confirmed::new()
            .name("subnet_name", confirmed.name)
            .detail("subnet_prefix", prefix))
    }

    pub(super) async fn apply_peerings(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for vnet in config.vnets.iter().filter_map(Declared::valid) {
            for entry in &vnet.peerings {
                let unit = UnitOfWork::new("peering", &vnet.resource_group)
                    .with_name("vnet_name", &vnet.vnet_name)
                    .with_name("peering_name", entry.text("peering_name"));
                out.record(unit.finish(self.apply_peering(vnet, entry).await));
            }
        }
    }

    async fn apply_peering(
        &self,
        vnet: &VnetSpec,
        entry: &Declared<PeeringSpec>,
    ) -> Result<Confirmed> {
        let peering = entry.parsed()?;
        let subscription_id = self.ensure_group(&vnet.resource_group).await?;
        let body = link::build_peering(&self.registry, peering)?.to_json()?;
        let id = vnet_id(subscription_id, vnet)
            .child(types::VIRTUAL_NETWORK_PEERINGS, &peering.peering_name);

        let confirmed = self.plane.create_or_update(&id, body).await?;
        Ok(Confirmed::new().name("peering_name", confirmed.name))
    }

    pub(super) async fn apply_dns_zones(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for entry in &config.private_dns_zones {
            let unit = UnitOfWork::new("private DNS zone", entry.text("resource_group"))
                .with_name("private_dns_zone_name", entry.text("private_zone_name"));
            out.record(unit.finish(self.apply_dns_zone(entry).await));
        }
    }

    async fn apply_dns_zone(&self, entry: &Declared<PrivateDnsZoneSpec>) -> Result<Confirmed> {
        let zone = entry.parsed()?;
        let subscription_id = self.ensure_group(&zone.resource_group).await?;
        let id = zone_id(subscription_id, zone);

        let confirmed = self
            .plane
            .create_or_update(&id, normalize::empty_body(normalize::GLOBAL_LOCATION))
            .await?;
        Ok(Confirmed::resource("private_dns_zone_name", &confirmed))
    }

    pub(super) async fn apply_dns_links(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for zone in config.private_dns_zones.iter().filter_map(Declared::valid) {
            for entry in &zone.virtual_network_links {
                let unit = UnitOfWork::new("DNS virtual network link", &zone.resource_group)
                    .with_name("private_dns_zone_name", &zone.private_zone_name)
                    .with_name("virtual_network_link_name", entry.text("link_name"));
                out.record(unit.finish(self.apply_dns_link(zone, entry).await));
            }
        }
    }

    async fn apply_dns_link(
        &self,
        zone: &PrivateDnsZoneSpec,
        entry: &Declared<VnetLinkSpec>,
    ) -> Result<Confirmed> {
        let vnet_link = entry.parsed()?;
        let subscription_id = self.ensure_group(&zone.resource_group).await?;
        let body = link::build_vnet_link(&self.registry, vnet_link)?.to_json()?;
        let id = zone_id(subscription_id, zone)
            .child(types::VIRTUAL_NETWORK_LINKS, &vnet_link.link_name);

        let confirmed = self.plane.create_or_update(&id, body).await?;
        Ok(Confirmed::resource("virtual_network_link_name", &confirmed))
    }
}

fn vnet_id(subscription_id: &str, vnet: &VnetSpec) -> ResourceId {
    ResourceId::network(
        subscription_id,
        &vnet.resource_group,
        types::VIRTUAL_NETWORKS,
        &vnet.vnet_name,
    )
}

fn zone_id(subscription_id: &str, zone: &PrivateDnsZoneSpec) -> ResourceId {
    ResourceId::network(
        subscription_id,
        &zone.resource_group,
        types::PRIVATE_DNS_ZONES,
        &zone.private_zone_name,
    )
}
