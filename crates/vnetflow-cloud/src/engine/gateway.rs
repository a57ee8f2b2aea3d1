//! Public IPs, gateways and site-to-site connections

use super::ApplyEngine;
use crate::error::Result;
use crate::model::{
    Declared, LocalGatewaySpec, NetworkConfig, PublicIpSpec, VpnConnectionSpec, VpnGatewaySpec,
};
use crate::normalize::gateway;
use crate::resource_id::{ResourceId, types};
use crate::result::{Confirmed, ResultCollector, UnitOfWork};

impl ApplyEngine {
    pub(super) async fn apply_public_ips(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for entry in &config.public_ips {
            let unit = UnitOfWork::new("public IP", entry.text("resource_group"))
                .with_name("public_ip_name", entry.text("name"));
            out.record(unit.finish(self.apply_public_ip(entry).await));
        }
    }

    async fn apply_public_ip(&self, entry: &Declared<PublicIpSpec>) -> Result<Confirmed> {
        let spec = entry.parsed()?;
        let subscription_id = self.ensure_group(&spec.resource_group).await?;
        let id = ResourceId::network(
            subscription_id,
            &spec.resource_group,
            types::PUBLIC_IP_ADDRESSES,
            &spec.name,
        );

        let confirmed = self
            .plane
            .create_or_update(&id, gateway::build_public_ip(spec).to_json()?)
            .await?;
        Ok(Confirmed::resource("public_ip_name", &confirmed))
    }

    pub(super) async fn apply_local_gateways(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for entry in &config.local_network_gateways {
            let unit = UnitOfWork::new("local network gateway", entry.text("resource_group"))
                .with_name("local_gateway_name", entry.text("name"));
            out.record(unit.finish(self.apply_local_gateway(entry).await));
        }
    }

    async fn apply_local_gateway(&self, entry: &Declared<LocalGatewaySpec>) -> Result<Confirmed> {
        let spec = entry.parsed()?;
        let subscription_id = self.ensure_group(&spec.resource_group).await?;
        let id = ResourceId::network(
            subscription_id,
            &spec.resource_group,
            types::LOCAL_NETWORK_GATEWAYS,
            &spec.name,
        );

        let confirmed = self
            .plane
            .create_or_update(&id, gateway::build_local_gateway(spec).to_json()?)
            .await?;
        Ok(Confirmed::resource("local_gateway_name", &confirmed))
    }

    pub(super) async fn apply_vpn_gateways(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for entry in &config.vpn_gateways {
            let unit = UnitOfWork::new("VPN gateway", entry.text("resource_group"))
                .with_name("vpn_gateway_name", entry.text("name"));
            out.record(unit.finish(self.apply_vpn_gateway(entry).await));
        }
    }

    async fn apply_vpn_gateway(&self, entry: &Declared<VpnGatewaySpec>) -> Result<Confirmed> {
        let spec = entry.parsed()?;
        let subscription_id = self.ensure_group(&spec.resource_group).await?;
        let id = ResourceId::network(
            subscription_id,
            &spec.resource_group,
            types::VIRTUAL_NETWORK_GATEWAYS,
            &spec.name,
        );
        let body = gateway::build_vpn_gateway(subscription_id, spec).to_json()?;

        // Gateway provisioning routinely takes tens of minutes.
        tracing::info!(gateway = %spec.name, "Provisioning VPN gateway");
        let confirmed = self.plane.create_or_update(&id, body).await?;
        Ok(Confirmed::resource("vpn_gateway_name", &confirmed))
    }

    pub(super) async fn apply_vpn_connections(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for spec in config.vpn_gateways.iter().filter_map(Declared::valid) {
            for entry in &spec.connections {
                let unit = UnitOfWork::new("VPN connection", &spec.resource_group)
                    .with_name("vpn_connection_name", entry.text("name"));
                out.record(unit.finish(self.apply_vpn_connection(spec, entry).await));
            }
        }
    }

    /// Both ends are read back so the connection references the
    /// identifiers the control plane actually holds.
    async fn apply_vpn_connection(
        &self,
        spec: &VpnGatewaySpec,
        entry: &Declared<VpnConnectionSpec>,
    ) -> Result<Confirmed> {
        let connection = entry.parsed()?;
        let subscription_id = self.ensure_group(&spec.resource_group).await?;
        let local = |resource_type: &str, name: &str| {
            ResourceId::network(subscription_id, &spec.resource_group, resource_type, name)
        };

        let gateway_resource = self
            .plane
            .get(&local(types::VIRTUAL_NETWORK_GATEWAYS, &spec.name))
            .await?;
        let local_gateway_resource = self
            .plane
            .get(&local(types::LOCAL_NETWORK_GATEWAYS, &connection.local_gateway_name))
            .await?;

        let body = gateway::build_connection(
            &spec.location,
            &gateway_resource,
            &local_gateway_resource,
            connection,
        )
        .to_json()?;
        let confirmed = self
            .plane
            .create_or_update(&local(types::CONNECTIONS, &connection.name), body)
            .await?;
        Ok(Confirmed::new().name("vpn_connection_name", confirmed.name))
    }
}
