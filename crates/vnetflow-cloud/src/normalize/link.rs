//! Peering and private-DNS link resolution
//!
//! Both relationships point at a VNet that may live in another resource
//! group or subscription. The remote side is resolved through the registry;
//! a failure only affects the relationship being built.

use super::{GLOBAL_LOCATION, RequestBody, SubResource};
use crate::error::{CloudError, Result};
use crate::model::{PeeringSpec, VnetLinkSpec};
use crate::registry::SubscriptionRegistry;
use crate::resource_id::{ResourceId, types};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeeringProperties {
    pub remote_virtual_network: SubResource,
    pub allow_virtual_network_access: bool,
    pub allow_forwarded_traffic: bool,
    pub allow_gateway_transit: bool,
    pub use_remote_gateways: bool,
}

pub fn build_peering(
    registry: &SubscriptionRegistry,
    spec: &PeeringSpec,
) -> Result<RequestBody<PeeringProperties>> {
    let settings = &spec.peering_settings;
    let remote_name = settings.remote_virtual_network.as_deref().ok_or_else(|| {
        CloudError::missing_field(
            "remote_virtual_network",
            format!("peering {}", spec.peering_name),
        )
    })?;

    let remote = registry.locate_vnet(remote_name)?;
    let remote_id = ResourceId::network(
        &remote.subscription_id,
        &remote.name,
        types::VIRTUAL_NETWORKS,
        remote_name,
    );
    tracing::debug!(peering = %spec.peering_name, remote = %remote_id, "Resolved peering remote");

    Ok(RequestBody::unlocated(PeeringProperties {
        remote_virtual_network: SubResource::new(&remote_id),
        allow_virtual_network_access: settings.allow_virtual_network_access,
        allow_forwarded_traffic: settings.allow_forwarded_traffic,
        allow_gateway_transit: settings.allow_gateway_transit,
        use_remote_gateways: settings.use_remote_gateways,
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VnetLinkProperties {
    pub virtual_network: SubResource,
    pub registration_enabled: bool,
}

/// Identifier of the VNet a DNS link points at
pub fn resolve_linked_vnet(
    registry: &SubscriptionRegistry,
    spec: &VnetLinkSpec,
) -> Result<ResourceId> {
    let group = match spec.vnet_resource_group.as_deref() {
        Some(rg) => registry.group(rg).map_err(|_| {
            CloudError::RemoteNotFound(format!(
                "resource group {} of virtual network {}",
                rg, spec.vnet_name
            ))
        })?,
        None => registry.locate_vnet(&spec.vnet_name)?,
    };

    Ok(ResourceId::network(
        &group.subscription_id,
        &group.name,
        types::VIRTUAL_NETWORKS,
        &spec.vnet_name,
    ))
}

pub fn build_vnet_link(
    registry: &SubscriptionRegistry,
    spec: &VnetLinkSpec,
) -> Result<RequestBody<VnetLinkProperties>> {
    let vnet_id = resolve_linked_vnet(registry, spec)?;
    Ok(RequestBody::located(
        GLOBAL_LOCATION,
        VnetLinkProperties {
            virtual_network: SubResource::new(&vnet_id),
            registration_enabled: spec.registration_enabled,
        },
    ))
}
