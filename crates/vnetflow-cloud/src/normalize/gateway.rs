//! Public IPs, local gateways, VPN gateways and their connections

use super::{Named, RequestBody, Sku, SubResource};
use crate::control_plane::Resource;
use crate::model::{IpsecPolicySpec, LocalGatewaySpec, PublicIpSpec, VpnConnectionSpec, VpnGatewaySpec};
use crate::resource_id::{ResourceId, types};
use serde::Serialize;

/// Name of the single IP configuration placed on a VPN gateway
pub const GATEWAY_IP_CONFIGURATION: &str = "Default";

const NO_PFS: &str = "None";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicIpProperties {
    #[serde(rename = "publicIPAllocationMethod")]
    pub allocation_method: String,
    #[serde(rename = "publicIPAddressVersion")]
    pub address_version: String,
}

pub fn build_public_ip(spec: &PublicIpSpec) -> RequestBody<PublicIpProperties> {
    RequestBody::located(
        spec.location.clone(),
        PublicIpProperties {
            allocation_method: spec.allocation_method.clone(),
            address_version: spec.version.clone(),
        },
    )
    .with_sku(Sku {
        name: spec.sku.clone(),
        tier: Some(spec.tier.clone()),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAddressSpace {
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalGatewayProperties {
    pub gateway_ip_address: String,
    pub local_network_address_space: LocalAddressSpace,
}

pub fn build_local_gateway(spec: &LocalGatewaySpec) -> RequestBody<LocalGatewayProperties> {
    RequestBody::located(
        spec.location.clone(),
        LocalGatewayProperties {
            gateway_ip_address: spec.ip_address.clone(),
            local_network_address_space: LocalAddressSpace {
                address_prefixes: spec.address_prefixes.clone(),
            },
        },
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayIpConfiguration {
    pub subnet: SubResource,
    #[serde(rename = "publicIPAddress")]
    pub public_ip_address: SubResource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnGatewayProperties {
    pub ip_configurations: Vec<Named<GatewayIpConfiguration>>,
    pub gateway_type: String,
    pub vpn_type: String,
    pub active_active: bool,
    pub sku: Sku,
}

/// VPN gateway body; the subnet and public IP live in the gateway's own group
pub fn build_vpn_gateway(
    subscription_id: &str,
    spec: &VpnGatewaySpec,
) -> RequestBody<VpnGatewayProperties> {
    let subnet = ResourceId::network(
        subscription_id,
        &spec.resource_group,
        types::VIRTUAL_NETWORKS,
        &spec.vnet_name,
    )
    .child(types::SUBNETS, &spec.subnet_name);
    let public_ip = ResourceId::network(
        subscription_id,
        &spec.resource_group,
        types::PUBLIC_IP_ADDRESSES,
        &spec.public_ip_name,
    );

    RequestBody::located(
        spec.location.clone(),
        VpnGatewayProperties {
            ip_configurations: vec![Named::new(
                GATEWAY_IP_CONFIGURATION,
                GatewayIpConfiguration {
                    subnet: SubResource::new(&subnet),
                    public_ip_address: SubResource::new(&public_ip),
                },
            )],
            gateway_type: spec.gateway_type.clone(),
            vpn_type: spec.vpn_type.clone(),
            active_active: spec.enable_active_active,
            // Gateway SKUs use the same value for name and tier.
            sku: Sku {
                name: spec.sku.clone(),
                tier: Some(spec.sku.clone()),
            },
        },
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpsecPolicy {
    pub sa_life_time_seconds: u32,
    pub sa_data_size_kilobytes: u32,
    pub ipsec_encryption: String,
    pub ipsec_integrity: String,
    pub ike_encryption: String,
    pub ike_integrity: String,
    pub dh_group: String,
    pub pfs_group: String,
}

impl From<&IpsecPolicySpec> for IpsecPolicy {
    fn from(spec: &IpsecPolicySpec) -> Self {
        Self {
            sa_life_time_seconds: spec.sa_life_time_seconds,
            sa_data_size_kilobytes: spec.sa_data_size_kilobytes,
            ipsec_encryption: spec.ipsec_encryption.clone(),
            ipsec_integrity: spec.ipsec_integrity.clone(),
            ike_encryption: spec.ike_encryption.clone(),
            ike_integrity: spec.ike_integrity.clone(),
            dh_group: spec.dh_group.clone(),
            pfs_group: spec.pfs_group.clone().unwrap_or_else(|| NO_PFS.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProperties {
    pub virtual_network_gateway1: SubResource,
    pub local_network_gateway2: SubResource,
    pub connection_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpd_timeout_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_key: Option<String>,
    pub enable_bgp: bool,
    pub ipsec_policies: Vec<IpsecPolicy>,
}

/// Connection body between two gateways that were read back from the
/// control plane
pub fn build_connection(
    location: &str,
    gateway: &Resource,
    local_gateway: &Resource,
    spec: &VpnConnectionSpec,
) -> RequestBody<ConnectionProperties> {
    RequestBody::located(
        location,
        ConnectionProperties {
            virtual_network_gateway1: SubResource {
                id: gateway.id.clone(),
            },
            local_network_gateway2: SubResource {
                id: local_gateway.id.clone(),
            },
            connection_type: spec.connection_type.clone(),
            dpd_timeout_seconds: spec.dpd_timeout_seconds,
            connection_protocol: spec.protocol_type.clone(),
            shared_key: spec.shared_key.clone(),
            enable_bgp: spec.enable_bgp,
            ipsec_policies: spec.ip_sec_policies.iter().map(IpsecPolicy::from).collect(),
        },
    )
}
