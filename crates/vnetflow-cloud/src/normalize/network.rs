//! Virtual networks and subnets

use super::{RequestBody, SubResource};
use crate::control_plane::Resource;
use crate::model::VnetSpec;
use crate::resource_id::ResourceId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpaceBody {
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    pub address_space: AddressSpaceBody,
}

pub fn build_virtual_network(spec: &VnetSpec) -> RequestBody<VirtualNetworkProperties> {
    RequestBody::located(
        spec.location.clone(),
        VirtualNetworkProperties {
            address_space: AddressSpaceBody {
                address_prefixes: spec.address_space.prefixes(),
            },
        },
    )
}

/// Subnet body layered over the subnet's current state
///
/// Properties of `existing` that are not managed here (service endpoints,
/// delegations, ...) are carried over untouched.
pub fn build_subnet(
    existing: Option<&Resource>,
    address_prefix: &str,
    security_group: Option<&ResourceId>,
    route_table: Option<&ResourceId>,
) -> serde_json::Value {
    let mut properties = existing
        .and_then(|r| r.properties.as_object().cloned())
        .unwrap_or_default();

    properties.insert("addressPrefix".to_string(), serde_json::json!(address_prefix));
    if let Some(id) = security_group {
        properties.insert(
            "networkSecurityGroup".to_string(),
            serde_json::json!(SubResource::new(id)),
        );
    }
    if let Some(id) = route_table {
        properties.insert("routeTable".to_string(), serde_json::json!(SubResource::new(id)));
    }

    serde_json::json!({ "properties": properties })
}
