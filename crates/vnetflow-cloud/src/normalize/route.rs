//! Route tables

use super::{Named, RequestBody};
use crate::error::{CloudError, Result};
use crate::model::RouteSpec;
use serde::Serialize;

const VIRTUAL_APPLIANCE: &str = "VirtualAppliance";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProperties {
    pub address_prefix: String,
    pub next_hop_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_hop_ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableProperties {
    pub routes: Vec<Named<RouteProperties>>,
    pub disable_bgp_route_propagation: bool,
}

pub fn normalize_route(spec: &RouteSpec) -> Result<Named<RouteProperties>> {
    // Only appliance hops carry an address.
    if spec.next_hop_type.eq_ignore_ascii_case(VIRTUAL_APPLIANCE)
        && spec.next_hop_ip_address.is_none()
    {
        return Err(CloudError::missing_field(
            "next_hop_ip_address",
            format!("route {} with next hop {}", spec.name, spec.next_hop_type),
        ));
    }

    Ok(Named::new(
        spec.name.clone(),
        RouteProperties {
            address_prefix: spec.address_prefix.clone(),
            next_hop_type: spec.next_hop_type.clone(),
            next_hop_ip_address: spec.next_hop_ip_address.clone(),
        },
    ))
}

pub fn build_route_table(
    location: &str,
    routes: &[RouteSpec],
    disable_bgp_propagation: bool,
) -> Result<RequestBody<RouteTableProperties>> {
    let routes = routes
        .iter()
        .map(normalize_route)
        .collect::<Result<Vec<_>>>()?;

    Ok(RequestBody::located(
        location,
        RouteTableProperties {
            routes,
            disable_bgp_route_propagation: disable_bgp_propagation,
        },
    ))
}
