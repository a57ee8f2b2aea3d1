//! Canonical resource identifiers
//!
//! Every reference embedded in a request body is a fully-qualified path of
//! the form
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{provider}/{type}/{name}[/{type}/{name}]...
//! ```
//!
//! Names are not escaped or validated here: a malformed name produces a
//! malformed identifier and the control plane reports it.

use crate::error::{CloudError, Result};
use std::fmt;
use std::str::FromStr;

/// Provider namespace of every network resource type managed here
pub const NETWORK_PROVIDER: &str = "Microsoft.Network";

/// Resource type path segments
pub mod types {
    pub const VIRTUAL_NETWORKS: &str = "virtualNetworks";
    pub const SUBNETS: &str = "subnets";
    pub const VIRTUAL_NETWORK_PEERINGS: &str = "virtualNetworkPeerings";
    pub const NETWORK_SECURITY_GROUPS: &str = "networkSecurityGroups";
    pub const ROUTE_TABLES: &str = "routeTables";
    pub const PRIVATE_DNS_ZONES: &str = "privateDnsZones";
    pub const VIRTUAL_NETWORK_LINKS: &str = "virtualNetworkLinks";
    pub const PUBLIC_IP_ADDRESSES: &str = "publicIPAddresses";
    pub const LOCAL_NETWORK_GATEWAYS: &str = "localNetworkGateways";
    pub const VIRTUAL_NETWORK_GATEWAYS: &str = "virtualNetworkGateways";
    pub const CONNECTIONS: &str = "connections";
    pub const LOAD_BALANCERS: &str = "loadBalancers";
    pub const FRONTEND_IP_CONFIGURATIONS: &str = "frontendIPConfigurations";
    pub const BACKEND_ADDRESS_POOLS: &str = "backendAddressPools";
    pub const PROBES: &str = "probes";
    pub const NETWORK_INTERFACES: &str = "networkInterfaces";
}

/// Fully-qualified identifier of a resource group or a resource inside one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    subscription_id: String,
    resource_group: String,
    provider: Option<String>,
    segments: Vec<(String, String)>,
}

impl ResourceId {
    /// Identifier of `{type}/{name}` under `provider` in a resource group
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        provider: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: Some(provider.into()),
            segments: vec![(resource_type.into(), name.into())],
        }
    }

    /// Shorthand for a `Microsoft.Network` resource
    pub fn network(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::new(
            subscription_id,
            resource_group,
            NETWORK_PROVIDER,
            resource_type,
            name,
        )
    }

    /// Identifier of the resource group itself
    pub fn resource_group(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: None,
            segments: Vec::new(),
        }
    }

    /// Nested resource `{type}/{name}` below this one
    pub fn child(&self, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let mut id = self.clone();
        id.segments.push((resource_type.into(), name.into()));
        id
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Resource name (the resource group name for a group identifier)
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(|(_, name)| name.as_str())
            .unwrap_or(&self.resource_group)
    }

    /// Slash-joined type path, e.g. `virtualNetworks/subnets`
    pub fn type_path(&self) -> String {
        self.segments
            .iter()
            .map(|(ty, _)| ty.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn is_resource_group(&self) -> bool {
        self.provider.is_none()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )?;
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
            for (ty, name) in &self.segments {
                write!(f, "/{}/{}", ty, name)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ResourceId {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CloudError::InvalidConfig(format!("malformed resource identifier: {}", s));
        let parts: Vec<&str> = s.strip_prefix('/').ok_or_else(invalid)?.split('/').collect();

        if parts.len() < 4
            || !parts[0].eq_ignore_ascii_case("subscriptions")
            || !parts[2].eq_ignore_ascii_case("resourceGroups")
        {
            return Err(invalid());
        }

        let mut id = Self::resource_group(parts[1], parts[3]);
        if parts.len() == 4 {
            return Ok(id);
        }

        // providers/{ns} followed by one or more type/name pairs
        let rest = &parts[4..];
        if rest.len() < 4 || rest.len() % 2 != 0 || !rest[0].eq_ignore_ascii_case("providers") {
            return Err(invalid());
        }
        id.provider = Some(rest[1].to_string());
        id.segments = rest[2..]
            .chunks(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();
        Ok(id)
    }
}

/// A collection of resources of one type within a resource group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: String,
    pub resource_type: String,
}

impl ResourceScope {
    pub fn network(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: NETWORK_PROVIDER.to_string(),
            resource_type: resource_type.into(),
        }
    }
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
            self.subscription_id, self.resource_group, self.provider, self.resource_type
        )
    }
}
