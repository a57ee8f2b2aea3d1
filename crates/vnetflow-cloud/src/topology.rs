//! Load-balancer topology builder
//!
//! A load balancer is built along exactly one of three paths, selected once
//! from its `type` and `tier`:
//!
//! ```text
//! type     tier       variant          frontend        backend members          probes  outbound
//! public   Global     PublicGlobal     public IP       other LBs' frontends     -       -
//! public   Regional   PublicRegional   public IP       (vnet, subnet, ip)       yes     yes
//! private  any        Private          subnet + ip     (vnet, subnet, ip)       yes     -
//! ```
//!
//! Sub-resources reference each other by fully-qualified identifier because
//! the control plane resolves them as addressable entities. Regional and
//! private load balancers are followed by a NIC reconciliation step that
//! attaches matching interfaces to their backend pool.

use crate::control_plane::Resource;
use crate::error::{CloudError, Result};
use crate::model::{BackendAddressSpec, LoadBalancerSpec};
use crate::normalize::{Named, RequestBody, Sku, SubResource};
use crate::registry::SubscriptionRegistry;
use crate::resource_id::{ResourceId, types};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Construction path of one load balancer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalancerVariant {
    PublicGlobal,
    PublicRegional,
    Private,
}

impl LoadBalancerVariant {
    pub fn classify(lb_type: &str, tier: Option<&str>) -> Result<Self> {
        if lb_type.eq_ignore_ascii_case("private") {
            return Ok(Self::Private);
        }
        if !lb_type.eq_ignore_ascii_case("public") {
            return Err(CloudError::InvalidConfig(format!(
                "unknown load balancer type `{}` (expected public or private)",
                lb_type
            )));
        }
        match tier {
            Some(t) if t.eq_ignore_ascii_case("global") => Ok(Self::PublicGlobal),
            Some(t) if t.eq_ignore_ascii_case("regional") => Ok(Self::PublicRegional),
            Some(t) => Err(CloudError::InvalidConfig(format!(
                "unknown public load balancer tier `{}` (expected Global or Regional)",
                t
            ))),
            None => Err(CloudError::InvalidConfig(
                "public load balancer requires a tier".to_string(),
            )),
        }
    }

    /// Whether backend NICs must be attached to the pool after creation
    pub fn needs_nic_reconciliation(&self) -> bool {
        matches!(self, Self::PublicRegional | Self::Private)
    }

    /// Whether pools are re-applied as child resources after creation
    pub fn reapplies_pools(&self) -> bool {
        matches!(self, Self::PublicGlobal)
    }
}

impl fmt::Display for LoadBalancerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicGlobal => write!(f, "public/global"),
            Self::PublicRegional => write!(f, "public/regional"),
            Self::Private => write!(f, "private"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontendIpProperties {
    #[serde(rename = "publicIPAddress", skip_serializing_if = "Option::is_none")]
    pub public_ip_address: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,
    #[serde(rename = "privateIPAddress", skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,
    #[serde(
        rename = "privateIPAllocationMethod",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_allocation_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendAddressProperties {
    #[serde(
        rename = "loadBalancerFrontendIPConfiguration",
        skip_serializing_if = "Option::is_none"
    )]
    pub frontend_ip_configuration: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_network: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPoolProperties {
    pub load_balancer_backend_addresses: Vec<Named<BackendAddressProperties>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeProperties {
    pub protocol: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_in_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancingRuleProperties {
    #[serde(rename = "frontendIPConfiguration")]
    pub frontend_ip_configuration: SubResource,
    pub backend_address_pools: Vec<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<SubResource>,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_distribution: Option<String>,
    pub frontend_port: u16,
    pub backend_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<u32>,
    #[serde(rename = "enableFloatingIP")]
    pub enable_floating_ip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tcp_reset: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_outbound_snat: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRuleProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_outbound_ports: Option<u32>,
    #[serde(rename = "frontendIPConfigurations")]
    pub frontend_ip_configurations: Vec<SubResource>,
    pub backend_address_pool: SubResource,
    pub protocol: String,
    pub enable_tcp_reset: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerProperties {
    #[serde(rename = "frontendIPConfigurations")]
    pub frontend_ip_configurations: Vec<Named<FrontendIpProperties>>,
    pub backend_address_pools: Vec<Named<BackendPoolProperties>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<Named<ProbeProperties>>,
    pub load_balancing_rules: Vec<Named<LoadBalancingRuleProperties>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outbound_rules: Vec<Named<OutboundRuleProperties>>,
}

/// One backend pool of a planned load balancer
#[derive(Debug, Clone, PartialEq)]
pub struct PoolPlan {
    pub id: ResourceId,
    pub properties: BackendPoolProperties,
    /// Private IPs whose interfaces belong in this pool
    pub member_ips: Vec<String>,
}

impl PoolPlan {
    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn entry(&self) -> Named<BackendPoolProperties> {
        Named::new(self.name(), self.properties.clone())
    }

    /// Body for applying the pool as a child resource of its load balancer
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.entry())?)
    }
}

/// Everything needed to apply one load balancer
#[derive(Debug, Clone, PartialEq)]
pub struct LoadBalancerPlan {
    pub variant: LoadBalancerVariant,
    pub id: ResourceId,
    pub body: RequestBody<LoadBalancerProperties>,
    pub pools: Vec<PoolPlan>,
}

/// Classify a load balancer and build its full request
pub fn build(spec: &LoadBalancerSpec, registry: &SubscriptionRegistry) -> Result<LoadBalancerPlan> {
    let variant = LoadBalancerVariant::classify(&spec.lb_type, spec.tier.as_deref())?;
    let subscription_id = registry.resolve(&spec.resource_group)?;
    let builder = Builder::new(spec, subscription_id)?;

    let (properties, pools) = match variant {
        LoadBalancerVariant::PublicGlobal => build_public_global(&builder, registry)?,
        LoadBalancerVariant::PublicRegional => build_public_regional(&builder)?,
        LoadBalancerVariant::Private => build_private(&builder)?,
    };

    tracing::debug!(
        load_balancer = %spec.name,
        %variant,
        pools = pools.len(),
        rules = properties.load_balancing_rules.len(),
        "Built load balancer topology"
    );

    let body = RequestBody::located(spec.location.clone(), properties).with_sku(Sku {
        name: spec.sku.clone(),
        tier: spec.tier.clone(),
    });

    Ok(LoadBalancerPlan {
        variant,
        id: builder.id,
        body,
        pools,
    })
}

fn build_public_global(
    builder: &Builder<'_>,
    registry: &SubscriptionRegistry,
) -> Result<(LoadBalancerProperties, Vec<PoolPlan>)> {
    let spec = builder.spec;
    if !spec.health_probes.is_empty() {
        tracing::warn!(load_balancer = %spec.name, "Global load balancers take no health probes; ignoring them");
    }
    if !spec.outbound_nat_rules.is_empty() {
        tracing::warn!(load_balancer = %spec.name, "Global load balancers take no outbound rules; ignoring them");
    }

    let frontend = builder.public_frontend()?;
    let pools = builder.pools(|address| {
        let context = format!("backend address {}", address.name);
        let rg = required(&address.backend_load_balancer_rg, "backend_load_balancer_rg", &context)?;
        let lb = required(&address.backend_load_balancer_name, "backend_load_balancer_name", &context)?;
        let frontend_ip = required(
            &address.backend_load_balancer_frontend_ip_name,
            "backend_load_balancer_frontend_ip_name",
            &context,
        )?;

        // Each member may live in its own subscription.
        let subscription_id = registry.resolve(rg)?;
        let target = ResourceId::network(subscription_id, rg, types::LOAD_BALANCERS, lb)
            .child(types::FRONTEND_IP_CONFIGURATIONS, frontend_ip);

        Ok((
            BackendAddressProperties {
                frontend_ip_configuration: Some(SubResource::new(&target)),
                virtual_network: None,
                subnet: None,
                ip_address: None,
            },
            None,
        ))
    })?;
    let rules = builder.rules(false)?;

    Ok((
        LoadBalancerProperties {
            frontend_ip_configurations: vec![frontend],
            backend_address_pools: pools.iter().map(PoolPlan::entry).collect(),
            probes: Vec::new(),
            load_balancing_rules: rules,
            outbound_rules: Vec::new(),
        },
        pools,
    ))
}

fn build_public_regional(builder: &Builder<'_>) -> Result<(LoadBalancerProperties, Vec<PoolPlan>)> {
    let frontend = builder.public_frontend()?;
    let pools = builder.pools(|address| builder.network_address(address))?;
    let probes = builder.probes()?;
    let rules = builder.rules(true)?;
    let outbound_rules = builder.outbound_rules()?;

    Ok((
        LoadBalancerProperties {
            frontend_ip_configurations: vec![frontend],
            backend_address_pools: pools.iter().map(PoolPlan::entry).collect(),
            probes,
            load_balancing_rules: rules,
            outbound_rules,
        },
        pools,
    ))
}

fn build_private(builder: &Builder<'_>) -> Result<(LoadBalancerProperties, Vec<PoolPlan>)> {
    let spec = builder.spec;
    if !spec.outbound_nat_rules.is_empty() {
        tracing::warn!(load_balancer = %spec.name, "Private load balancers take no outbound rules; ignoring them");
    }

    let frontend = builder.private_frontend()?;
    let pools = builder.pools(|address| builder.network_address(address))?;
    let probes = builder.probes()?;
    let rules = builder.rules(true)?;

    Ok((
        LoadBalancerProperties {
            frontend_ip_configurations: vec![frontend],
            backend_address_pools: pools.iter().map(PoolPlan::entry).collect(),
            probes,
            load_balancing_rules: rules,
            outbound_rules: Vec::new(),
        },
        pools,
    ))
}

fn required<'a>(value: &'a Option<String>, field: &str, context: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| CloudError::missing_field(field, context))
}

fn ensure_unique<'a>(kind: &str, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(CloudError::InvalidConfig(format!(
                "duplicate {} name `{}`",
                kind, name
            )));
        }
    }
    Ok(())
}

/// Shared state of one topology build
struct Builder<'a> {
    spec: &'a LoadBalancerSpec,
    subscription_id: &'a str,
    id: ResourceId,
    frontend_name: &'a str,
    context: String,
}

impl<'a> Builder<'a> {
    fn new(spec: &'a LoadBalancerSpec, subscription_id: &'a str) -> Result<Self> {
        let context = format!("load balancer {}", spec.name);
        let frontend_name = required(&spec.frontend_name, "frontend_name", &context)?;

        ensure_unique("backend pool", spec.backend_pools.iter().map(|p| p.name.as_str()))?;
        ensure_unique("health probe", spec.health_probes.iter().map(|p| p.name.as_str()))?;
        ensure_unique(
            "load balancing rule",
            spec.load_balancing_rules.iter().map(|r| r.name.as_str()),
        )?;
        ensure_unique(
            "outbound rule",
            spec.outbound_nat_rules.iter().map(|r| r.name.as_str()),
        )?;

        Ok(Self {
            spec,
            subscription_id,
            id: ResourceId::network(
                subscription_id,
                &spec.resource_group,
                types::LOAD_BALANCERS,
                &spec.name,
            ),
            frontend_name,
            context,
        })
    }

    fn frontend_id(&self) -> ResourceId {
        self.id
            .child(types::FRONTEND_IP_CONFIGURATIONS, self.frontend_name)
    }

    fn local(&self, resource_type: &str, name: &str) -> ResourceId {
        ResourceId::network(
            self.subscription_id,
            &self.spec.resource_group,
            resource_type,
            name,
        )
    }

    fn public_frontend(&self) -> Result<Named<FrontendIpProperties>> {
        let public_ip = required(&self.spec.public_ip_name, "public_ip_name", &self.context)?;
        Ok(Named::new(
            self.frontend_name,
            FrontendIpProperties {
                public_ip_address: Some(SubResource::new(
                    &self.local(types::PUBLIC_IP_ADDRESSES, public_ip),
                )),
                subnet: None,
                private_ip_address: None,
                private_ip_allocation_method: None,
            },
        ))
    }

    fn private_frontend(&self) -> Result<Named<FrontendIpProperties>> {
        let vnet = required(&self.spec.vnet_name, "vnet_name", &self.context)?;
        let subnet = required(&self.spec.subnet_name, "subnet_name", &self.context)?;
        let allocation = match (&self.spec.private_ip_allocation_method, &self.spec.ip_address) {
            (Some(method), _) => method.clone(),
            (None, Some(_)) => "Static".to_string(),
            (None, None) => "Dynamic".to_string(),
        };
        if allocation.eq_ignore_ascii_case("static") && self.spec.ip_address.is_none() {
            return Err(CloudError::missing_field(
                "ip_address",
                format!("{} with static allocation", self.context),
            ));
        }

        let subnet_id = self
            .local(types::VIRTUAL_NETWORKS, vnet)
            .child(types::SUBNETS, subnet);
        Ok(Named::new(
            self.frontend_name,
            FrontendIpProperties {
                public_ip_address: None,
                subnet: Some(SubResource::new(&subnet_id)),
                private_ip_address: self.spec.ip_address.clone(),
                private_ip_allocation_method: Some(allocation),
            },
        ))
    }

    /// Backend member addressed by (vnet, subnet, ip) in this load balancer's group
    fn network_address(
        &self,
        address: &BackendAddressSpec,
    ) -> Result<(BackendAddressProperties, Option<String>)> {
        let context = format!("backend address {} of {}", address.name, self.context);
        let vnet = required(&address.vnet_name, "vnet_name", &context)?;
        let subnet = required(&address.subnet_name, "subnet_name", &context)?;
        let ip = required(&address.ip_address, "ip_address", &context)?;

        let vnet_id = self.local(types::VIRTUAL_NETWORKS, vnet);
        let subnet_id = vnet_id.child(types::SUBNETS, subnet);
        Ok((
            BackendAddressProperties {
                frontend_ip_configuration: None,
                virtual_network: Some(SubResource::new(&vnet_id)),
                subnet: Some(SubResource::new(&subnet_id)),
                ip_address: Some(ip.to_string()),
            },
            Some(ip.to_string()),
        ))
    }

    fn pools<F>(&self, address: F) -> Result<Vec<PoolPlan>>
    where
        F: Fn(&BackendAddressSpec) -> Result<(BackendAddressProperties, Option<String>)>,
    {
        if self.spec.backend_pools.is_empty() {
            return Err(CloudError::missing_field("backend_pools", &self.context));
        }

        self.spec
            .backend_pools
            .iter()
            .map(|pool| {
                let mut addresses = Vec::with_capacity(pool.backend_addresses.len());
                let mut member_ips = Vec::new();
                for spec in &pool.backend_addresses {
                    let (properties, ip) = address(spec)?;
                    addresses.push(Named::new(spec.name.clone(), properties));
                    member_ips.extend(ip);
                }
                Ok(PoolPlan {
                    id: self.id.child(types::BACKEND_ADDRESS_POOLS, &pool.name),
                    properties: BackendPoolProperties {
                        load_balancer_backend_addresses: addresses,
                    },
                    member_ips,
                })
            })
            .collect()
    }

    fn probes(&self) -> Result<Vec<Named<ProbeProperties>>> {
        if self.spec.health_probes.is_empty() {
            return Err(CloudError::missing_field("health_probes", &self.context));
        }
        Ok(self
            .spec
            .health_probes
            .iter()
            .map(|probe| {
                Named::new(
                    probe.name.clone(),
                    ProbeProperties {
                        protocol: probe.protocol.clone(),
                        port: probe.port,
                        interval_in_seconds: probe.interval,
                        request_path: probe.request_path.clone(),
                    },
                )
            })
            .collect())
    }

    /// Pool a rule feeds: the named one, or the first declared
    fn bind_pool(&self, requested: Option<&str>, rule: &str) -> Result<ResourceId> {
        let pool = match requested {
            Some(name) => self
                .spec
                .backend_pools
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| {
                    CloudError::InvalidConfig(format!(
                        "rule {} references unknown backend pool `{}`",
                        rule, name
                    ))
                })?,
            None => self
                .spec
                .backend_pools
                .first()
                .ok_or_else(|| CloudError::missing_field("backend_pools", &self.context))?,
        };
        Ok(self.id.child(types::BACKEND_ADDRESS_POOLS, &pool.name))
    }

    fn bind_probe(&self, requested: Option<&str>, rule: &str) -> Result<ResourceId> {
        let probe = match requested {
            Some(name) => self
                .spec
                .health_probes
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| {
                    CloudError::InvalidConfig(format!(
                        "rule {} references unknown health probe `{}`",
                        rule, name
                    ))
                })?,
            None => self
                .spec
                .health_probes
                .first()
                .ok_or_else(|| CloudError::missing_field("health_probes", &self.context))?,
        };
        Ok(self.id.child(types::PROBES, &probe.name))
    }

    fn rules(&self, with_probe: bool) -> Result<Vec<Named<LoadBalancingRuleProperties>>> {
        if self.spec.load_balancing_rules.is_empty() {
            return Err(CloudError::missing_field(
                "load_balancing_rules",
                &self.context,
            ));
        }

        let frontend = SubResource::new(&self.frontend_id());
        self.spec
            .load_balancing_rules
            .iter()
            .map(|rule| {
                let pool = self.bind_pool(rule.backend_pool_name.as_deref(), &rule.name)?;
                let probe = if with_probe {
                    Some(SubResource::new(
                        &self.bind_probe(rule.probe_name.as_deref(), &rule.name)?,
                    ))
                } else {
                    None
                };

                Ok(Named::new(
                    rule.name.clone(),
                    LoadBalancingRuleProperties {
                        frontend_ip_configuration: frontend.clone(),
                        backend_address_pools: vec![SubResource::new(&pool)],
                        probe,
                        protocol: rule.protocol.clone(),
                        load_distribution: rule.load_distribution.clone(),
                        frontend_port: rule.frontend_port,
                        backend_port: rule.backend_port,
                        idle_timeout_in_minutes: rule.idle_timeout,
                        enable_floating_ip: rule.floating_ip,
                        enable_tcp_reset: rule.tcp_reset,
                        disable_outbound_snat: rule.disable_outbound_snat,
                    },
                ))
            })
            .collect()
    }

    fn outbound_rules(&self) -> Result<Vec<Named<OutboundRuleProperties>>> {
        if self.spec.outbound_nat_rules.is_empty() {
            return Err(CloudError::missing_field(
                "outbound_nat_rules",
                &self.context,
            ));
        }

        let frontend = SubResource::new(&self.frontend_id());
        self.spec
            .outbound_nat_rules
            .iter()
            .map(|rule| {
                let pool = self.bind_pool(rule.backend_pool_name.as_deref(), &rule.name)?;
                Ok(Named::new(
                    rule.name.clone(),
                    OutboundRuleProperties {
                        allocated_outbound_ports: rule.allocated_outbound_ports,
                        frontend_ip_configurations: vec![frontend.clone()],
                        backend_address_pool: SubResource::new(&pool),
                        protocol: rule.protocol.clone(),
                        enable_tcp_reset: rule.tcp_reset,
                        idle_timeout_in_minutes: rule.idle_timeout,
                    },
                ))
            })
            .collect()
    }
}

/// A network interface that needs re-applying
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceUpdate {
    pub name: String,
    pub body: Value,
}

/// Attach interfaces to the pools whose members carry their private IP
///
/// A pool reference already present on an IP configuration is left alone,
/// so only interfaces that actually change are returned.
pub fn reconcile_interfaces(nics: &[Resource], pools: &[PoolPlan]) -> Vec<InterfaceUpdate> {
    let mut updates = Vec::new();

    for nic in nics {
        let mut updated = nic.clone();
        let mut changed = false;

        let Some(configs) = updated
            .properties
            .get_mut("ipConfigurations")
            .and_then(Value::as_array_mut)
        else {
            continue;
        };

        for config in configs.iter_mut() {
            let Some(config_props) = config
                .get_mut("properties")
                .and_then(Value::as_object_mut)
            else {
                continue;
            };
            let Some(ip) = config_props
                .get("privateIPAddress")
                .and_then(Value::as_str)
                .map(str::to_string)
            else {
                continue;
            };

            for pool in pools.iter().filter(|p| p.member_ips.contains(&ip)) {
                let pool_id = pool.id.to_string();
                let refs = config_props
                    .entry("loadBalancerBackendAddressPools")
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !refs.is_array() {
                    *refs = Value::Array(Vec::new());
                }
                let Some(list) = refs.as_array_mut() else {
                    continue;
                };

                let attached = list.iter().any(|r| {
                    r.get("id")
                        .and_then(Value::as_str)
                        .is_some_and(|id| id.eq_ignore_ascii_case(&pool_id))
                });
                if !attached {
                    tracing::debug!(nic = %nic.name, %ip, pool = %pool.name(), "Attaching interface to backend pool");
                    list.push(serde_json::json!({ "id": pool_id }));
                    changed = true;
                }
            }
        }

        if changed {
            updates.push(InterfaceUpdate {
                name: nic.name.clone(),
                body: updated.to_body(),
            });
        }
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkConfig;

    fn registry() -> SubscriptionRegistry {
        let config: NetworkConfig = serde_json::from_value(serde_json::json!({
            "resource_groups": [
                {"resource_group": "rg-a", "subscription_id": "sub-1", "location": "eastus"},
                {"resource_group": "rg-west", "subscription_id": "sub-2", "location": "westus"}
            ]
        }))
        .unwrap();
        SubscriptionRegistry::from_config(&config)
    }

    fn lb(json: serde_json::Value) -> LoadBalancerSpec {
        serde_json::from_value(json).unwrap()
    }

    fn private_lb() -> LoadBalancerSpec {
        lb(serde_json::json!({
            "resource_group": "rg-a",
            "location": "eastus",
            "name": "ilb",
            "type": "private",
            "sku": "Standard",
            "tier": "Regional",
            "frontend_name": "fe",
            "vnet_name": "vnet-1",
            "subnet_name": "app",
            "ip_address": "10.0.1.10",
            "backend_pools": [{
                "name": "pool-a",
                "backend_addresses": [
                    {"name": "vm1", "vnet_name": "vnet-1", "subnet_name": "app", "ip_address": "10.0.1.4"}
                ]
            }],
            "load_balancing_rules": [{
                "name": "http", "protocol": "Tcp", "frontend_port": 80, "backend_port": 80,
                "idle_timeout": 4
            }],
            "health_probes": [{"name": "probe-http", "protocol": "Http", "port": 80,
                               "interval": 5, "request_path": "/healthz"}]
        }))
    }

    fn regional_lb() -> LoadBalancerSpec {
        lb(serde_json::json!({
            "resource_group": "rg-a",
            "location": "eastus",
            "name": "plb",
            "type": "public",
            "sku": "Standard",
            "tier": "Regional",
            "frontend_name": "fe",
            "public_ip_name": "pip-lb",
            "backend_pools": [
                {"name": "pool-a", "backend_addresses": [
                    {"name": "vm1", "vnet_name": "vnet-1", "subnet_name": "app", "ip_address": "10.0.1.4"}
                ]},
                {"name": "pool-b", "backend_addresses": [
                    {"name": "vm2", "vnet_name": "vnet-1", "subnet_name": "app", "ip_address": "10.0.1.5"}
                ]}
            ],
            "load_balancing_rules": [
                {"name": "http", "protocol": "Tcp", "frontend_port": 80, "backend_port": 80},
                {"name": "https", "protocol": "Tcp", "frontend_port": 443, "backend_port": 443,
                 "backend_pool_name": "pool-b", "probe_name": "probe-tls", "tcp_reset": true}
            ],
            "health_probes": [
                {"name": "probe-http", "protocol": "Tcp", "port": 80},
                {"name": "probe-tls", "protocol": "Tcp", "port": 443}
            ],
            "outbound_nat_rules": [
                {"name": "egress", "protocol": "All", "allocated_outbound_ports": 1024,
                 "tcp_reset": true, "idle_timeout": 4}
            ]
        }))
    }

    fn global_lb() -> LoadBalancerSpec {
        lb(serde_json::json!({
            "resource_group": "rg-a",
            "location": "eastus",
            "name": "glb",
            "type": "public",
            "sku": "Standard",
            "tier": "Global",
            "frontend_name": "fe",
            "public_ip_name": "pip-global",
            "backend_pools": [{
                "name": "regions",
                "backend_addresses": [{
                    "name": "west",
                    "backend_load_balancer_rg": "rg-west",
                    "backend_load_balancer_name": "plb-west",
                    "backend_load_balancer_frontend_ip_name": "fe-west"
                }]
            }],
            "load_balancing_rules": [
                {"name": "http", "protocol": "Tcp", "frontend_port": 80, "backend_port": 80}
            ],
            "health_probes": [{"name": "ignored", "protocol": "Tcp", "port": 80}]
        }))
    }

    #[test]
    fn test_classify_variants() {
        assert_eq!(
            LoadBalancerVariant::classify("public", Some("Global")).unwrap(),
            LoadBalancerVariant::PublicGlobal
        );
        assert_eq!(
            LoadBalancerVariant::classify("Public", Some("regional")).unwrap(),
            LoadBalancerVariant::PublicRegional
        );
        assert_eq!(
            LoadBalancerVariant::classify("private", None).unwrap(),
            LoadBalancerVariant::Private
        );
        assert!(LoadBalancerVariant::classify("public", None).is_err());
        assert!(LoadBalancerVariant::classify("public", Some("Zonal")).is_err());
        assert!(LoadBalancerVariant::classify("internal", None).is_err());
    }

    #[test]
    fn test_variant_steps() {
        assert!(!LoadBalancerVariant::PublicGlobal.needs_nic_reconciliation());
        assert!(LoadBalancerVariant::PublicGlobal.reapplies_pools());
        assert!(LoadBalancerVariant::PublicRegional.needs_nic_reconciliation());
        assert!(LoadBalancerVariant::Private.needs_nic_reconciliation());
        assert!(!LoadBalancerVariant::Private.reapplies_pools());
    }

    #[test]
    fn test_private_topology() {
        let plan = build(&private_lb(), &registry()).unwrap();
        assert_eq!(plan.variant, LoadBalancerVariant::Private);

        let json = plan.body.to_json().unwrap();
        let props = &json["properties"];
        let frontend = &props["frontendIPConfigurations"][0];
        assert_eq!(frontend["name"], "fe");
        assert_eq!(frontend["properties"]["privateIPAddress"], "10.0.1.10");
        assert_eq!(frontend["properties"]["privateIPAllocationMethod"], "Static");
        assert!(frontend["properties"].get("publicIPAddress").is_none());
        assert_eq!(
            frontend["properties"]["subnet"]["id"],
            "/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.Network/virtualNetworks/vnet-1/subnets/app"
        );

        let rule = &props["loadBalancingRules"][0]["properties"];
        assert_eq!(
            rule["frontendIPConfiguration"]["id"],
            "/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.Network/loadBalancers/ilb/frontendIPConfigurations/fe"
        );
        assert_eq!(
            rule["backendAddressPools"][0]["id"],
            "/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.Network/loadBalancers/ilb/backendAddressPools/pool-a"
        );
        assert_eq!(
            rule["probe"]["id"],
            "/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.Network/loadBalancers/ilb/probes/probe-http"
        );
        assert_eq!(rule["idleTimeoutInMinutes"], 4);
        assert_eq!(props["probes"][0]["properties"]["requestPath"], "/healthz");
        assert!(props.get("outboundRules").is_none());
        assert_eq!(json["sku"], serde_json::json!({"name": "Standard", "tier": "Regional"}));

        assert_eq!(plan.pools.len(), 1);
        assert_eq!(plan.pools[0].member_ips, vec!["10.0.1.4"]);
    }

    #[test]
    fn test_private_dynamic_allocation_without_ip() {
        let mut spec = private_lb();
        spec.ip_address = None;
        let plan = build(&spec, &registry()).unwrap();
        let frontend = &plan.body.properties.frontend_ip_configurations[0].properties;
        assert_eq!(frontend.private_ip_allocation_method.as_deref(), Some("Dynamic"));
        assert!(frontend.private_ip_address.is_none());
    }

    #[test]
    fn test_private_missing_subnet_is_config_error() {
        let mut spec = private_lb();
        spec.subnet_name = None;
        let err = build(&spec, &registry()).unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(ref m) if m.contains("subnet_name")));
    }

    #[test]
    fn test_private_ignores_outbound_rules() {
        let mut spec = private_lb();
        spec.outbound_nat_rules = regional_lb().outbound_nat_rules;
        let plan = build(&spec, &registry()).unwrap();
        assert!(plan.body.properties.outbound_rules.is_empty());
    }

    #[test]
    fn test_regional_rules_bind_named_or_first() {
        let plan = build(&regional_lb(), &registry()).unwrap();
        let props = &plan.body.properties;

        assert_eq!(props.backend_address_pools.len(), 2);
        assert_eq!(props.probes.len(), 2);
        assert_eq!(props.outbound_rules.len(), 1);

        let http = &props.load_balancing_rules[0].properties;
        assert!(http.backend_address_pools[0].id.ends_with("/backendAddressPools/pool-a"));
        assert!(http.probe.as_ref().unwrap().id.ends_with("/probes/probe-http"));

        let https = &props.load_balancing_rules[1].properties;
        assert!(https.backend_address_pools[0].id.ends_with("/backendAddressPools/pool-b"));
        assert!(https.probe.as_ref().unwrap().id.ends_with("/probes/probe-tls"));
        assert_eq!(https.enable_tcp_reset, Some(true));

        let egress = &props.outbound_rules[0].properties;
        assert!(egress.backend_address_pool.id.ends_with("/backendAddressPools/pool-a"));
        assert_eq!(egress.allocated_outbound_ports, Some(1024));

        let json = plan.body.to_json().unwrap();
        let frontend = &json["properties"]["frontendIPConfigurations"][0]["properties"];
        assert_eq!(
            frontend["publicIPAddress"]["id"],
            "/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.Network/publicIPAddresses/pip-lb"
        );
        assert_eq!(
            json["properties"]["outboundRules"][0]["properties"]["frontendIPConfigurations"][0]["id"],
            "/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.Network/loadBalancers/plb/frontendIPConfigurations/fe"
        );
    }

    #[test]
    fn test_regional_requires_probes_and_outbound() {
        let mut no_probes = regional_lb();
        no_probes.health_probes.clear();
        for rule in &mut no_probes.load_balancing_rules {
            rule.probe_name = None;
        }
        assert!(build(&no_probes, &registry()).is_err());

        let mut no_outbound = regional_lb();
        no_outbound.outbound_nat_rules.clear();
        let err = build(&no_outbound, &registry()).unwrap_err();
        assert!(err.to_string().contains("outbound_nat_rules"));
    }

    #[test]
    fn test_regional_requires_public_ip() {
        let mut spec = regional_lb();
        spec.public_ip_name = None;
        let err = build(&spec, &registry()).unwrap_err();
        assert!(err.to_string().contains("public_ip_name"));
    }

    #[test]
    fn test_unknown_pool_reference() {
        let mut spec = regional_lb();
        spec.load_balancing_rules[0].backend_pool_name = Some("pool-z".to_string());
        let err = build(&spec, &registry()).unwrap_err();
        assert!(err.to_string().contains("pool-z"));
    }

    #[test]
    fn test_duplicate_rule_names_rejected() {
        let mut spec = regional_lb();
        spec.load_balancing_rules[1].name = "http".to_string();
        assert!(matches!(
            build(&spec, &registry()),
            Err(CloudError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_global_members_resolve_own_subscription() {
        let plan = build(&global_lb(), &registry()).unwrap();
        assert_eq!(plan.variant, LoadBalancerVariant::PublicGlobal);
        assert!(plan.body.properties.probes.is_empty());

        let rule = &plan.body.properties.load_balancing_rules[0].properties;
        assert!(rule.probe.is_none());

        let pool = &plan.pools[0];
        assert!(pool.member_ips.is_empty());
        let json = pool.to_json().unwrap();
        assert_eq!(json["name"], "regions");
        assert_eq!(
            json["properties"]["loadBalancerBackendAddresses"][0]["properties"]["loadBalancerFrontendIPConfiguration"]["id"],
            "/subscriptions/sub-2/resourceGroups/rg-west/providers/Microsoft.Network/loadBalancers/plb-west/frontendIPConfigurations/fe-west"
        );
    }

    #[test]
    fn test_global_member_with_unknown_group() {
        let mut spec = global_lb();
        spec.backend_pools[0].backend_addresses[0].backend_load_balancer_rg =
            Some("rg-nowhere".to_string());
        assert!(matches!(
            build(&spec, &registry()),
            Err(CloudError::SubscriptionNotFound(_))
        ));
    }

    fn nic(name: &str, ip: &str, pools: Value) -> Resource {
        serde_json::from_value(serde_json::json!({
            "id": format!("/subscriptions/sub-1/resourceGroups/rg-a/providers/Microsoft.Network/networkInterfaces/{}", name),
            "name": name,
            "location": "eastus",
            "properties": {
                "ipConfigurations": [{
                    "name": "ipconfig1",
                    "properties": {
                        "privateIPAddress": ip,
                        "loadBalancerBackendAddressPools": pools
                    }
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_reconcile_attaches_matching_interface_once() {
        let plan = build(&private_lb(), &registry()).unwrap();
        let nics = vec![
            nic("vm1-nic", "10.0.1.4", serde_json::json!([])),
            nic("vm9-nic", "10.0.1.99", serde_json::json!([])),
        ];

        let updates = reconcile_interfaces(&nics, &plan.pools);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, "vm1-nic");
        assert_eq!(updates[0].body["location"], "eastus");
        let refs = &updates[0].body["properties"]["ipConfigurations"][0]["properties"]
            ["loadBalancerBackendAddressPools"];
        assert_eq!(refs.as_array().unwrap().len(), 1);
        assert_eq!(refs[0]["id"], plan.pools[0].id.to_string());
    }

    #[test]
    fn test_reconcile_already_attached_is_noop() {
        let plan = build(&private_lb(), &registry()).unwrap();
        let pool_id = plan.pools[0].id.to_string().to_uppercase();
        let nics = vec![nic("vm1-nic", "10.0.1.4", serde_json::json!([{ "id": pool_id }]))];
        assert!(reconcile_interfaces(&nics, &plan.pools).is_empty());
    }

    #[test]
    fn test_reconcile_keeps_other_pools() {
        let plan = build(&private_lb(), &registry()).unwrap();
        let nics = vec![nic("vm1-nic", "10.0.1.4", serde_json::json!([{ "id": "/other-pool" }]))];
        let updates = reconcile_interfaces(&nics, &plan.pools);
        let refs = &updates[0].body["properties"]["ipConfigurations"][0]["properties"]
            ["loadBalancerBackendAddressPools"];
        assert_eq!(refs.as_array().unwrap().len(), 2);
        assert_eq!(refs[0]["id"], "/other-pool");
    }
}
