//! Declarative input document
//!
//! Mirrors the JSON file handed to the CLI. Every top-level array may be
//! omitted. Each entry that becomes a unit of work is wrapped in
//! [`Declared`] and parsed on its own, so one incomplete instance fails
//! only its own units and never the whole document. Fields that only some
//! load-balancer variants need are enforced later by [`crate::topology`].

use crate::error::{CloudError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::path::Path;

/// The whole input document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub resource_groups: Vec<Declared<ResourceGroupSpec>>,
    #[serde(default)]
    pub vnets: Vec<Declared<VnetSpec>>,
    #[serde(default)]
    pub private_dns_zones: Vec<Declared<PrivateDnsZoneSpec>>,
    #[serde(default)]
    pub public_ips: Vec<Declared<PublicIpSpec>>,
    #[serde(default)]
    pub local_network_gateways: Vec<Declared<LocalGatewaySpec>>,
    #[serde(default)]
    pub vpn_gateways: Vec<Declared<VpnGatewaySpec>>,
    #[serde(default)]
    pub load_balancers: Vec<Declared<LoadBalancerSpec>>,
}

impl NetworkConfig {
    /// Read and parse an input document
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config: NetworkConfig = serde_json::from_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            resource_groups = config.resource_groups.len(),
            vnets = config.vnets.len(),
            load_balancers = config.load_balancers.len(),
            "Loaded network configuration"
        );
        Ok(config)
    }
}

/// One declared entry, parsed independently of its siblings
///
/// The raw JSON is kept next to the parse outcome so a broken entry can
/// still be named in its failure record.
#[derive(Debug, Clone)]
pub struct Declared<T> {
    raw: Value,
    parsed: std::result::Result<T, String>,
}

impl<T> Declared<T> {
    /// The typed entry, if it parsed
    pub fn valid(&self) -> Option<&T> {
        self.parsed.as_ref().ok()
    }

    /// The typed entry, or the parse failure as a configuration error
    pub fn parsed(&self) -> Result<&T> {
        self.parsed
            .as_ref()
            .map_err(|e| CloudError::InvalidConfig(e.clone()))
    }

    /// A string field read from the raw entry; empty when absent
    pub fn text(&self, key: &str) -> &str {
        self.raw
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Whether the raw entry carries a non-null `key`
    pub fn declares(&self, key: &str) -> bool {
        self.raw.get(key).is_some_and(|v| !v.is_null())
    }
}

impl<T: DeserializeOwned> From<Value> for Declared<T> {
    fn from(raw: Value) -> Self {
        let parsed = T::deserialize(&raw).map_err(|e| e.to_string());
        Self { raw, parsed }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Declared<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl<T> Serialize for Declared<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGroupSpec {
    pub resource_group: String,
    pub subscription_id: String,
    pub location: String,
}

/// One CIDR or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressSpace {
    Single(String),
    Many(Vec<String>),
}

impl AddressSpace {
    pub fn prefixes(&self) -> Vec<String> {
        match self {
            AddressSpace::Single(prefix) => vec![prefix.clone()],
            AddressSpace::Many(prefixes) => prefixes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VnetSpec {
    pub resource_group: String,
    pub vnet_name: String,
    pub location: String,
    pub address_space: AddressSpace,
    #[serde(default)]
    pub subnets: Vec<Declared<SubnetSpec>>,
    #[serde(default)]
    pub peerings: Vec<Declared<PeeringSpec>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub subnet_name: String,
    pub subnet_prefix: String,
    pub nsg_name: Option<String>,
    /// Parsed as a whole; a broken rule fails only this subnet's NSG
    pub nsg_rules: Option<Declared<Vec<SecurityRuleSpec>>>,
    pub route_table_name: Option<String>,
    pub routes: Option<Declared<Vec<RouteSpec>>>,
    #[serde(default)]
    pub disable_bgp_propagation: bool,
}

/// Rule priority, accepted as a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Priority {
    Number(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRuleSpec {
    pub name: String,
    pub description: Option<String>,
    pub direction: String,
    pub priority: Priority,
    pub protocol: String,
    pub action: String,
    pub source_address_prefixes: Vec<String>,
    pub source_port_ranges: Vec<String>,
    pub destination_address_prefixes: Vec<String>,
    pub destination_port_ranges: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    pub name: String,
    pub address_prefix: String,
    pub next_hop_type: String,
    pub next_hop_ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeeringSpec {
    pub peering_name: String,
    #[serde(default)]
    pub peering_settings: PeeringSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeeringSettings {
    pub remote_virtual_network: Option<String>,
    #[serde(default = "default_true")]
    pub allow_virtual_network_access: bool,
    #[serde(default)]
    pub allow_forwarded_traffic: bool,
    #[serde(default)]
    pub allow_gateway_transit: bool,
    #[serde(default)]
    pub use_remote_gateways: bool,
}

impl Default for PeeringSettings {
    fn default() -> Self {
        Self {
            remote_virtual_network: None,
            allow_virtual_network_access: true,
            allow_forwarded_traffic: false,
            allow_gateway_transit: false,
            use_remote_gateways: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateDnsZoneSpec {
    pub resource_group: String,
    pub private_zone_name: String,
    #[serde(default)]
    pub virtual_network_links: Vec<Declared<VnetLinkSpec>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VnetLinkSpec {
    pub link_name: String,
    pub vnet_name: String,
    /// Resource group of the linked VNet; looked up among declared VNets when absent
    pub vnet_resource_group: Option<String>,
    #[serde(default)]
    pub registration_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicIpSpec {
    pub resource_group: String,
    pub location: String,
    pub name: String,
    pub version: String,
    pub allocation_method: String,
    pub sku: String,
    pub tier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalGatewaySpec {
    pub resource_group: String,
    pub location: String,
    pub name: String,
    pub ip_address: String,
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpnGatewaySpec {
    pub resource_group: String,
    pub location: String,
    pub name: String,
    pub gateway_type: String,
    pub sku: String,
    pub vpn_type: String,
    pub vnet_name: String,
    pub subnet_name: String,
    pub public_ip_name: String,
    #[serde(default)]
    pub enable_active_active: bool,
    #[serde(default)]
    pub connections: Vec<Declared<VpnConnectionSpec>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpnConnectionSpec {
    pub name: String,
    pub connection_type: String,
    pub local_gateway_name: String,
    pub dpd_timeout_seconds: Option<u32>,
    pub protocol_type: Option<String>,
    pub shared_key: Option<String>,
    #[serde(default)]
    pub enable_bgp: bool,
    #[serde(default)]
    pub ip_sec_policies: Vec<IpsecPolicySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpsecPolicySpec {
    pub sa_life_time_seconds: u32,
    pub sa_data_size_kilobytes: u32,
    pub ipsec_encryption: String,
    pub ipsec_integrity: String,
    pub ike_encryption: String,
    pub ike_integrity: String,
    pub dh_group: String,
    /// Perfect-forward-secrecy group; `None` when absent
    pub pfs_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerSpec {
    pub resource_group: String,
    pub location: String,
    pub name: String,
    #[serde(rename = "type")]
    pub lb_type: String,
    pub sku: String,
    pub tier: Option<String>,
    pub frontend_name: Option<String>,
    pub public_ip_name: Option<String>,
    pub vnet_name: Option<String>,
    pub subnet_name: Option<String>,
    pub ip_address: Option<String>,
    pub private_ip_allocation_method: Option<String>,
    #[serde(default)]
    pub backend_pools: Vec<BackendPoolSpec>,
    #[serde(default)]
    pub load_balancing_rules: Vec<LbRuleSpec>,
    #[serde(default)]
    pub health_probes: Vec<ProbeSpec>,
    #[serde(default)]
    pub outbound_nat_rules: Vec<OutboundRuleSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendPoolSpec {
    pub name: String,
    #[serde(default)]
    pub backend_addresses: Vec<BackendAddressSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendAddressSpec {
    pub name: String,
    pub vnet_name: Option<String>,
    pub subnet_name: Option<String>,
    pub ip_address: Option<String>,
    pub backend_load_balancer_rg: Option<String>,
    pub backend_load_balancer_name: Option<String>,
    pub backend_load_balancer_frontend_ip_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbRuleSpec {
    pub name: String,
    pub protocol: String,
    pub load_distribution: Option<String>,
    pub frontend_port: u16,
    pub backend_port: u16,
    pub idle_timeout: Option<u32>,
    #[serde(default)]
    pub floating_ip: bool,
    pub tcp_reset: Option<bool>,
    pub disable_outbound_snat: Option<bool>,
    /// Pool this rule feeds; the first declared pool when absent
    pub backend_pool_name: Option<String>,
    /// Probe gating this rule; the first declared probe when absent
    pub probe_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub name: String,
    pub protocol: String,
    pub port: u16,
    pub interval: Option<u32>,
    pub request_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundRuleSpec {
    pub name: String,
    pub allocated_outbound_ports: Option<u32>,
    pub protocol: String,
    #[serde(default)]
    pub tcp_reset: bool,
    pub idle_timeout: Option<u32>,
    pub backend_pool_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_arrays_default_to_empty() {
        let config: NetworkConfig = serde_json::from_str("{}").unwrap();
        assert!(config.resource_groups.is_empty());
        assert!(config.vnets.is_empty());
        assert!(config.load_balancers.is_empty());
    }

    #[test]
    fn test_address_space_single_or_list() {
        let vnet: VnetSpec = serde_json::from_value(serde_json::json!({
            "resource_group": "rg-a",
            "vnet_name": "vnet-1",
            "location": "eastus",
            "address_space": "10.0.0.0/16"
        }))
        .unwrap();
        assert_eq!(vnet.address_space.prefixes(), vec!["10.0.0.0/16"]);
        assert!(vnet.subnets.is_empty());

        let space: AddressSpace =
            serde_json::from_value(serde_json::json!(["10.0.0.0/16", "10.1.0.0/16"])).unwrap();
        assert_eq!(space.prefixes().len(), 2);
    }

    #[test]
    fn test_priority_number_or_string() {
        let n: Priority = serde_json::from_value(serde_json::json!(100)).unwrap();
        let s: Priority = serde_json::from_value(serde_json::json!("200")).unwrap();
        assert_eq!(n, Priority::Number(100));
        assert_eq!(s, Priority::Text("200".to_string()));

        let f: Priority = serde_json::from_value(serde_json::json!(100.0)).unwrap();
        assert_eq!(f, Priority::Float(100.0));
    }

    #[test]
    fn test_broken_entry_keeps_its_names() {
        let config: NetworkConfig = serde_json::from_value(serde_json::json!({
            "public_ips": [
                {"resource_group": "rg-a", "location": "eastus", "name": "pip-ok",
                 "version": "IPv4", "allocation_method": "Static", "sku": "Standard",
                 "tier": "Regional"},
                {"resource_group": "rg-a", "location": "eastus", "name": "pip-broken"}
            ]
        }))
        .unwrap();

        let ok = &config.public_ips[0];
        assert_eq!(ok.valid().unwrap().name, "pip-ok");

        let broken = &config.public_ips[1];
        assert!(broken.valid().is_none());
        assert_eq!(broken.text("name"), "pip-broken");
        assert_eq!(broken.text("sku"), "");
        assert!(!broken.declares("version"));

        let err = broken.parsed().unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
        assert!(err.to_string().contains("missing field `version`"));
    }

    #[test]
    fn test_nested_rule_list_parsed_as_a_whole() {
        let subnet: SubnetSpec = serde_json::from_value(serde_json::json!({
            "subnet_name": "db",
            "subnet_prefix": "10.0.2.0/24",
            "nsg_name": "nsg-db",
            "nsg_rules": [{"name": "allow-sql", "direction": "Inbound"}]
        }))
        .unwrap();

        assert_eq!(subnet.nsg_name.as_deref(), Some("nsg-db"));
        assert!(subnet.nsg_rules.unwrap().parsed().is_err());
        assert!(subnet.routes.is_none());
    }

    #[test]
    fn test_peering_settings_defaults() {
        let peering: PeeringSpec = serde_json::from_value(serde_json::json!({
            "peering_name": "a-to-b",
            "peering_settings": { "remote_virtual_network": "vnet-b" }
        }))
        .unwrap();
        let settings = &peering.peering_settings;
        assert_eq!(settings.remote_virtual_network.as_deref(), Some("vnet-b"));
        assert!(settings.allow_virtual_network_access);
        assert!(!settings.allow_forwarded_traffic);
        assert!(!settings.use_remote_gateways);
    }

    #[test]
    fn test_load_balancer_type_field() {
        let lb: LoadBalancerSpec = serde_json::from_value(serde_json::json!({
            "resource_group": "rg-a",
            "location": "eastus",
            "name": "lb-1",
            "type": "private",
            "sku": "Standard"
        }))
        .unwrap();
        assert_eq!(lb.lb_type, "private");
        assert!(lb.tier.is_none());
        assert!(lb.backend_pools.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(
            &path,
            r#"{"resource_groups":[{"resource_group":"rg-a","subscription_id":"sub-1","location":"eastus"}]}"#,
        )
        .unwrap();

        let config = NetworkConfig::load(&path).await.unwrap();
        assert_eq!(config.resource_groups.len(), 1);
        assert_eq!(config.resource_groups[0].valid().unwrap().subscription_id, "sub-1");
    }

    #[tokio::test]
    async fn test_load_malformed_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(NetworkConfig::load(&path).await.is_err());
    }
}
