//! Control plane collaborator
//!
//! The engine never talks to a cloud directly. Everything it needs from the
//! remote side goes through [`ControlPlane`], so tests can swap in an
//! in-memory implementation.

use crate::error::Result;
use crate::resource_id::{ResourceId, ResourceScope};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote infrastructure control plane
///
/// Implementations must make `create_or_update` idempotent and must not
/// return before the remote operation reached a terminal state.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Cheap existence probe for a resource group
    async fn resource_group_exists(&self, subscription_id: &str, resource_group: &str)
    -> Result<bool>;

    /// Create or update the resource at `id` and wait for the outcome
    async fn create_or_update(&self, id: &ResourceId, body: serde_json::Value) -> Result<Resource>;

    /// Read one resource; `CloudError::ResourceNotFound` when absent
    async fn get(&self, id: &ResourceId) -> Result<Resource>;

    /// List every resource in a collection
    async fn list(&self, scope: &ResourceScope) -> Result<Vec<Resource>>;
}

/// Resource envelope as confirmed by the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default)]
    pub properties: serde_json::Value,
}

impl Resource {
    pub fn new(id: &ResourceId, location: Option<String>, properties: serde_json::Value) -> Self {
        Self {
            id: id.to_string(),
            name: id.name().to_string(),
            location,
            properties,
        }
    }

    /// Read a property as a specific type
    pub fn property<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Request body carrying this resource's location and properties
    pub fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({ "properties": self.properties });
        if let Some(location) = &self.location {
            body["location"] = serde_json::json!(location);
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_id::types;

    #[test]
    fn test_resource_from_id() {
        let id = ResourceId::network("sub", "rg", types::ROUTE_TABLES, "rt-1");
        let resource = Resource::new(
            &id,
            Some("eastus".to_string()),
            serde_json::json!({"disableBgpRoutePropagation": true}),
        );
        assert_eq!(resource.name, "rt-1");
        assert_eq!(resource.id, id.to_string());
        assert_eq!(resource.property::<bool>("disableBgpRoutePropagation"), Some(true));
        assert_eq!(resource.property::<bool>("missing"), None);
    }

    #[test]
    fn test_to_body_keeps_location_and_properties() {
        let resource: Resource = serde_json::from_value(serde_json::json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic-1",
            "name": "nic-1",
            "location": "eastus",
            "properties": {"ipConfigurations": []}
        }))
        .unwrap();
        assert_eq!(
            resource.to_body(),
            serde_json::json!({"location": "eastus", "properties": {"ipConfigurations": []}})
        );
    }
}
