use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use vnetflow_cloud::{CloudError, ControlPlane, Resource, ResourceId, ResourceScope, Result};

/// In-memory control plane
///
/// Resources are keyed by their lowercased identifier. Applying a resource
/// group makes it exist; failures can be injected per identifier suffix.
#[derive(Default)]
pub struct FakeControlPlane {
    groups: Mutex<HashSet<(String, String)>>,
    resources: Mutex<BTreeMap<String, Resource>>,
    failures: Mutex<Vec<(String, String)>>,
    puts: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every create-or-update whose identifier ends with `suffix`
    pub fn fail_on(&self, suffix: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((suffix.to_lowercase(), message.to_string()));
    }

    pub fn seed(&self, resource: Resource) {
        self.resources
            .lock()
            .unwrap()
            .insert(resource.id.to_lowercase(), resource);
    }

    #[allow(dead_code)]
    pub fn seed_nic(&self, subscription_id: &str, resource_group: &str, name: &str, ip: &str) {
        let id = ResourceId::network(subscription_id, resource_group, "networkInterfaces", name);
        self.seed(Resource {
            id: id.to_string(),
            name: name.to_string(),
            location: Some("eastus".to_string()),
            properties: serde_json::json!({
                "ipConfigurations": [{
                    "name": "ipconfig1",
                    "properties": {
                        "privateIPAddress": ip,
                        "privateIPAllocationMethod": "Dynamic"
                    }
                }]
            }),
        });
    }

    pub fn resource(&self, id: &ResourceId) -> Option<Resource> {
        self.resources
            .lock()
            .unwrap()
            .get(&id.to_string().to_lowercase())
            .cloned()
    }

    /// Identifiers passed to create-or-update, in call order
    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn put_count(&self, id: &ResourceId) -> usize {
        let id = id.to_string();
        self.puts().iter().filter(|p| **p == id).count()
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn resource_group_exists(&self, subscription_id: &str, resource_group: &str) -> Result<bool> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .contains(&(subscription_id.to_string(), resource_group.to_string())))
    }

    async fn create_or_update(&self, id: &ResourceId, body: serde_json::Value) -> Result<Resource> {
        let key = id.to_string().to_lowercase();
        self.puts.lock().unwrap().push(id.to_string());

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(suffix, _)| key.ends_with(suffix.as_str()))
            .map(|(_, message)| message.clone());
        if let Some(message) = failure {
            return Err(CloudError::ApiError(message));
        }

        if id.is_resource_group() {
            self.groups.lock().unwrap().insert((
                id.subscription_id().to_string(),
                id.resource_group_name().to_string(),
            ));
        }

        let resource = Resource {
            id: id.to_string(),
            name: id.name().to_string(),
            location: body
                .get("location")
                .and_then(|l| l.as_str())
                .map(str::to_string),
            properties: body
                .get("properties")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({})),
        };
        self.resources.lock().unwrap().insert(key, resource.clone());
        Ok(resource)
    }

    async fn get(&self, id: &ResourceId) -> Result<Resource> {
        self.resource(id)
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))
    }

    async fn list(&self, scope: &ResourceScope) -> Result<Vec<Resource>> {
        let prefix = format!("{}/", scope).to_lowercase();
        Ok(self
            .resources
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| {
                key.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .map(|(_, resource)| resource.clone())
            .collect())
    }
}
