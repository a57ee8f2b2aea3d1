//! Request normalizers
//!
//! Turn declarative specs into the request bodies the control plane
//! expects. Everything here is pure: identifiers are resolved through the
//! [`SubscriptionRegistry`](crate::registry::SubscriptionRegistry) but no
//! remote call is made.

pub mod gateway;
pub mod link;
pub mod network;
pub mod route;
pub mod security;

use crate::error::Result;
use crate::resource_id::ResourceId;
use serde::Serialize;

/// Reference to another addressable resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubResource {
    pub id: String,
}

impl SubResource {
    pub fn new(id: &ResourceId) -> Self {
        Self { id: id.to_string() }
    }
}

/// Named child entry (`{name, properties}`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Named<T> {
    pub name: String,
    pub properties: T,
}

impl<T> Named<T> {
    pub fn new(name: impl Into<String>, properties: T) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sku {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

/// Top-level create-or-update body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    pub properties: T,
}

impl<T: Serialize> RequestBody<T> {
    pub fn located(location: impl Into<String>, properties: T) -> Self {
        Self {
            location: Some(location.into()),
            sku: None,
            properties,
        }
    }

    /// Body of a child resource, which carries no location
    pub fn unlocated(properties: T) -> Self {
        Self {
            location: None,
            sku: None,
            properties,
        }
    }

    pub fn with_sku(mut self, sku: Sku) -> Self {
        self.sku = Some(sku);
        self
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Location used by global resources such as private DNS zones
pub const GLOBAL_LOCATION: &str = "global";

/// Body for a resource with no properties of its own
pub fn empty_body(location: &str) -> serde_json::Value {
    serde_json::json!({ "location": location, "properties": {} })
}
