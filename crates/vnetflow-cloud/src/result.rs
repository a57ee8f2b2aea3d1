//! Per-unit outcome records

use crate::control_plane::Resource;
use crate::error::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Outcome of one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

/// One output record
///
/// Serialized as a flat object: identifying name fields first, then
/// `resource_group`, confirmed details, `status` and `reason`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    kind: &'static str,
    names: Vec<(String, String)>,
    resource_group: String,
    status: Status,
    reason: Option<String>,
    details: Vec<(String, Value)>,
}

impl ApplyResult {
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Value of an identifying name field
    pub fn name(&self, field: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Primary name used in logs and the run summary
    pub fn display_name(&self) -> &str {
        self.names
            .last()
            .map(|(_, v)| v.as_str())
            .unwrap_or(&self.resource_group)
    }
}

impl Serialize for ApplyResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = self.names.len() + self.details.len() + 2 + usize::from(self.reason.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (field, value) in &self.names {
            // resource-group units use the group itself as their name
            if field != "resource_group" {
                map.serialize_entry(field, value)?;
            }
        }
        map.serialize_entry("resource_group", &self.resource_group)?;
        for (key, value) in &self.details {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("status", &self.status)?;
        if let Some(reason) = &self.reason {
            map.serialize_entry("reason", reason)?;
        }
        map.end()
    }
}

/// What the control plane confirmed for a successful unit
#[derive(Debug, Clone, Default)]
pub struct Confirmed {
    names: Vec<(String, String)>,
    details: Vec<(String, Value)>,
}

impl Confirmed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmed name and location of a returned resource
    pub fn resource(field: &str, resource: &Resource) -> Self {
        Self::new()
            .name(field, resource.name.clone())
            .location(resource.location.clone())
    }

    /// Replace the declared value of a name field with the confirmed one
    pub fn name(mut self, field: &str, value: impl Into<String>) -> Self {
        self.names.push((field.to_string(), value.into()));
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.push((key.to_string(), value.into()));
        self
    }

    pub fn location(self, location: Option<String>) -> Self {
        match location {
            Some(location) => self.detail("location", location),
            None => self,
        }
    }
}

/// Identity of a unit of work, known before anything is attempted
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    kind: &'static str,
    resource_group: String,
    names: Vec<(String, String)>,
}

impl UnitOfWork {
    pub fn new(kind: &'static str, resource_group: impl Into<String>) -> Self {
        Self {
            kind,
            resource_group: resource_group.into(),
            names: Vec::new(),
        }
    }

    pub fn with_name(mut self, field: &str, value: impl Into<String>) -> Self {
        self.names.push((field.to_string(), value.into()));
        self
    }

    /// Fold the unit's outcome into its record
    pub fn finish(self, outcome: Result<Confirmed>) -> ApplyResult {
        match outcome {
            Ok(confirmed) => self.succeeded(confirmed),
            Err(err) => self.failed(err.to_string()),
        }
    }

    pub fn succeeded(self, confirmed: Confirmed) -> ApplyResult {
        let mut names = self.names;
        for (field, value) in confirmed.names {
            match names.iter_mut().find(|(f, _)| *f == field) {
                Some(slot) => slot.1 = value,
                None => names.push((field, value)),
            }
        }

        let result = ApplyResult {
            kind: self.kind,
            names,
            resource_group: self.resource_group,
            status: Status::Success,
            reason: None,
            details: confirmed.details,
        };
        tracing::info!(
            kind = result.kind,
            name = %result.display_name(),
            resource_group = %result.resource_group,
            "Applied"
        );
        result
    }

    pub fn failed(self, reason: impl Into<String>) -> ApplyResult {
        let result = ApplyResult {
            kind: self.kind,
            names: self.names,
            resource_group: self.resource_group,
            status: Status::Failed,
            reason: Some(reason.into()),
            details: Vec::new(),
        };
        tracing::warn!(
            kind = result.kind,
            name = %result.display_name(),
            resource_group = %result.resource_group,
            reason = result.reason.as_deref().unwrap_or_default(),
            "Failed"
        );
        result
    }
}

/// Append-only sequence of records for one run
#[derive(Debug, Clone, Default)]
pub struct ResultCollector {
    results: Vec<ApplyResult>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: ApplyResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[ApplyResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_results(self) -> Vec<ApplyResult> {
        self.results
    }

    pub fn summary(&self) -> RunSummary {
        let succeeded = self.results.iter().filter(|r| r.is_success()).count();
        RunSummary {
            succeeded,
            failed: self.results.len() - succeeded,
        }
    }
}

/// Counts of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}
