//! Network security group rules

use super::{Named, RequestBody};
use crate::error::{CloudError, Result};
use crate::model::{Priority, SecurityRuleSpec};
use serde::Serialize;

/// Token matching any address or port
pub const WILDCARD: &str = "*";

/// Split a declared address/port list into its singular or plural form
///
/// `["*"]` becomes the singular wildcard; any other non-empty list is kept
/// verbatim in the plural field, even when it has one element.
pub fn collapse_wildcard(
    field: &str,
    values: &[String],
) -> Result<(Option<String>, Option<Vec<String>>)> {
    match values {
        [] => Err(CloudError::InvalidConfig(format!(
            "`{}` must list at least one value",
            field
        ))),
        [only] if only == WILDCARD => Ok((Some(WILDCARD.to_string()), None)),
        _ => Ok((None, Some(values.to_vec()))),
    }
}

pub fn coerce_priority(priority: &Priority) -> Result<u32> {
    let value = match priority {
        Priority::Number(n) => *n,
        Priority::Float(f) if f.fract() == 0.0 && f.abs() <= u32::MAX as f64 => *f as i64,
        Priority::Float(f) => {
            return Err(CloudError::InvalidConfig(format!(
                "priority {} is not an integer",
                f
            )));
        }
        Priority::Text(s) => s.trim().parse::<i64>().map_err(|_| {
            CloudError::InvalidConfig(format!("priority `{}` is not an integer", s))
        })?,
    };
    u32::try_from(value)
        .map_err(|_| CloudError::InvalidConfig(format!("priority {} is out of range", value)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRuleProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub direction: String,
    pub priority: u32,
    pub protocol: String,
    pub access: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address_prefixes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port_ranges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address_prefixes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port_ranges: Option<Vec<String>>,
}

pub type SecurityRule = Named<SecurityRuleProperties>;

pub fn normalize_rule(spec: &SecurityRuleSpec) -> Result<SecurityRule> {
    let context = |field: &str| format!("{} (rule {})", field, spec.name);

    let (source_address_prefix, source_address_prefixes) = collapse_wildcard(
        &context("source_address_prefixes"),
        &spec.source_address_prefixes,
    )?;
    let (source_port_range, source_port_ranges) =
        collapse_wildcard(&context("source_port_ranges"), &spec.source_port_ranges)?;
    let (destination_address_prefix, destination_address_prefixes) = collapse_wildcard(
        &context("destination_address_prefixes"),
        &spec.destination_address_prefixes,
    )?;
    let (destination_port_range, destination_port_ranges) = collapse_wildcard(
        &context("destination_port_ranges"),
        &spec.destination_port_ranges,
    )?;

    Ok(Named::new(
        spec.name.clone(),
        SecurityRuleProperties {
            description: spec.description.clone(),
            direction: spec.direction.clone(),
            priority: coerce_priority(&spec.priority)?,
            protocol: spec.protocol.clone(),
            access: spec.action.clone(),
            source_address_prefix,
            source_address_prefixes,
            source_port_range,
            source_port_ranges,
            destination_address_prefix,
            destination_address_prefixes,
            destination_port_range,
            destination_port_ranges,
        },
    ))
}

/// Normalize rules in declaration order
///
/// Priority uniqueness is left to the control plane.
pub fn normalize_rules(specs: &[SecurityRuleSpec]) -> Result<Vec<SecurityRule>> {
    specs.iter().map(normalize_rule).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupProperties {
    pub security_rules: Vec<SecurityRule>,
}

pub fn build_security_group(
    location: &str,
    rules: &[SecurityRuleSpec],
) -> Result<RequestBody<SecurityGroupProperties>> {
    Ok(RequestBody::located(
        location,
        SecurityGroupProperties {
            security_rules: normalize_rules(rules)?,
        },
    ))
}
