//! VNetFlow Cloud Network Engine
//!
//! This crate turns a declarative network description into idempotent
//! create-or-update calls against a cloud control plane, and reports one
//! outcome per unit of work.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  VNetFlow CLI                    │
//! │            (vnetflow --input-file)               │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                vnetflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │              Apply Engine                 │   │
//! │  │  resolve → exists → build → apply → record│   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐ ┌────────────┐ ┌──────────────┐   │
//! │  │ Registry │ │ Normalizers│ │   Topology   │   │
//! │  └──────────┘ └────────────┘ └──────────────┘   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │     trait ControlPlane { ... }            │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │  Azure (ARM)  │
//!           │ control plane │
//!           └───────────────┘
//! ```

pub mod control_plane;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod report;
pub mod resource_id;
pub mod result;
pub mod topology;

// Re-exports
pub use control_plane::{ControlPlane, Resource};
pub use engine::{ApplyEngine, Stage};
pub use error::{CloudError, Result};
pub use model::{Declared, NetworkConfig};
pub use registry::{ResourceGroupRef, SubscriptionRegistry};
pub use report::{OUTPUT_FILE, ReportWriter};
pub use resource_id::{ResourceId, ResourceScope};
pub use result::{ApplyResult, Confirmed, ResultCollector, RunSummary, Status, UnitOfWork};
pub use topology::{LoadBalancerPlan, LoadBalancerVariant};
