//! Load balancers and their backend interfaces

use super::ApplyEngine;
use crate::error::Result;
use crate::model::{Declared, LoadBalancerSpec, NetworkConfig};
use crate::resource_id::{ResourceId, ResourceScope, types};
use crate::result::{Confirmed, ResultCollector, UnitOfWork};
use crate::topology::{self, LoadBalancerPlan};

impl ApplyEngine {
    pub(super) async fn apply_load_balancers(&self, config: &NetworkConfig, out: &mut ResultCollector) {
        for entry in &config.load_balancers {
            let unit = UnitOfWork::new("load balancer", entry.text("resource_group"))
                .with_name("load_balancer_name", entry.text("name"));
            out.record(unit.finish(self.apply_load_balancer(entry).await));
        }
    }

    async fn apply_load_balancer(&self, entry: &Declared<LoadBalancerSpec>) -> Result<Confirmed> {
        let spec = entry.parsed()?;
        let subscription_id = self.ensure_group(&spec.resource_group).await?;
        let plan = topology::build(spec, &self.registry)?;
        tracing::info!(load_balancer = %spec.name, variant = %plan.variant, "Applying load balancer");

        let confirmed = self
            .plane
            .create_or_update(&plan.id, plan.body.to_json()?)
            .await?;

        if plan.variant.reapplies_pools() {
            for pool in &plan.pools {
                self.plane.create_or_update(&pool.id, pool.to_json()?).await?;
                tracing::debug!(pool = %pool.name(), "Re-applied backend pool");
            }
        }

        if plan.variant.needs_nic_reconciliation() {
            let attached = self
                .reconcile_interfaces(subscription_id, &spec.resource_group, &plan)
                .await?;
            tracing::info!(load_balancer = %spec.name, attached, "Backend interfaces reconciled");
        }

        Ok(Confirmed::resource("load_balancer_name", &confirmed))
    }

    /// Attach every interface whose private IP is a pool member
    async fn reconcile_interfaces(
        &self,
        subscription_id: &str,
        resource_group: &str,
        plan: &LoadBalancerPlan,
    ) -> Result<usize> {
        let scope = ResourceScope::network(subscription_id, resource_group, types::NETWORK_INTERFACES);
        let interfaces = self.plane.list(&scope).await?;
        tracing::debug!(scanned = interfaces.len(), "Listed network interfaces");
        let updates = topology::reconcile_interfaces(&interfaces, &plan.pools);

        for update in &updates {
            let id = ResourceId::network(
                subscription_id,
                resource_group,
                types::NETWORK_INTERFACES,
                &update.name,
            );
            self.plane.create_or_update(&id, update.body.clone()).await?;
            tracing::info!(nic = %update.name, "Attached network interface to backend pool");
        }

        Ok(updates.len())
    }
}
