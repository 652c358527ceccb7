//! Per-tenant feature switches
//!
//! A flag's value is the stored override when there is one, otherwise the
//! default for the tenant's plan.

use slotwise_common::models::{FeatureFlag, Tenant};
use slotwise_common::SlotwiseError;
use slotwise_db::Datastore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct FeatureFlagService {
    store: Arc<dyn Datastore>,
}

impl std::fmt::Debug for FeatureFlagService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FeatureFlagService")
    }
}

impl FeatureFlagService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Resolves `flag` for `tenant`. A store failure falls back to the plan default.
    pub async fn is_enabled(&self, tenant: &Tenant, flag: FeatureFlag) -> bool {
        match self.store.feature_overrides(tenant.id).await {
            Ok(overrides) => overrides
                .get(&flag)
                .copied()
                .unwrap_or_else(|| flag.default_for(tenant.plan)),
            Err(e) => {
                warn!(
                    tenant_id = %tenant.id,
                    flag = flag.as_str(),
                    "Feature flag lookup failed, using plan default: {}",
                    e
                );
                flag.default_for(tenant.plan)
            }
        }
    }

    /// Every flag resolved for `tenant`.
    pub async fn flags_for(&self, tenant: &Tenant) -> Result<BTreeMap<FeatureFlag, bool>, SlotwiseError> {
        let overrides = self.store.feature_overrides(tenant.id).await?;
        Ok(FeatureFlag::ALL
            .into_iter()
            .map(|flag| {
                let value = overrides
                    .get(&flag)
                    .copied()
                    .unwrap_or_else(|| flag.default_for(tenant.plan));
                (flag, value)
            })
            .collect())
    }

    pub async fn set_override(
        &self,
        tenant_id: Uuid,
        flag: FeatureFlag,
        enabled: bool,
    ) -> Result<(), SlotwiseError> {
        self.store.set_feature_override(tenant_id, flag, enabled).await?;
        info!(%tenant_id, flag = flag.as_str(), enabled, "Feature flag override stored");
        Ok(())
    }
}
