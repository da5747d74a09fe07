//! Domain Cache Module
//!
//! Per-entity wrappers over the shared `Cache`. They own the key naming
//! convention and the invalidation fan-out: dropping a broad scope also
//! drops every narrower view derived from it.

mod alerts;
mod crops;
mod dashboard;
mod field;
mod ids;
mod keys;
mod plots;
mod producers;
mod visits;

pub use alerts::AlertCache;
pub use crops::CropCache;
pub use dashboard::DashboardCache;
pub use field::{ObservationCache, OperationCache};
pub use ids::{AgentId, AlertId, CropId, ObservationId, OperationId, PlotId, ProducerId, VisitId};
pub use keys::{CacheKey, Domain, Filters};
pub use plots::PlotCache;
pub use producers::ProducerCache;
pub use visits::VisitCache;

use tracing::info;

use crate::cache::Cache;

/// Removes a view and all of its filtered variants.
pub(crate) async fn invalidate_view(cache: &Cache, key: &CacheKey) -> usize {
    let base = usize::from(cache.delete(&key.base()).await);
    base + cache.invalidate(key.variants()).await
}

// == Domain Cache ==
/// Every wrapper over one shared cache.
#[derive(Debug, Clone)]
pub struct DomainCache {
    pub plots: PlotCache,
    pub crops: CropCache,
    pub operations: OperationCache,
    pub observations: ObservationCache,
    pub visits: VisitCache,
    pub alerts: AlertCache,
    pub producers: ProducerCache,
    pub dashboard: DashboardCache,
    cache: Cache,
}

impl DomainCache {
    pub fn new(cache: Cache) -> Self {
        Self {
            plots: PlotCache::new(cache.clone()),
            crops: CropCache::new(cache.clone()),
            operations: OperationCache::new(cache.clone()),
            observations: ObservationCache::new(cache.clone()),
            visits: VisitCache::new(cache.clone()),
            alerts: AlertCache::new(cache.clone()),
            producers: ProducerCache::new(cache.clone()),
            dashboard: DashboardCache::new(cache.clone()),
            cache,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Drops everything scoped to one agent's lists. Per-entity detail
    /// entries are left to expire.
    pub async fn invalidate_agent(&self, agent: &AgentId) -> usize {
        self.plots.invalidate_agent_plots(agent).await
            + self.visits.invalidate_agent_visits(agent).await
            + self.alerts.invalidate_agent_alerts(agent).await
            + self.producers.invalidate_agent_producers(agent).await
    }

    /// Full flush of every domain (logout, forced resync). Keys outside the
    /// domain namespaces survive.
    pub async fn invalidate_all(&self) -> usize {
        let mut removed = 0;
        for domain in Domain::ALL {
            removed += self.cache.invalidate(domain.pattern()).await;
        }
        info!("Flushed {} domain cache entries", removed);
        removed
    }
}
