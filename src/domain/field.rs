//! Operation and observation cache wrappers. Both are per-plot journals.

use crate::cache::{Cache, Ttl};
use crate::domain::{invalidate_view, CacheKey, Domain, Filters, PlotId};
use crate::models::{Observation, Operation};

#[derive(Debug, Clone)]
pub struct OperationCache {
    cache: Cache,
}

impl OperationCache {
    pub const DEFAULT_TTL: Ttl = Ttl::Medium;

    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn get_operations(&self, plot: &PlotId, filters: &Filters) -> Option<Vec<Operation>> {
        let key = CacheKey::OperationsByPlot(plot.clone(), filters.clone());
        self.cache.get(&key.to_string()).await
    }

    pub async fn set_operations(
        &self,
        plot: &PlotId,
        filters: &Filters,
        operations: &[Operation],
        ttl: Option<Ttl>,
    ) {
        let key = CacheKey::OperationsByPlot(plot.clone(), filters.clone());
        self.cache
            .set(&key.to_string(), operations, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn invalidate_plot_operations(&self, plot: &PlotId) -> usize {
        invalidate_view(&self.cache, &CacheKey::OperationsByPlot(plot.clone(), Filters::new()))
            .await
    }

    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate(Domain::Operations.pattern()).await
    }
}

#[derive(Debug, Clone)]
pub struct ObservationCache {
    cache: Cache,
}

impl ObservationCache {
    pub const DEFAULT_TTL: Ttl = Ttl::Medium;

    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn get_observations(
        &self,
        plot: &PlotId,
        filters: &Filters,
    ) -> Option<Vec<Observation>> {
        let key = CacheKey::ObservationsByPlot(plot.clone(), filters.clone());
        self.cache.get(&key.to_string()).await
    }

    pub async fn set_observations(
        &self,
        plot: &PlotId,
        filters: &Filters,
        observations: &[Observation],
        ttl: Option<Ttl>,
    ) {
        let key = CacheKey::ObservationsByPlot(plot.clone(), filters.clone());
        self.cache
            .set(&key.to_string(), observations, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn invalidate_plot_observations(&self, plot: &PlotId) -> usize {
        invalidate_view(&self.cache, &CacheKey::ObservationsByPlot(plot.clone(), Filters::new()))
            .await
    }

    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate(Domain::Observations.pattern()).await
    }
}
