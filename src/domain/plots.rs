//! Plot cache wrapper.

use tracing::debug;

use crate::cache::{Cache, Ttl};
use crate::domain::{invalidate_view, AgentId, CacheKey, Domain, Filters, PlotId};
use crate::models::Plot;

#[derive(Debug, Clone)]
pub struct PlotCache {
    cache: Cache,
}

impl PlotCache {
    pub const DEFAULT_TTL: Ttl = Ttl::Medium;

    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn get_plots(&self, agent: &AgentId, filters: &Filters) -> Option<Vec<Plot>> {
        let key = CacheKey::PlotsByAgent(agent.clone(), filters.clone());
        self.cache.get(&key.to_string()).await
    }

    pub async fn set_plots(
        &self,
        agent: &AgentId,
        filters: &Filters,
        plots: &[Plot],
        ttl: Option<Ttl>,
    ) {
        let key = CacheKey::PlotsByAgent(agent.clone(), filters.clone());
        self.cache
            .set(&key.to_string(), plots, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn get_plot(&self, plot: &PlotId) -> Option<Plot> {
        self.cache
            .get(&CacheKey::PlotDetail(plot.clone()).to_string())
            .await
    }

    pub async fn set_plot(&self, plot: &Plot, ttl: Option<Ttl>) {
        let key = CacheKey::PlotDetail(plot.id.clone());
        self.cache
            .set(&key.to_string(), plot, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    /// Drops a plot and every view derived from it: its crops, active crop,
    /// operations and observations.
    pub async fn invalidate_plot(&self, plot: &PlotId) -> usize {
        let views = [
            CacheKey::PlotDetail(plot.clone()),
            CacheKey::CropsByPlot(plot.clone(), Filters::new()),
            CacheKey::ActiveCrop(plot.clone()),
            CacheKey::OperationsByPlot(plot.clone(), Filters::new()),
            CacheKey::ObservationsByPlot(plot.clone(), Filters::new()),
        ];

        let mut removed = 0;
        for view in &views {
            removed += invalidate_view(&self.cache, view).await;
        }
        debug!(plot = %plot, removed, "invalidated plot");
        removed
    }

    /// Drops an agent's plot lists and the dashboard counting them.
    pub async fn invalidate_agent_plots(&self, agent: &AgentId) -> usize {
        invalidate_view(&self.cache, &CacheKey::PlotsByAgent(agent.clone(), Filters::new())).await
            + invalidate_view(&self.cache, &CacheKey::AgentDashboard(agent.clone())).await
    }

    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate(Domain::Plots.pattern()).await
    }
}
