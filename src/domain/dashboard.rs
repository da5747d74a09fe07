//! Agent dashboard cache wrapper.

use crate::cache::{Cache, Ttl};
use crate::domain::{invalidate_view, AgentId, CacheKey, Domain};
use crate::models::DashboardStats;

#[derive(Debug, Clone)]
pub struct DashboardCache {
    cache: Cache,
}

impl DashboardCache {
    pub const DEFAULT_TTL: Ttl = Ttl::Short;

    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn get_stats(&self, agent: &AgentId) -> Option<DashboardStats> {
        self.cache
            .get(&CacheKey::AgentDashboard(agent.clone()).to_string())
            .await
    }

    pub async fn set_stats(&self, agent: &AgentId, stats: &DashboardStats, ttl: Option<Ttl>) {
        let key = CacheKey::AgentDashboard(agent.clone());
        self.cache
            .set(&key.to_string(), stats, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn invalidate_agent(&self, agent: &AgentId) -> usize {
        invalidate_view(&self.cache, &CacheKey::AgentDashboard(agent.clone())).await
    }

    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate(Domain::Dashboard.pattern()).await
    }
}
