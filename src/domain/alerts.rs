//! Alert cache wrapper.

use crate::cache::{Cache, Ttl};
use crate::domain::{invalidate_view, AgentId, CacheKey, Domain, Filters};
use crate::models::Alert;

#[derive(Debug, Clone)]
pub struct AlertCache {
    cache: Cache,
}

impl AlertCache {
    pub const DEFAULT_TTL: Ttl = Ttl::Short;

    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn get_alerts(&self, agent: &AgentId, filters: &Filters) -> Option<Vec<Alert>> {
        let key = CacheKey::AlertsByAgent(agent.clone(), filters.clone());
        self.cache.get(&key.to_string()).await
    }

    pub async fn set_alerts(
        &self,
        agent: &AgentId,
        filters: &Filters,
        alerts: &[Alert],
        ttl: Option<Ttl>,
    ) {
        let key = CacheKey::AlertsByAgent(agent.clone(), filters.clone());
        self.cache
            .set(&key.to_string(), alerts, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn get_unread_count(&self, agent: &AgentId) -> Option<u32> {
        self.cache
            .get(&CacheKey::UnreadAlerts(agent.clone()).to_string())
            .await
    }

    pub async fn set_unread_count(&self, agent: &AgentId, count: u32, ttl: Option<Ttl>) {
        let key = CacheKey::UnreadAlerts(agent.clone());
        self.cache
            .set(&key.to_string(), &count, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    /// Drops an agent's alert lists, unread counter and dashboard. Used
    /// after marking alerts read.
    pub async fn invalidate_agent_alerts(&self, agent: &AgentId) -> usize {
        let views = [
            CacheKey::AlertsByAgent(agent.clone(), Filters::new()),
            CacheKey::UnreadAlerts(agent.clone()),
            CacheKey::AgentDashboard(agent.clone()),
        ];
        let mut removed = 0;
        for view in &views {
            removed += invalidate_view(&self.cache, view).await;
        }
        removed
    }

    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate(Domain::Alerts.pattern()).await
    }
}
