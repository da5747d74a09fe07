//! Visit cache wrapper.

use crate::cache::{Cache, Ttl};
use crate::domain::{invalidate_view, AgentId, CacheKey, Domain, Filters, VisitId};
use crate::models::Visit;

#[derive(Debug, Clone)]
pub struct VisitCache {
    cache: Cache,
}

impl VisitCache {
    /// Schedules change during the day
    pub const DEFAULT_TTL: Ttl = Ttl::Short;

    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn get_visits(&self, agent: &AgentId, filters: &Filters) -> Option<Vec<Visit>> {
        let key = CacheKey::VisitsByAgent(agent.clone(), filters.clone());
        self.cache.get(&key.to_string()).await
    }

    pub async fn set_visits(
        &self,
        agent: &AgentId,
        filters: &Filters,
        visits: &[Visit],
        ttl: Option<Ttl>,
    ) {
        let key = CacheKey::VisitsByAgent(agent.clone(), filters.clone());
        self.cache
            .set(&key.to_string(), visits, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn get_upcoming(&self, agent: &AgentId) -> Option<Vec<Visit>> {
        self.cache
            .get(&CacheKey::UpcomingVisits(agent.clone()).to_string())
            .await
    }

    pub async fn set_upcoming(&self, agent: &AgentId, visits: &[Visit], ttl: Option<Ttl>) {
        let key = CacheKey::UpcomingVisits(agent.clone());
        self.cache
            .set(&key.to_string(), visits, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn get_visit(&self, visit: &VisitId) -> Option<Visit> {
        self.cache
            .get(&CacheKey::VisitDetail(visit.clone()).to_string())
            .await
    }

    pub async fn set_visit(&self, visit: &Visit, ttl: Option<Ttl>) {
        let key = CacheKey::VisitDetail(visit.id.clone());
        self.cache
            .set(&key.to_string(), visit, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    /// Drops one visit along with its agent's visit lists.
    pub async fn invalidate_visit(&self, visit: &VisitId, agent: &AgentId) -> usize {
        invalidate_view(&self.cache, &CacheKey::VisitDetail(visit.clone())).await
            + self.invalidate_agent_visits(agent).await
    }

    /// Drops an agent's visit lists, upcoming shortcut and dashboard.
    pub async fn invalidate_agent_visits(&self, agent: &AgentId) -> usize {
        let views = [
            CacheKey::VisitsByAgent(agent.clone(), Filters::new()),
            CacheKey::UpcomingVisits(agent.clone()),
            CacheKey::AgentDashboard(agent.clone()),
        ];
        let mut removed = 0;
        for view in &views {
            removed += invalidate_view(&self.cache, view).await;
        }
        removed
    }

    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate(Domain::Visits.pattern()).await
    }
}
