//! Producer cache wrapper.

use crate::cache::{Cache, Ttl};
use crate::domain::{invalidate_view, AgentId, CacheKey, Domain, Filters, ProducerId};
use crate::models::Producer;

#[derive(Debug, Clone)]
pub struct ProducerCache {
    cache: Cache,
}

impl ProducerCache {
    /// Producer records rarely change
    pub const DEFAULT_TTL: Ttl = Ttl::Long;

    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn get_producers(&self, agent: &AgentId, filters: &Filters) -> Option<Vec<Producer>> {
        let key = CacheKey::ProducersByAgent(agent.clone(), filters.clone());
        self.cache.get(&key.to_string()).await
    }

    pub async fn set_producers(
        &self,
        agent: &AgentId,
        filters: &Filters,
        producers: &[Producer],
        ttl: Option<Ttl>,
    ) {
        let key = CacheKey::ProducersByAgent(agent.clone(), filters.clone());
        self.cache
            .set(&key.to_string(), producers, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    pub async fn get_producer(&self, producer: &ProducerId) -> Option<Producer> {
        self.cache
            .get(&CacheKey::ProducerDetail(producer.clone()).to_string())
            .await
    }

    pub async fn set_producer(&self, producer: &Producer, ttl: Option<Ttl>) {
        let key = CacheKey::ProducerDetail(producer.id.clone());
        self.cache
            .set(&key.to_string(), producer, Some(ttl.unwrap_or(Self::DEFAULT_TTL)))
            .await;
    }

    /// Drops one producer. Lists embedding the producer are left to expire
    /// unless `agent` is given.
    pub async fn invalidate_producer(&self, producer: &ProducerId, agent: Option<&AgentId>) -> usize {
        let mut removed =
            invalidate_view(&self.cache, &CacheKey::ProducerDetail(producer.clone())).await;
        if let Some(agent) = agent {
            removed += self.invalidate_agent_producers(agent).await;
        }
        removed
    }

    pub async fn invalidate_agent_producers(&self, agent: &AgentId) -> usize {
        invalidate_view(&self.cache, &CacheKey::ProducersByAgent(agent.clone(), Filters::new()))
            .await
    }

    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate(Domain::Producers.pattern()).await
    }
}
