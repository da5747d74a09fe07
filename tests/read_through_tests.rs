//! Integration Tests for the Read-Through Flow
//!
//! Request client, query facade and domain invalidation working over one
//! shared cache.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use agriconnect_cache::{
    cache::{Cache, CacheStore, TtlPolicy},
    client::{Request, RetryPolicy, Transport},
    domain::{AgentId, CacheKey, DomainCache, Filters, PlotId},
    models::Plot,
    ApiClient, QueryOptions, RequestError,
};
use async_trait::async_trait;
use serde_json::{json, Value};

// == Helper Functions ==

/// Serves one plot per select and counts calls.
#[derive(Default)]
struct PlotBackend {
    calls: AtomicU32,
}

#[async_trait]
impl Transport for PlotBackend {
    async fn execute(&self, request: &Request) -> Result<Value, RequestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let agent = request.filters.get("agent_id").cloned().unwrap_or_default();
        Ok(json!([{
            "id": "p1",
            "name": format!("North field v{call}"),
            "agent_id": agent,
            "area_hectares": 2.5,
            "created_at": "2026-03-01T08:00:00Z",
        }]))
    }
}

fn setup() -> (ApiClient, Arc<PlotBackend>, DomainCache) {
    let cache = Cache::new(CacheStore::new(100, TtlPolicy::default()));
    let backend = Arc::new(PlotBackend::default());
    let client = ApiClient::builder(backend.clone(), cache.clone())
        .retry_policy(RetryPolicy::none())
        .build();
    (client, backend, DomainCache::new(cache))
}

fn plots_key(agent: &AgentId) -> String {
    CacheKey::PlotsByAgent(agent.clone(), Filters::new()).to_string()
}

async fn plots_query(
    client: &ApiClient,
    agent: &AgentId,
) -> agriconnect_cache::Query<Vec<Plot>> {
    let fetch_client = client.clone();
    let agent_id = agent.clone();
    client
        .cache()
        .query(
            Some(plots_key(agent)),
            move || {
                let client = fetch_client.clone();
                let request = Request::select("plots").filter("agent_id", &agent_id);
                async move { client.select::<Vec<Plot>>(request).await }
            },
            QueryOptions::new(),
        )
        .await
}

// == Read-Through Tests ==

#[tokio::test]
async fn test_second_consumer_served_from_cache() {
    let (client, backend, domain) = setup();
    let agent = AgentId::new("a1");

    let first = plots_query(&client, &agent).await;
    let second = plots_query(&client, &agent).await;

    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.state().data, second.state().data);

    let cached = domain.plots.get_plots(&agent, &Filters::new()).await.unwrap();
    assert_eq!(cached[0].name, "North field v1");
    assert_eq!(cached[0].agent_id, agent);
}

#[tokio::test]
async fn test_agent_invalidation_forces_refetch() {
    let (client, backend, domain) = setup();
    let agent = AgentId::new("a1");

    let query = plots_query(&client, &agent).await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    assert_eq!(domain.plots.invalidate_agent_plots(&agent).await, 1);
    drop(query);

    let query = plots_query(&client, &agent).await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    let plots = query.state().data.unwrap();
    assert_eq!(plots[0].name, "North field v2");
}

#[tokio::test]
async fn test_other_agents_survive_invalidation() {
    let (client, backend, domain) = setup();
    let a1 = AgentId::new("a1");
    let a10 = AgentId::new("a10");

    let _q1 = plots_query(&client, &a1).await;
    let _q10 = plots_query(&client, &a10).await;
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);

    domain.plots.invalidate_agent_plots(&a1).await;

    assert!(domain.plots.get_plots(&a1, &Filters::new()).await.is_none());
    assert!(domain.plots.get_plots(&a10, &Filters::new()).await.is_some());
}

#[tokio::test]
async fn test_plot_mutation_drops_derived_views() {
    let (client, _, domain) = setup();
    let agent = AgentId::new("a1");
    let plot_id = PlotId::new("p1");

    let query = plots_query(&client, &agent).await;
    let plot = query.state().data.unwrap().remove(0);
    domain.plots.set_plot(&plot, None).await;
    domain.crops.set_crops(&plot_id, &Filters::new(), &[], None).await;
    domain
        .crops
        .set_crops(&plot_id, &Filters::new().with("status", "growing"), &[], None)
        .await;

    let removed = domain.plots.invalidate_plot(&plot_id).await;

    assert_eq!(removed, 3);
    assert!(domain.plots.get_plot(&plot_id).await.is_none());
    assert!(domain.crops.get_crops(&plot_id, &Filters::new()).await.is_none());
    // The agent's list is a separate scope
    assert!(domain.plots.get_plots(&agent, &Filters::new()).await.is_some());
}

#[tokio::test]
async fn test_failed_refetch_keeps_data_and_reports_error() {
    let (client, _, _) = setup();
    let agent = AgentId::new("a1");
    let query = plots_query(&client, &agent).await;

    client.add_interceptor(Arc::new(RejectAll));
    query.refetch().await;

    let state = query.state();
    assert!(state.data.is_some());
    assert!(matches!(state.error, Some(RequestError::Rejected(_))));
    assert!(!state.loading);
}

struct RejectAll;

impl agriconnect_cache::client::Interceptor for RejectAll {
    fn on_request(&self, _request: Request) -> Result<Request, RequestError> {
        Err(RequestError::Rejected("offline".into()))
    }
}
