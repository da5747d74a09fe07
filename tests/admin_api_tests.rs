//! Integration Tests for the Admin API
//!
//! Full request/response cycle for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use agriconnect_cache::{
    api::create_router,
    cache::{Cache, CacheStore, ManualClock, Ttl, TtlPolicy},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn test_cache() -> (Cache, ManualClock) {
    let clock = ManualClock::new(1_700_000_000_000);
    let store = CacheStore::with_clock(100, TtlPolicy::default(), Arc::new(clock.clone()));
    (Cache::new(store), clock)
}

fn create_test_app(cache: &Cache) -> Router {
    create_router(AppState::new(cache.clone()))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn invalidate(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/invalidate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// == Entry Endpoint Tests ==

#[tokio::test]
async fn test_get_entry_success() {
    let (cache, _) = test_cache();
    cache
        .set("plots:detail:p1", &json!({"name": "North field"}), Some(Ttl::Long))
        .await;

    let response = create_test_app(&cache)
        .oneshot(get("/entries/plots:detail:p1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "plots:detail:p1");
    assert_eq!(json["value"]["name"], "North field");
    assert_eq!(json["ttl_ms"], 900_000);
    assert!(json["expires_at"].is_string());
}

#[tokio::test]
async fn test_get_entry_not_found() {
    let (cache, _) = test_cache();

    let response = create_test_app(&cache)
        .oneshot(get("/entries/plots:detail:missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("plots:detail:missing"));
}

#[tokio::test]
async fn test_expired_entry_via_api() {
    let (cache, clock) = test_cache();
    cache.set("alerts:unread:a1", &5, Some(Ttl::Millis(1_000))).await;
    let app = create_test_app(&cache);

    let response = app.clone().oneshot(get("/entries/alerts:unread:a1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    clock.advance(Duration::from_millis(1_001));

    let response = app.oneshot(get("/entries/alerts:unread:a1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_and_delete_entries() {
    let (cache, _) = test_cache();
    cache.set("crops:plot:p1", &json!([]), None).await;
    cache.set("plots:agent:a1", &json!([]), None).await;
    let app = create_test_app(&cache);

    let response = app.clone().oneshot(get("/entries")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["keys"], json!(["crops:plot:p1", "plots:agent:a1"]));

    let response = app.clone().oneshot(delete("/entries/crops:plot:p1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["deleted"], true);

    let response = app.oneshot(delete("/entries/crops:plot:p1")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["deleted"], false);
}

#[tokio::test]
async fn test_clear_endpoint() {
    let (cache, _) = test_cache();
    for i in 0..5 {
        cache.set(&format!("visits:detail:v{i}"), &i, None).await;
    }

    let response = create_test_app(&cache).oneshot(delete("/entries")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(cache.keys().await.is_empty());
}

// == Invalidate Endpoint Tests ==

#[tokio::test]
async fn test_invalidate_prefix_pattern() {
    let (cache, _) = test_cache();
    for key in ["plots:agent:1", "plots:agent:2", "crops:plot:9"] {
        cache.set(key, &key, None).await;
    }

    let response = create_test_app(&cache)
        .oneshot(invalidate(r#"{"pattern":"plots:*"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);
    assert_eq!(json["pattern"], "plots:*");
    assert_eq!(cache.get::<String>("crops:plot:9").await.as_deref(), Some("crops:plot:9"));
}

#[tokio::test]
async fn test_invalidate_substring_pattern() {
    let (cache, _) = test_cache();
    for key in ["crops:plot:p9", "operations:plot:p9", "crops:plot:p1"] {
        cache.set(key, &key, None).await;
    }

    let response = create_test_app(&cache)
        .oneshot(invalidate(r#"{"pattern":":p9"}"#))
        .await
        .unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);
    assert_eq!(cache.keys().await, vec!["crops:plot:p1".to_string()]);
}

#[tokio::test]
async fn test_invalidate_rejects_wildcard() {
    let (cache, _) = test_cache();

    let response = create_test_app(&cache)
        .oneshot(invalidate(r#"{"pattern":"*"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_json_request() {
    let (cache, _) = test_cache();

    let response = create_test_app(&cache)
        .oneshot(invalidate("not json"))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// == Stats and Health Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let (cache, _) = test_cache();
    cache.set("k", &1, None).await;
    cache.get::<i32>("k").await;
    cache.get::<i32>("missing").await;

    let response = create_test_app(&cache).oneshot(get("/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["total_entries"], 1);
    assert_eq!(json["hit_rate"], 0.5);
    assert_eq!(json["in_flight"], 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (cache, _) = test_cache();

    let response = create_test_app(&cache).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], false);
}
