//! End-to-end aggregation over three mocked catalogs.

use std::path::PathBuf;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewise_catalog::{Aggregator, ApiStatus, SourceOutcome};
use pricewise_core::{default_store_roster, AppConfig, Environment};

fn config_for(fakestore: &str, dummyjson: &str, platzi: &str) -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "debug".to_string(),
        data_dir: PathBuf::from("./.pricewise-test"),
        stores_path: None,
        fakestore_url: fakestore.to_string(),
        dummyjson_url: dummyjson.to_string(),
        platzi_url: platzi.to_string(),
        fetch_timeout_secs: 5,
        user_agent: "pricewise-test/0.1".to_string(),
        fetch_max_retries: 0,
        fetch_backoff_base_ms: 0,
        autosave_interval_secs: 30,
    }
}

async fn mount_fakestore(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "Wireless Mouse", "price": 25.0, "category": "electronics",
             "description": "", "image": "", "rating": {"rate": 4.1, "count": 10}},
            {"id": 2, "title": "Mechanical Keyboard", "price": 80.0, "category": "electronics",
             "description": "", "image": "", "rating": {"rate": 4.5, "count": 30}},
            {"id": 3, "title": "USB-C Hub", "price": 40.0, "category": "electronics",
             "description": "", "image": "", "rating": {"rate": 3.9, "count": 12}}
        ])))
        .mount(server)
        .await;
}

async fn mount_dummyjson(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                {"id": 11, "title": "wireless mouse", "price": 22.0, "category": "electronics", "rating": 4.0},
                {"id": 12, "title": "Gaming Headset", "price": 60.0, "category": "electronics", "rating": 4.4}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn search_merges_live_sources_in_registration_order() {
    let fakestore = MockServer::start().await;
    let dummyjson = MockServer::start().await;
    let platzi = MockServer::start().await;
    mount_fakestore(&fakestore).await;
    mount_dummyjson(&dummyjson).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/products"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&platzi)
        .await;

    let config = config_for(&fakestore.uri(), &dummyjson.uri(), &platzi.uri());
    let aggregator = Aggregator::from_config(&config, default_store_roster()).unwrap();

    let results = aggregator.search("", 9).await;

    let ids: Vec<&str> = results.products.iter().map(|p| p.product.id.as_str()).collect();
    // "wireless mouse" from DummyJSON duplicates FakeStore's first product.
    assert_eq!(ids, ["fs_1", "fs_2", "fs_3", "dj_12"]);
    assert_eq!(results.status, ApiStatus::Limited);
    assert_eq!(results.sources.len(), 3);
    assert_eq!(results.sources[0].source, "FakeStore API");
    assert!(matches!(
        results.sources[2].outcome,
        SourceOutcome::Failed { .. }
    ));
}

#[tokio::test]
async fn search_with_every_source_down_is_offline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let uri = server.uri();
    let config = config_for(&uri, &uri, &uri);
    let aggregator = Aggregator::from_config(&config, default_store_roster()).unwrap();

    let results = aggregator.search("headphones", 10).await;
    assert_eq!(results.status, ApiStatus::Offline);
    assert!(!results.products.is_empty());
    assert!(results
        .products
        .iter()
        .all(|p| p.product.source == "Fallback Data"));
}

#[tokio::test]
async fn product_details_routes_to_owning_source() {
    let fakestore = MockServer::start().await;
    let dummyjson = MockServer::start().await;
    let platzi = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"id": 12, "title": "Gaming Headset", "price": 60.0, "category": "electronics", "rating": 4.4}
        )))
        .mount(&dummyjson)
        .await;

    let config = config_for(&fakestore.uri(), &dummyjson.uri(), &platzi.uri());
    let aggregator = Aggregator::from_config(&config, default_store_roster()).unwrap();

    let details = aggregator.product_details("dj_12").await.unwrap();
    assert_eq!(details.product.title, "Gaming Headset");
    assert!((3..=5).contains(&details.store_offers.len()));

    assert!(aggregator.product_details("fs_12").await.is_none());
    assert!(aggregator.product_details("ebay_12").await.is_none());
}
