#![cfg(test)]

//! Exercises the Climatiq client against a local HTTP mock of the factor
//! database's search and estimate endpoints.

use std::sync::Arc;

use footprint_bot::base::{
    config::{Config, ConfigInner},
    types::{NormalizedItem, ShoppingItem},
    units::Unit,
};
use footprint_bot::service::emissions::EmissionsClient;
use httpmock::prelude::*;
use serde_json::json;

fn config_for(server: &MockServer) -> Config {
    Config {
        inner: Arc::new(ConfigInner {
            climatiq_api_key: "test-key".to_string(),
            climatiq_endpoint: server.base_url(),
            climatiq_data_version: "^3".to_string(),
            ..Default::default()
        }),
    }
}

fn item(name: &str, quantity: f64, unit: Unit) -> NormalizedItem {
    NormalizedItem::passthrough(ShoppingItem {
        name: name.to_string(),
        quantity,
        unit,
    })
}

fn beef_search_body() -> serde_json::Value {
    json!({
        "results": [
            { "activity_id": "consumer_goods-type_meat_products_beef", "name": "Beef", "unit_type": "Weight", "unit": "kg/kg", "source": "Example" },
            { "activity_id": "money-beef", "unit_type": "Money", "unit": "usd" }
        ]
    })
}

#[tokio::test]
async fn estimate_converts_pounds_and_calls_the_estimate_endpoint() {
    let server = MockServer::start();

    let search = server.mock(|when, then| {
        when.method(GET)
            .path("/data/v1/search")
            .query_param("query", "beef")
            .query_param("data_version", "^3")
            .header("authorization", "Bearer test-key");
        then.status(200).json_body(beef_search_body());
    });

    let estimate = server.mock(|when, then| {
        when.method(POST)
            .path("/data/v1/estimate")
            .header("authorization", "Bearer test-key")
            .json_body_partial(
                r#"{
                    "emission_factor": { "activity_id": "consumer_goods-type_meat_products_beef", "data_version": "^3" },
                    "parameters": { "weight_unit": "kg" }
                }"#,
            );
        then.status(200).json_body(json!({ "co2e": 24.5, "co2e_unit": "kg" }));
    });

    let client = EmissionsClient::climatiq(&config_for(&server));

    // "ground beef" resolves to the "beef" search keyword.
    let result = client.estimate(&item("ground beef", 2.0, Unit::Lb)).await.expect("estimate failed");

    let result = result.expect("expected an estimate");
    assert_eq!(result.kg_co2e, 24.5);
    assert_eq!(result.factor.activity_id, "consumer_goods-type_meat_products_beef");

    search.assert();
    estimate.assert();
}

#[tokio::test]
async fn repeated_estimates_reuse_the_cached_search() {
    let server = MockServer::start();

    let search = server.mock(|when, then| {
        when.method(GET).path("/data/v1/search").query_param("query", "beef");
        then.status(200).json_body(beef_search_body());
    });

    let estimate = server.mock(|when, then| {
        when.method(POST).path("/data/v1/estimate");
        then.status(200).json_body(json!({ "co2e": 24.5 }));
    });

    let client = EmissionsClient::climatiq(&config_for(&server));
    let beef = item("ground beef", 2.0, Unit::Lb);

    client.estimate(&beef).await.expect("estimate failed").expect("expected an estimate");
    client.estimate(&beef).await.expect("estimate failed").expect("expected an estimate");

    search.assert_hits(1);
    estimate.assert_hits(2);
}

#[tokio::test]
async fn unusable_factors_produce_no_estimate() {
    let server = MockServer::start();

    let search = server.mock(|when, then| {
        when.method(GET).path("/data/v1/search").query_param("query", "gift card");
        then.status(200).json_body(json!({
            "results": [
                { "activity_id": "money-only", "unit_type": "Money", "unit": "usd" }
            ]
        }));
    });

    let client = EmissionsClient::climatiq(&config_for(&server));

    let result = client.estimate(&item("gift card", 1.0, Unit::Each)).await.expect("estimate failed");

    assert!(result.is_none());
    search.assert_hits(1);
}

#[tokio::test]
async fn unbridgeable_units_skip_the_item() {
    let server = MockServer::start();

    // A per-kg factor, but "staples" by count has no mass bridge.
    server.mock(|when, then| {
        when.method(GET).path("/data/v1/search").query_param("query", "staples");
        then.status(200).json_body(json!({
            "results": [
                { "activity_id": "office-staples", "unit_type": "Weight", "unit": "kg" }
            ]
        }));
    });

    let estimate = server.mock(|when, then| {
        when.method(POST).path("/data/v1/estimate");
        then.status(200).json_body(json!({ "co2e": 1.0 }));
    });

    let client = EmissionsClient::climatiq(&config_for(&server));

    let result = client.estimate(&item("staples", 1.0, Unit::Each)).await.expect("estimate failed");

    assert!(result.is_none());
    estimate.assert_hits(0);
}

#[tokio::test]
async fn short_queries_never_hit_the_network() {
    let server = MockServer::start();

    let search = server.mock(|when, then| {
        when.method(GET).path("/data/v1/search");
        then.status(200).json_body(json!({ "results": [] }));
    });

    let client = EmissionsClient::climatiq(&config_for(&server));

    let result = client.search_factor("s", None).await.expect("search failed");

    assert!(result.is_none());
    search.assert_hits(0);
}

#[tokio::test]
async fn estimate_error_status_is_surfaced() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/data/v1/search").query_param("query", "beef");
        then.status(200).json_body(beef_search_body());
    });

    server.mock(|when, then| {
        when.method(POST).path("/data/v1/estimate");
        then.status(400).json_body(json!({ "error": "bad_request", "message": "unknown parameters" }));
    });

    let client = EmissionsClient::climatiq(&config_for(&server));

    let result = client.estimate(&item("ground beef", 2.0, Unit::Lb)).await;

    let err = result.expect_err("expected the estimate error to propagate");
    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn regioned_config_still_finds_factors() {
    let server = MockServer::start();

    // The regioned pass may come back empty; the client retries without the
    // region filter before giving up.
    let regioned = server.mock(|when, then| {
        when.method(GET).path("/data/v1/search").query_param("query", "beef").query_param("region", "US");
        then.status(200).json_body(json!({ "results": [] }));
    });

    let unregioned = server.mock(|when, then| {
        when.method(GET).path("/data/v1/search").query_param("query", "beef");
        then.status(200).json_body(beef_search_body());
    });

    let config = Config {
        inner: Arc::new(ConfigInner {
            climatiq_api_key: "test-key".to_string(),
            climatiq_endpoint: server.base_url(),
            climatiq_data_version: "^3".to_string(),
            climatiq_region: Some("US".to_string()),
            ..Default::default()
        }),
    };

    let client = EmissionsClient::climatiq(&config);

    let factor = client.search_factor("beef", None).await.expect("search failed").expect("expected a factor");

    assert_eq!(factor.activity_id, "consumer_goods-type_meat_products_beef");
    regioned.assert_hits(1);
    unregioned.assert_hits(1);
}

#[tokio::test]
async fn intensity_probes_one_factor_unit() {
    let server = MockServer::start();

    let search = server.mock(|when, then| {
        when.method(GET).path("/data/v1/search").query_param("query", "bananas");
        then.status(200).json_body(json!({
            "results": [
                { "activity_id": "food-bananas", "unit_type": "Weight", "unit": "kg" }
            ]
        }));
    });

    let estimate = server.mock(|when, then| {
        when.method(POST)
            .path("/data/v1/estimate")
            .json_body_partial(r#"{ "parameters": { "weight": 1.0, "weight_unit": "kg" } }"#);
        then.status(200).json_body(json!({ "co2e": 0.86 }));
    });

    let client = EmissionsClient::climatiq(&config_for(&server));

    let intensity = client.intensity("bananas", Some(Unit::Kg)).await.expect("intensity failed").expect("expected an intensity");

    assert_eq!(intensity.kg_co2e_per_unit, 0.86);
    assert_eq!(intensity.unit, Unit::Kg);

    // The probe reuses the cached search result.
    search.assert_hits(1);
    estimate.assert_hits(1);
}
