#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use footprint_bot::{
    base::{
        config::{Config, ConfigInner},
        types::{EmissionFactor, Estimate, Intensity, MediaAttachment, ModelEstimate, NormalizedItem, Res, ShoppingItem},
        units::{Unit, UnitFamily},
    },
    interaction::inbound,
    runtime::Runtime,
    server,
    service::{
        emissions::{EmissionsClient, GenericEmissionsClient},
        llm::{GenericLlmClient, LlmClient},
        messaging::{GenericMessagingClient, MessagingClient},
    },
};
use mockall::mock;
use tower::ServiceExt;

// Mocks.

// Mock messaging client for testing.

mock! {
    pub Messaging {}

    #[async_trait]
    impl GenericMessagingClient for Messaging {
        async fn fetch_media(&self, url: &str) -> Res<MediaAttachment>;
        fn render_reply(&self, text: &str) -> String;
        fn reply_content_type(&self) -> &'static str;
    }
}

// Mock emissions client for testing.

mock! {
    pub Emissions {}

    #[async_trait]
    impl GenericEmissionsClient for Emissions {
        async fn search_factor(&self, query: &str, family: Option<UnitFamily>) -> Res<Option<EmissionFactor>>;
        async fn estimate(&self, item: &NormalizedItem) -> Res<Option<Estimate>>;
        async fn intensity(&self, name: &str, preferred_unit: Option<Unit>) -> Res<Option<Intensity>>;
    }
}

// Mock LLM client for testing.

mock! {
    pub Llm {}

    #[async_trait]
    impl GenericLlmClient for Llm {
        async fn parse_receipt(&self, attachment: &MediaAttachment) -> Res<Vec<ShoppingItem>>;
        async fn normalize_items(&self, items: &[ShoppingItem]) -> Res<Vec<NormalizedItem>>;
        async fn fallback_estimate(&self, item: &NormalizedItem) -> Res<Option<ModelEstimate>>;
        async fn encouragement(&self, total_kg_co2e: f64, item_names: &[String]) -> Res<Option<String>>;
    }
}

// Helpers.

fn test_config() -> Config {
    Config {
        inner: Arc::new(ConfigInner {
            climatiq_api_key: "test_key".to_string(),
            ..Default::default()
        }),
    }
}

fn factor(activity_id: &str) -> EmissionFactor {
    EmissionFactor {
        activity_id: activity_id.to_string(),
        name: None,
        unit_type: Some("Weight".to_string()),
        unit: Some("kg".to_string()),
        source: None,
    }
}

fn get_mock_messaging() -> MockMessaging {
    let mut mock = MockMessaging::new();

    mock.expect_fetch_media().returning(|_| {
        Ok(MediaAttachment {
            bytes: vec![0xff, 0xd8, 0xff],
            mime: "image/jpeg".to_string(),
        })
    });
    mock.expect_render_reply()
        .returning(|text| format!("<Response><Message><Body>{text}</Body></Message></Response>"));
    mock.expect_reply_content_type().return_const("text/xml");

    mock
}

/// Emissions mock that answers by canonical name and never suggests swaps.
fn get_mock_emissions(answers: Vec<(&'static str, f64)>) -> MockEmissions {
    let mut mock = MockEmissions::new();

    mock.expect_estimate().returning(move |item| {
        let hit = answers.iter().find(|(name, _)| *name == item.canonical);

        Ok(hit.map(|(name, kg)| Estimate {
            kg_co2e: *kg,
            factor: factor(name),
        }))
    });
    mock.expect_intensity().returning(|_, _| Ok(None));

    mock
}

fn runtime_with(messaging: MockMessaging, emissions: MockEmissions, llm: LlmClient) -> Runtime {
    Runtime {
        config: test_config(),
        messaging: MessagingClient::new(Arc::new(messaging)),
        emissions: EmissionsClient::new(Arc::new(emissions)),
        llm,
    }
}

// Pipeline tests.

#[tokio::test]
async fn text_list_produces_itemized_reply() {
    let emissions = get_mock_emissions(vec![("ground beef", 7.2), ("milk", 2.3)]);
    let runtime = runtime_with(get_mock_messaging(), emissions, LlmClient::disabled());

    let reply = inbound::handle_inbound(&runtime, "2 lb ground beef, 1 gallon milk, 6 eggs", None).await.expect("handling failed");

    assert!(reply.starts_with("Total: 9.5 kg CO2e"));
    assert!(reply.contains("• ground beef: 7.2 kg"));
    assert!(reply.contains("• milk: 2.3 kg"));
    assert!(reply.contains("• eggs: no match"));
    // Mixed basket with no swaps gets the generic batch-cooking tip.
    assert!(reply.contains("Batch-cook"));
}

#[tokio::test]
async fn receipt_photo_takes_priority_over_text() {
    let emissions = get_mock_emissions(vec![("bananas", 0.43)]);

    let mut llm = MockLlm::new();
    llm.expect_parse_receipt().returning(|_| {
        Ok(vec![ShoppingItem {
            name: "bananas".to_string(),
            quantity: 6.0,
            unit: Unit::Each,
        }])
    });
    llm.expect_normalize_items().returning(|items| Ok(items.iter().cloned().map(NormalizedItem::passthrough).collect()));
    llm.expect_fallback_estimate().returning(|_| Ok(None));
    llm.expect_encouragement().returning(|_, _| Ok(Some("Keep it up! 🌱".to_string())));

    let runtime = runtime_with(get_mock_messaging(), emissions, LlmClient::new(Arc::new(llm)));

    let reply = inbound::handle_inbound(&runtime, "ignored text", Some("https://api.twilio.com/media/ME1")).await.expect("handling failed");

    assert!(reply.contains("Total: 0.43 kg CO2e"));
    assert!(reply.contains("• bananas: 0.43 kg"));
    // Plant-only basket with nothing to swap gets praised.
    assert!(reply.contains("plant-forward"));
    assert!(reply.contains("Keep it up!"));
}

#[tokio::test]
async fn model_fallback_covers_missing_factors() {
    let emissions = get_mock_emissions(vec![]);

    let mut llm = MockLlm::new();
    llm.expect_normalize_items().returning(|items| Ok(items.iter().cloned().map(NormalizedItem::passthrough).collect()));
    llm.expect_fallback_estimate().returning(|_| {
        Ok(Some(ModelEstimate {
            kg_co2e: 1.2,
            explanation: "Generic exotic fruit per-kg factor".to_string(),
            confidence: 0.4,
        }))
    });
    llm.expect_encouragement().returning(|_, _| Ok(None));

    let runtime = runtime_with(get_mock_messaging(), emissions, LlmClient::new(Arc::new(llm)));

    let reply = inbound::handle_inbound(&runtime, "2 lb dragonfruit", None).await.expect("handling failed");

    assert!(reply.contains("Total: 1.2 kg CO2e"));
    assert!(reply.contains("• dragonfruit: 1.2 kg"));
}

#[tokio::test]
async fn empty_message_gets_the_usage_hint() {
    let runtime = runtime_with(get_mock_messaging(), MockEmissions::new(), LlmClient::disabled());

    let reply = inbound::handle_inbound(&runtime, "  ", None).await.expect("handling failed");

    assert_eq!(reply, inbound::USAGE_HINT);
}

#[tokio::test]
async fn media_failure_falls_back_to_text() {
    let mut messaging = MockMessaging::new();
    messaging.expect_fetch_media().returning(|_| Err(anyhow::anyhow!("403 from media host")));
    messaging.expect_render_reply().returning(|text| text.to_string());
    messaging.expect_reply_content_type().return_const("text/xml");

    let emissions = get_mock_emissions(vec![("ground beef", 7.2)]);
    let runtime = runtime_with(messaging, emissions, LlmClient::disabled());

    let reply = inbound::handle_inbound(&runtime, "2 lb ground beef", Some("https://api.twilio.com/media/ME2")).await.expect("handling failed");

    assert!(reply.contains("• ground beef: 7.2 kg"));
}

#[tokio::test]
async fn quantified_swaps_use_intensities() {
    let mut emissions = MockEmissions::new();

    emissions.expect_estimate().returning(|item| {
        let kg = if item.canonical == "ground beef" { 24.0 } else { 1.0 };

        Ok(Some(Estimate {
            kg_co2e: kg,
            factor: factor("x"),
        }))
    });
    emissions.expect_intensity().returning(|name, _| {
        let per_kg = match name {
            "ground beef" => 27.0,
            "chicken breast" => 6.0,
            _ => return Ok(None),
        };

        Ok(Some(Intensity {
            kg_co2e_per_unit: per_kg,
            unit: Unit::Kg,
        }))
    });

    let runtime = runtime_with(get_mock_messaging(), emissions, LlmClient::disabled());

    let reply = inbound::handle_inbound(&runtime, "2 lb ground beef", None).await.expect("handling failed");

    // 0.907 kg at 27 vs 6 kg CO2e/kg is ~19 kg saved.
    assert!(reply.contains("Swap ground beef → chicken breast: save ~19.05 kg CO2e."));
}

// Webhook tests.

#[tokio::test]
async fn webhook_replies_with_twiml() {
    let emissions = get_mock_emissions(vec![("ground beef", 7.2)]);
    let runtime = runtime_with(get_mock_messaging(), emissions, LlmClient::disabled());

    let app = server::build_router(runtime);

    let request = Request::builder()
        .method("POST")
        .uri("/twilio/sms")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("From=%2B15551234567&Body=2%20lb%20ground%20beef&NumMedia=0"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "text/xml");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();

    assert!(body.contains("<Body>Total: 7.2 kg CO2e"));
    assert!(body.contains("ground beef: 7.2 kg"));
}

#[tokio::test]
async fn webhook_always_answers_even_on_garbage() {
    let runtime = runtime_with(get_mock_messaging(), MockEmissions::new(), LlmClient::disabled());

    let app = server::build_router(runtime);

    let request = Request::builder()
        .method("POST")
        .uri("/twilio/sms")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("Body=hello%20there"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();

    assert!(body.contains("Send items like"));
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let runtime = runtime_with(get_mock_messaging(), MockEmissions::new(), LlmClient::disabled());

    let app = server::build_router(runtime);

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

    assert_eq!(serde_json::from_slice::<serde_json::Value>(&body).unwrap(), serde_json::json!({ "ok": true }));
}

#[tokio::test]
async fn debug_parse_returns_items_as_json() {
    let runtime = runtime_with(get_mock_messaging(), MockEmissions::new(), LlmClient::disabled());

    let app = server::build_router(runtime);

    let response = app
        .oneshot(Request::builder().uri("/debug/parse?body=2%20lb%20ground%20beef").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let items: Vec<ShoppingItem> = serde_json::from_slice(&body).unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "ground beef");
    assert_eq!(items[0].unit, Unit::Lb);
}
