//! Inbound webhook server.
//!
//! One axum router: the messaging webhook plus a health probe and small
//! debug endpoints for poking at the parser and the emissions client. The
//! webhook always answers HTTP 200 with a provider-formatted reply; failures
//! become an apology message rather than an error status.

use axum::{
    Router,
    extract::{Form, Query, State},
    http::header,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::{
    base::{
        types::{NormalizedItem, ShoppingItem, Void},
        units::{Unit, UnitFamily},
    },
    interaction::{inbound, parser},
    runtime::Runtime,
};

/// Build the application router.
pub fn build_router(runtime: Runtime) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/twilio/sms", post(inbound_sms))
        .route("/debug/parse", get(debug_parse))
        .route("/debug/search", get(debug_search))
        .route("/debug/estimate", get(debug_estimate))
        .with_state(runtime)
}

/// Bind and serve until ctrl-c.
pub async fn serve(runtime: Runtime) -> Void {
    let listener = TcpListener::bind(&runtime.config.bind_address).await?;

    info!("Listening on {}.", listener.local_addr()?);

    axum::serve(listener, build_router(runtime)).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received.");
}

// Handlers.

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// The subset of the provider's webhook form the bot reads.
#[derive(Debug, Deserialize)]
struct InboundSmsForm {
    #[serde(rename = "From", default)]
    from: Option<String>,
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "NumMedia", default)]
    num_media: u32,
    #[serde(rename = "MediaUrl0", default)]
    media_url0: Option<String>,
}

#[instrument(skip_all, fields(from = ?form.from, num_media = form.num_media))]
async fn inbound_sms(State(runtime): State<Runtime>, Form(form): Form<InboundSmsForm>) -> ([(header::HeaderName, &'static str); 1], String) {
    let media_url = form.media_url0.as_deref().filter(|_| form.num_media > 0);

    let text = match inbound::handle_inbound(&runtime, &form.body, media_url).await {
        Ok(text) => text,
        Err(err) => {
            error!("Error while handling: {err}");
            inbound::APOLOGY.to_string()
        }
    };

    (
        [(header::CONTENT_TYPE, runtime.messaging.reply_content_type())],
        runtime.messaging.render_reply(&text),
    )
}

#[derive(Debug, Deserialize)]
struct ParseQuery {
    #[serde(default)]
    body: String,
}

/// Quickly see how the text parser splits items.
async fn debug_parse(Query(query): Query<ParseQuery>) -> Json<Vec<ShoppingItem>> {
    Json(parser::parse_text(&query.body))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    query: String,
    #[serde(default)]
    family: Option<UnitFamily>,
}

/// Run a raw factor search.
async fn debug_search(State(runtime): State<Runtime>, Query(query): Query<SearchQuery>) -> Json<Value> {
    match runtime.emissions.search_factor(&query.query, query.family).await {
        Ok(Some(factor)) => Json(json!({ "ok": true, "factor": factor })),
        Ok(None) => Json(json!({ "ok": false, "why": "no_results" })),
        Err(err) => Json(json!({ "ok": false, "error": err.to_string() })),
    }
}

#[derive(Debug, Deserialize)]
struct EstimateQuery {
    name: String,
    qty: f64,
    unit: Unit,
}

/// Estimate a single item to check units and factor matching quickly.
async fn debug_estimate(State(runtime): State<Runtime>, Query(query): Query<EstimateQuery>) -> Json<Value> {
    let item = NormalizedItem::passthrough(ShoppingItem {
        name: query.name.trim().to_lowercase(),
        quantity: query.qty,
        unit: query.unit,
    });

    match runtime.emissions.estimate(&item).await {
        Ok(Some(estimate)) => Json(json!({ "ok": true, "kg_co2e": estimate.kg_co2e, "factor": estimate.factor })),
        Ok(None) => Json(json!({ "ok": false, "why": "no_factor_or_incompatible_units" })),
        Err(err) => Json(json!({ "ok": false, "error": err.to_string() })),
    }
}
