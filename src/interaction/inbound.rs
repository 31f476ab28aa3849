//! End-to-end handling of one inbound message.
//!
//! Receipt photos take priority over typed text; every external call on the
//! way degrades rather than failing the request. The webhook layer turns the
//! returned text into the provider's reply format.

use tracing::{info, instrument, warn};

use crate::{
    base::types::{BasketFootprint, NormalizedItem, Res, ShoppingItem},
    interaction::{calculator, mapper, parser, suggestions},
    runtime::Runtime,
};

/// Reply sent when nothing parseable arrived.
pub const USAGE_HINT: &str = "Send items like: '2 lb ground beef, 1 gallon milk, 6 eggs' — or attach a receipt photo.";

/// Reply sent when handling failed outright.
pub const APOLOGY: &str = "Sorry—something went wrong. Try a shorter list or a clearer photo.";

/// Handle one inbound message and build the reply text.
#[instrument(skip_all, fields(has_media = media_url.is_some()))]
pub async fn handle_inbound(runtime: &Runtime, body: &str, media_url: Option<&str>) -> Res<String> {
    let items = parse_message(runtime, body, media_url).await;

    if items.is_empty() {
        return Ok(USAGE_HINT.to_string());
    }

    info!("Parsed {} items.", items.len());

    let items = mapper::map_items(items);

    // Best-effort LLM canonicalization on top of the alias mapping.
    let normalized: Vec<NormalizedItem> = match runtime.llm.normalize_items(&items).await {
        Ok(normalized) if normalized.len() == items.len() => normalized,
        Ok(other) => {
            warn!("Normalizer returned {} items for {}; passing items through.", other.len(), items.len());
            items.into_iter().map(NormalizedItem::passthrough).collect()
        }
        Err(err) => {
            warn!("Normalization failed, passing items through: {err}");
            items.into_iter().map(NormalizedItem::passthrough).collect()
        }
    };

    let basket = calculator::compute_footprint(&normalized, &runtime.emissions, &runtime.llm).await;
    let tips = suggestions::tips_for(&basket, &runtime.emissions, &runtime.llm).await;

    Ok(render_reply(&basket, &tips))
}

/// Items from the receipt photo when one is attached and readable, otherwise
/// from the typed text.
async fn parse_message(runtime: &Runtime, body: &str, media_url: Option<&str>) -> Vec<ShoppingItem> {
    if let Some(url) = media_url {
        match runtime.messaging.fetch_media(url).await {
            Ok(attachment) => match runtime.llm.parse_receipt(&attachment).await {
                Ok(items) if !items.is_empty() => return items,
                Ok(_) => info!("Receipt parse found no items; falling back to text."),
                Err(err) => warn!("Receipt parse failed, falling back to text: {err}"),
            },
            Err(err) => warn!("Media download failed, falling back to text: {err}"),
        }
    }

    parser::parse_text(body)
}

/// Render the itemized reply text.
fn render_reply(basket: &BasketFootprint, tips: &str) -> String {
    let mut lines = vec![format!("Total: {} kg CO2e", basket.total_kg_co2e)];

    for item in &basket.items {
        if item.is_skipped() {
            lines.push(format!("• {}: no match", item.name));
        } else {
            lines.push(format!("• {}: {} kg", item.name, item.kg_co2e));
        }
    }

    if !tips.is_empty() {
        lines.push(format!("Tips:\n{tips}"));
    }

    lines.join("\n")
}
