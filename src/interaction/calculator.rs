//! Basket footprint computation.
//!
//! Each item is estimated against the emissions database; when no factor
//! matches (or the call fails), the language model may supply a last-resort
//! number. Items that still have nothing are kept in the breakdown as
//! skipped so the sender can see what was not counted. Nothing here aborts
//! the basket.

use tracing::{instrument, warn};

use crate::{
    base::types::{BasketFootprint, FootprintSource, ItemFootprint, NormalizedItem, round3},
    service::{emissions::EmissionsClient, llm::LlmClient},
};

/// Compute the itemized footprint of a normalized basket.
#[instrument(skip_all, fields(items = items.len()))]
pub async fn compute_footprint(items: &[NormalizedItem], emissions: &EmissionsClient, llm: &LlmClient) -> BasketFootprint {
    let mut total = 0.0;
    let mut breakdown = Vec::with_capacity(items.len());

    for item in items {
        let footprint = estimate_item(item, emissions, llm).await;
        total += footprint.kg_co2e;
        breakdown.push(footprint);
    }

    BasketFootprint {
        total_kg_co2e: round3(total),
        items: breakdown,
    }
}

/// Estimate one item, degrading from factor lookup to model fallback to skip.
async fn estimate_item(item: &NormalizedItem, emissions: &EmissionsClient, llm: &LlmClient) -> ItemFootprint {
    let base = ItemFootprint {
        name: item.item.name.clone(),
        quantity: item.item.quantity,
        unit: item.item.unit,
        kg_co2e: 0.0,
        source: FootprintSource::Skipped,
    };

    match emissions.estimate(item).await {
        Ok(Some(estimate)) => {
            return ItemFootprint {
                kg_co2e: round3(estimate.kg_co2e),
                source: FootprintSource::Factor {
                    activity_id: estimate.factor.activity_id,
                },
                ..base
            };
        }
        Ok(None) => {}
        Err(err) => {
            warn!("Estimate failed for `{}`: {err}", item.canonical);
        }
    }

    // No factor: let the model take a conservative guess.
    match llm.fallback_estimate(item).await {
        Ok(Some(estimate)) => ItemFootprint {
            kg_co2e: round3(estimate.kg_co2e),
            source: FootprintSource::ModelEstimate { explanation: estimate.explanation },
            ..base
        },
        Ok(None) => base,
        Err(err) => {
            warn!("Fallback estimate failed for `{}`: {err}", item.canonical);
            base
        }
    }
}
