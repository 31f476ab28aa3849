//! Substitution suggestions and closing tips.
//!
//! The goal is item-aware, quantified advice: "Swap X → Y: save ~N kg CO2e."
//! for the heaviest contributors, praise for plant-forward baskets, and a
//! single gentle generic tip as the floor. A one-line LLM encouragement is
//! appended best-effort.

use futures::future::join_all;
use tracing::{instrument, warn};

use crate::{
    base::{
        types::{BasketFootprint, ItemFootprint, round2},
        units,
    },
    service::{emissions::EmissionsClient, llm::LlmClient},
};

/// Lower-carbon alternatives keyed by name substring, in priority order.
const ALTERNATIVES: &[(&str, &str)] = &[
    ("beef", "chicken breast"),
    ("beef", "lentils (dry)"),
    ("lamb", "chicken breast"),
    ("milk", "oat milk"),
    ("cheese", "yogurt (plain)"),
    ("butter", "olive oil"),
];

/// Produce micro-tips keyed by name substring.
const MICROTIPS: &[(&str, &str)] = &[
    ("banana", "Bananas are already low-carbon: store at room temp to cut waste."),
    ("mandarin", "Citrus is lower-carbon; buying in-season keeps impacts down."),
    ("lime", "Choose loose citrus over bagged to avoid packaging emissions."),
    ("apple", "Apples store well: buy loose and keep cool to reduce spoilage."),
];

/// Name substrings that mark an item as animal-based.
const ANIMAL_KEYWORDS: &[&str] = &[
    "beef", "lamb", "pork", "chicken", "turkey", "fish", "salmon", "tuna", "shrimp", "egg", "milk", "cheese", "yogurt", "butter",
];

/// Build the tips block for a computed basket. May be empty only when the
/// basket itself is empty.
#[instrument(skip_all, fields(total = basket.total_kg_co2e))]
pub async fn tips_for(basket: &BasketFootprint, emissions: &EmissionsClient, llm: &LlmClient) -> String {
    let mut lines: Vec<String> = Vec::new();

    // Quantified swaps for the top contributors.
    let mut by_impact: Vec<&ItemFootprint> = basket.items.iter().collect();
    by_impact.sort_by(|a, b| b.kg_co2e.total_cmp(&a.kg_co2e));

    let swaps = join_all(by_impact.iter().take(3).map(|item| quantified_swap(item, emissions))).await;
    lines.extend(swaps.into_iter().flatten());

    let names: Vec<String> = basket.items.iter().map(|item| item.name.to_lowercase()).collect();
    let plant_only = !names.is_empty() && names.iter().all(|name| is_plant_based(name));

    // Nothing to swap on a low-impact basket deserves praise, not nagging.
    if lines.is_empty() && (plant_only || basket.total_kg_co2e <= 1.0) && !names.is_empty() {
        lines.push("Nice — this basket is low-impact and plant-forward. No swaps needed. 🎉".to_string());
        lines.extend(microtips_for(&names).into_iter().map(str::to_string));
    }

    if lines.is_empty() && !names.is_empty() {
        let tip = if plant_only {
            "Buy loose produce (skip plastic bags) and store properly to reduce waste."
        } else {
            "Batch-cook portions to cut leftovers and energy use."
        };
        lines.push(tip.to_string());
    }

    // Optional one-liner from the coach.
    match llm.encouragement(basket.total_kg_co2e, &names).await {
        Ok(Some(extra)) => lines.push(extra),
        Ok(None) => {}
        Err(err) => warn!("Encouragement failed: {err}"),
    }

    lines.join("\n")
}

/// Build one quantified swap line, when the math works out to a saving.
async fn quantified_swap(item: &ItemFootprint, emissions: &EmissionsClient) -> Option<String> {
    if item.quantity <= 0.0 {
        return None;
    }

    let name = item.name.to_lowercase();
    let alternative = pick_alternative(&name)?;

    let current = match emissions.intensity(&name, Some(item.unit)).await {
        Ok(intensity) => intensity?,
        Err(err) => {
            warn!("Intensity lookup failed for `{name}`: {err}");
            return None;
        }
    };

    let replacement = match emissions.intensity(alternative, Some(item.unit)).await {
        Ok(intensity) => intensity?,
        Err(err) => {
            warn!("Intensity lookup failed for `{alternative}`: {err}");
            return None;
        }
    };

    // Same purchase quantity, expressed in each factor's unit.
    let quantity_current = units::convert(item.quantity, item.unit, current.unit)?;
    let quantity_replacement = units::convert(item.quantity, item.unit, replacement.unit)?;

    let savings = quantity_current * current.kg_co2e_per_unit - quantity_replacement * replacement.kg_co2e_per_unit;

    if savings <= 0.0 {
        return None;
    }

    Some(format!("Swap {name} → {alternative}: save ~{} kg CO2e.", round2(savings)))
}

/// The first matching lower-carbon alternative for an item name.
fn pick_alternative(name: &str) -> Option<&'static str> {
    ALTERNATIVES.iter().find(|(key, _)| name.contains(key)).map(|(_, alt)| *alt)
}

/// Whether a name looks plant-based (no animal keyword).
fn is_plant_based(name: &str) -> bool {
    !ANIMAL_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

/// Up to two micro-tips matching the purchased names.
fn microtips_for(names: &[String]) -> Vec<&'static str> {
    let mut tips = Vec::new();

    for name in names {
        for (key, tip) in MICROTIPS {
            if name.contains(key) && !tips.contains(tip) {
                tips.push(*tip);

                if tips.len() >= 2 {
                    return tips;
                }
            }
        }
    }

    tips
}
