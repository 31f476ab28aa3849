//! Common types and result aliases used throughout the application.

use serde::{Deserialize, Serialize};

use crate::base::units::Unit;

/// The common error type for the application.
pub type Err = anyhow::Error;
/// The common result type for the application.
pub type Res<T> = Result<T, Err>;
/// The common "void" result type for the application.
pub type Void = Res<()>;

/// One parsed line of a shopping list.
///
/// This is the only record the bot holds, and only for the duration of a
/// single request/response cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    /// The item name as the sender wrote it, lowercased.
    pub name: String,
    /// The purchased quantity, in `unit`.
    pub quantity: f64,
    /// The quantity's unit.
    pub unit: Unit,
}

/// A shopping item canonicalized for emission-factor search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    /// The item as parsed from the user's message.
    pub item: ShoppingItem,
    /// Generic product name suitable for factor search (e.g. "ground beef").
    pub canonical: String,
    /// Search terms to try against the factor database, in order.
    pub queries: Vec<String>,
    /// Density hint for liquids (kg per liter), when known.
    pub density_kg_per_l: Option<f64>,
}

impl NormalizedItem {
    /// Identity normalization: the canonical name is the item name itself.
    pub fn passthrough(item: ShoppingItem) -> Self {
        let canonical = item.name.clone();

        Self {
            queries: vec![canonical.clone()],
            canonical,
            item,
            density_kg_per_l: None,
        }
    }
}

/// An emission-factor document returned by the factor database search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactor {
    /// The database's identifier for the underlying activity.
    pub activity_id: String,
    /// Human-readable factor name.
    #[serde(default)]
    pub name: Option<String>,
    /// The parameter family the factor expects ("Weight", "Volume", "Number", ...).
    #[serde(default)]
    pub unit_type: Option<String>,
    /// The factor's denominator unit, as published (e.g. "kg", "kg/kg").
    #[serde(default)]
    pub unit: Option<String>,
    /// The dataset the factor comes from.
    #[serde(default)]
    pub source: Option<String>,
}

/// A completed estimate for one item quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Total kg CO2e for the estimated quantity.
    pub kg_co2e: f64,
    /// The factor the estimate was computed against.
    pub factor: EmissionFactor,
}

/// Emission intensity of a product: kg CO2e per one `unit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intensity {
    /// Kg CO2e per one `unit` of the product.
    pub kg_co2e_per_unit: f64,
    /// The unit the intensity is denominated in.
    pub unit: Unit,
}

/// A numeric fallback estimate produced by the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEstimate {
    /// Total kg CO2e for the item quantity.
    pub kg_co2e: f64,
    /// Short note on how the model arrived at the number.
    pub explanation: String,
    /// The model's self-reported confidence, 0 to 1.
    #[serde(default)]
    pub confidence: f64,
}

/// A media attachment fetched from the messaging provider.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAttachment {
    /// Raw attachment bytes.
    pub bytes: Vec<u8>,
    /// MIME type, from the response header or the URL extension.
    pub mime: String,
}

/// Where an item's kg CO2e number came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FootprintSource {
    /// Estimated against a factor from the emissions database.
    Factor {
        /// The matched factor's activity id.
        activity_id: String,
    },
    /// Numeric fallback produced by the language model.
    ModelEstimate {
        /// The model's note on how it arrived at the number.
        explanation: String,
    },
    /// No factor matched and no fallback was available.
    Skipped,
}

/// A single item's contribution to the basket footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFootprint {
    /// The item name shown in the reply.
    pub name: String,
    /// The purchased quantity, in `unit`.
    pub quantity: f64,
    /// The quantity's unit.
    pub unit: Unit,
    /// The item's kg CO2e contribution; 0 when skipped.
    pub kg_co2e: f64,
    /// Where the number came from.
    pub source: FootprintSource,
}

impl ItemFootprint {
    /// Whether the item was counted at all.
    pub fn is_skipped(&self) -> bool {
        matches!(self.source, FootprintSource::Skipped)
    }
}

/// The itemized footprint of one shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketFootprint {
    /// Sum of the item contributions, rounded to 3 decimals.
    pub total_kg_co2e: f64,
    /// Per-item breakdown, in input order.
    pub items: Vec<ItemFootprint>,
}

/// Round to 3 decimal places, the precision used in replies.
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Round to 2 decimal places, used for suggestion savings.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
