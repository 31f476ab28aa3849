//! Quantity units and conversions.
//!
//! Shopping lists arrive with retail units (`2 lb`, `1 gallon`, `6 each`) while
//! emission factors are denominated in whatever unit the factor database
//! publishes. This module normalizes unit spellings and converts quantities
//! within a unit family; cross-family bridging (count → mass, volume ↔ mass)
//! lives with the emissions client because it needs per-product data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A quantity unit as it appears in shopping lists and factor documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Pounds.
    Lb,
    /// Kilograms.
    Kg,
    /// Grams.
    G,
    /// Ounces.
    Oz,
    /// Liters.
    Liter,
    /// Milliliters.
    Ml,
    /// US gallons.
    Gallon,
    /// Individual pieces ("6 eggs").
    Each,
}

/// The measurement family a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitFamily {
    /// Weight units (base: kilogram).
    Mass,
    /// Volume units (base: liter).
    Volume,
    /// Piece counts.
    Count,
}

impl Unit {
    /// Parse a unit token, accepting common retail aliases.
    ///
    /// Returns `None` for anything that is not a unit, so callers can treat
    /// unknown tokens as part of the item name.
    pub fn parse(token: &str) -> Option<Unit> {
        let token = token.trim().to_lowercase();

        match token.as_str() {
            "lb" | "lbs" | "pound" | "pounds" => Some(Unit::Lb),
            "kg" | "kgs" | "kilogram" | "kilograms" => Some(Unit::Kg),
            "g" | "gram" | "grams" => Some(Unit::G),
            "oz" | "ounce" | "ounces" => Some(Unit::Oz),
            "l" | "liter" | "liters" | "litre" | "litres" => Some(Unit::Liter),
            "ml" | "milliliter" | "milliliters" => Some(Unit::Ml),
            "gal" | "gals" | "gallon" | "gallons" => Some(Unit::Gallon),
            "each" | "ea" | "item" | "items" | "count" => Some(Unit::Each),
            _ => None,
        }
    }

    /// The family this unit measures.
    pub fn family(self) -> UnitFamily {
        match self {
            Unit::Lb | Unit::Kg | Unit::G | Unit::Oz => UnitFamily::Mass,
            Unit::Liter | Unit::Ml | Unit::Gallon => UnitFamily::Volume,
            Unit::Each => UnitFamily::Count,
        }
    }

    /// Canonical spelling used in replies and API parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Lb => "lb",
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::Oz => "oz",
            Unit::Liter => "liter",
            Unit::Ml => "ml",
            Unit::Gallon => "gallon",
            Unit::Each => "each",
        }
    }

    /// Multiplier into the family base unit (kg for mass, liter for volume).
    fn to_base(self) -> f64 {
        match self {
            Unit::Lb => 0.45359237,
            Unit::Kg => 1.0,
            Unit::G => 0.001,
            Unit::Oz => 0.028349523125,
            Unit::Liter => 1.0,
            Unit::Ml => 0.001,
            Unit::Gallon => 3.78541,
            Unit::Each => 1.0,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::parse(s).ok_or_else(|| anyhow::anyhow!("Unknown unit: `{s}`."))
    }
}

/// Convert a quantity between two units of the same family.
///
/// Returns `None` when the families differ (e.g. gallons to kg); callers that
/// need a cross-family conversion must bridge through product data.
pub fn convert(quantity: f64, from: Unit, to: Unit) -> Option<f64> {
    if from.family() != to.family() {
        return None;
    }

    Some(quantity * from.to_base() / to.to_base())
}
