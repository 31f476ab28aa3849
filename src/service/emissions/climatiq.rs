//! Integration with the Climatiq emission-factor database.
//!
//! This module resolves free-text grocery items into emission factors via the
//! search endpoint, converts shopping quantities into each factor's expected
//! unit (bridging across unit families through product data where needed),
//! and calls the estimate endpoint for the final kg CO2e number.
//!
//! Search results are cached in memory for an hour; factor catalogs change
//! rarely and receipts repeat the same staples.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::base::{
    config::Config,
    types::{EmissionFactor, Estimate, Intensity, NormalizedItem, Res, ShoppingItem},
    units::{self, Unit, UnitFamily},
};

use super::{EmissionsClient, GenericEmissionsClient};

// Extra methods on `EmissionsClient` applied by the climatiq implementation.

impl EmissionsClient {
    pub fn climatiq(config: &Config) -> Self {
        let client = ClimatiqEmissionsClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Constants.

/// How long a search result stays valid in the in-memory cache.
const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Typical mass of a single egg, for count-based egg lines against mass factors.
const EGG_MASS_KG: f64 = 0.05;

/// Item names mapped to search keywords that the factor database matches well.
const QUERY_HINTS: &[(&str, &str)] = &[
    ("ground beef", "beef"),
    ("beef steak", "beef"),
    ("lamb", "lamb"),
    ("chicken breast", "chicken"),
    ("milk (cow)", "cow milk"),
    ("milk", "cow milk"),
    ("plant-based milk", "oat milk"),
    ("oat milk", "oat milk"),
    ("yogurt (plain)", "yogurt"),
    ("cheese (hard)", "cheese"),
    ("tofu", "tofu"),
    ("lentils (dry)", "lentils"),
    ("beans (dry)", "beans"),
    ("rice (white)", "rice white"),
    ("bread (loaf)", "bread"),
    ("pasta (dry)", "pasta"),
    ("apples", "apples"),
    ("bananas", "bananas"),
    ("mandarins", "mandarins"),
    ("lime", "limes"),
    ("chocolate", "chocolate"),
    ("coffee (roasted)", "coffee beans"),
    ("bottled water", "bottled water"),
    ("tilapia", "tilapia fillet"),
    ("salmon", "salmon fillet"),
    ("cod", "cod fillet"),
    ("tuna", "tuna (raw)"),
    ("fish", "fish fillet"),
    ("whitefish", "whitefish fillet"),
    ("shrimp", "shrimp (raw)"),
];

/// Densities (kg per liter) for volume ↔ mass bridging of common liquids.
const DENSITY_KG_PER_L: &[(&str, f64)] = &[
    ("milk", 1.03),
    ("cow milk", 1.03),
    ("oat milk", 1.03),
    ("water", 1.00),
    ("olive oil", 0.91),
];

/// Typical retail weights per item (kg) for common loose produce.
const AVG_ITEM_MASS_KG: &[(&str, f64)] = &[
    ("lime", 0.067),
    ("mandarin", 0.088),
    ("tangerine", 0.095),
    ("orange", 0.13),
    ("banana", 0.12),
    ("apple", 0.18),
    ("pear", 0.18),
    ("onion", 0.15),
    ("tomato", 0.12),
    ("potato", 0.21),
    ("lemon", 0.085),
];

// Specific implementations.

/// Climatiq emissions client implementation.
#[derive(Clone)]
pub struct ClimatiqEmissionsClient {
    http: Client,
    config: Config,
    cache: Arc<Mutex<HashMap<String, (Instant, EmissionFactor)>>>,
}

/// Response body of the search endpoint.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<EmissionFactor>,
}

/// Response body of the estimate endpoint.
#[derive(Debug, Deserialize)]
struct EstimateResponse {
    co2e: f64,
}

/// Parameter families the estimate endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FactorUnitType {
    Weight,
    Volume,
    Number,
    Other,
}

impl ClimatiqEmissionsClient {
    /// Create a new Climatiq emissions client.
    #[instrument(name = "ClimatiqEmissionsClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            config: config.clone(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Call the search endpoint, optionally with the configured region filter.
    #[instrument(name = "ClimatiqEmissionsClient::fetch_search", skip(self))]
    async fn fetch_search(&self, query: &str, with_region: bool) -> Res<Vec<EmissionFactor>> {
        let mut params = vec![("query", query.to_string()), ("data_version", self.config.climatiq_data_version.clone())];

        if with_region {
            if let Some(region) = &self.config.climatiq_region {
                params.push(("region", region.clone()));
            }
        }

        let response = self
            .http
            .get(format!("{}/data/v1/search", self.config.climatiq_endpoint))
            .bearer_auth(&self.config.climatiq_api_key)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;

        Ok(body.results)
    }

    async fn cache_get(&self, key: &str) -> Option<EmissionFactor> {
        let mut cache = self.cache.lock().await;

        match cache.get(key) {
            Some((at, factor)) if at.elapsed() <= CACHE_TTL => Some(factor.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    async fn cache_set(&self, key: String, factor: EmissionFactor) {
        self.cache.lock().await.insert(key, (Instant::now(), factor));
    }
}

#[async_trait]
impl GenericEmissionsClient for ClimatiqEmissionsClient {
    #[instrument(name = "ClimatiqEmissionsClient::search_factor", skip(self))]
    async fn search_factor(&self, query: &str, family: Option<UnitFamily>) -> Res<Option<EmissionFactor>> {
        let query = query.trim().to_lowercase();

        // Avoid junk queries like a stray "s".
        if query.len() < 2 {
            return Ok(None);
        }

        let cache_key = format!(
            "search::{query}::{family:?}::{}::{}",
            self.config.climatiq_region.as_deref().unwrap_or(""),
            self.config.climatiq_data_version
        );

        if let Some(cached) = self.cache_get(&cache_key).await {
            return Ok(Some(cached));
        }

        // First pass honors the region filter (if any).
        let results = self.fetch_search(&query, true).await?;
        let mut doc = pick_by_family(&results, family);

        // Region filters can hide food factors entirely; retry unregioned.
        if doc.is_none() && self.config.climatiq_region.is_some() {
            let results = self.fetch_search(&query, false).await?;
            doc = pick_by_family(&results, family).or_else(|| results.first().cloned());
        }

        if let Some(doc) = &doc {
            self.cache_set(cache_key, doc.clone()).await;
        }

        Ok(doc)
    }

    #[instrument(name = "ClimatiqEmissionsClient::estimate", skip_all, fields(name = %item.canonical))]
    async fn estimate(&self, item: &NormalizedItem) -> Res<Option<Estimate>> {
        let quantity = item.item.quantity;

        if quantity <= 0.0 {
            return Ok(None);
        }

        let family = item.item.unit.family();

        // Hints first: the factor database matches "beef" better than "ground beef".
        let mut queries: Vec<String> = Vec::new();

        if let Some(hint) = query_hint(&item.canonical) {
            queries.push(hint.to_string());
        }

        for query in &item.queries {
            if !queries.contains(query) {
                queries.push(query.clone());
            }
        }

        if queries.is_empty() {
            queries.push(item.canonical.clone());
        }

        let mut factor = None;

        for query in &queries {
            if let Some(found) = self.search_factor(query, Some(family)).await? {
                factor = Some(found);
                break;
            }
        }

        let Some(factor) = factor else {
            info!("No emission factor for `{}` (queries: {queries:?}).", item.canonical);
            return Ok(None);
        };

        let unit_type = norm_unit_type(factor.unit_type.as_deref());
        let factor_unit = parse_factor_unit(factor.unit.as_deref(), unit_type);

        let Some(quantity_in_factor) = quantity_in_factor_unit(&item.canonical, quantity, item.item.unit, factor_unit, item.density_kg_per_l) else {
            warn!(
                "Unit mismatch for `{}`: {} {} cannot reach factor unit `{}` (raw: {:?}).",
                item.canonical, quantity, item.item.unit, factor_unit, factor.unit
            );
            return Ok(None);
        };

        let parameters = match unit_type {
            FactorUnitType::Weight => json!({ "weight": quantity_in_factor, "weight_unit": factor_unit.as_str() }),
            FactorUnitType::Volume => json!({ "volume": quantity_in_factor, "volume_unit": factor_unit.as_str() }),
            FactorUnitType::Number => json!({ "number": quantity_in_factor }),
            FactorUnitType::Other => json!({ "quantity": quantity_in_factor, "unit": factor_unit.as_str() }),
        };

        let payload = json!({
            "emission_factor": {
                "activity_id": factor.activity_id,
                "data_version": self.config.climatiq_data_version,
            },
            "parameters": parameters,
        });

        let response = self
            .http
            .post(format!("{}/data/v1/estimate", self.config.climatiq_endpoint))
            .bearer_auth(&self.config.climatiq_api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Estimate call failed ({status}): {body}"));
        }

        let body: EstimateResponse = response.json().await?;

        Ok(Some(Estimate { kg_co2e: body.co2e, factor }))
    }

    #[instrument(name = "ClimatiqEmissionsClient::intensity", skip(self))]
    async fn intensity(&self, name: &str, preferred_unit: Option<Unit>) -> Res<Option<Intensity>> {
        let family = preferred_unit.map(Unit::family);

        let Some(factor) = self.search_factor(name, family).await? else {
            return Ok(None);
        };

        let unit = parse_factor_unit(factor.unit.as_deref(), norm_unit_type(factor.unit_type.as_deref()));

        // One factor unit of the product; the search result is already cached.
        let probe = NormalizedItem::passthrough(ShoppingItem {
            name: name.to_string(),
            quantity: 1.0,
            unit,
        });

        let Some(estimate) = self.estimate(&probe).await? else {
            return Ok(None);
        };

        Ok(Some(Intensity {
            kg_co2e_per_unit: estimate.kg_co2e,
            unit,
        }))
    }
}

// Helpers.

/// Look up the search keyword for a canonical item name, when one is known.
fn query_hint(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();

    QUERY_HINTS.iter().find(|(key, _)| *key == name).map(|(_, hint)| *hint)
}

/// Map a factor's published unit type onto the estimate parameter families.
fn norm_unit_type(raw: Option<&str>) -> FactorUnitType {
    match raw.unwrap_or("").trim().to_lowercase().as_str() {
        "weight" | "mass" => FactorUnitType::Weight,
        "volume" => FactorUnitType::Volume,
        "number" | "items" | "count" | "units" => FactorUnitType::Number,
        _ => FactorUnitType::Other,
    }
}

/// Turn factor unit strings like `kg/kg` or `kgCO2e/kg` into a [`Unit`].
///
/// The denominator carries the quantity unit; anything unparseable defaults
/// to the family's base unit.
fn parse_factor_unit(raw: Option<&str>, unit_type: FactorUnitType) -> Unit {
    let raw = raw.unwrap_or("").trim().to_lowercase().replace(' ', "");
    let denominator = raw.rsplit('/').next().unwrap_or("");
    let parsed = Unit::parse(denominator);

    match unit_type {
        FactorUnitType::Weight => parsed.filter(|u| u.family() == UnitFamily::Mass).unwrap_or(Unit::Kg),
        FactorUnitType::Volume => parsed.filter(|u| u.family() == UnitFamily::Volume).unwrap_or(Unit::Liter),
        FactorUnitType::Number => Unit::Each,
        FactorUnitType::Other => parsed.unwrap_or(Unit::Each),
    }
}

/// Whether a search result is usable: weight/volume/number with a defined unit.
///
/// Filters out factors denominated in area, money, and the like.
fn usable(factor: &EmissionFactor) -> bool {
    norm_unit_type(factor.unit_type.as_deref()) != FactorUnitType::Other && factor.unit.as_deref().is_some_and(|u| !u.is_empty())
}

/// Pick the best usable factor, preferring the requested unit family.
fn pick_by_family(results: &[EmissionFactor], family: Option<UnitFamily>) -> Option<EmissionFactor> {
    let usable_results: Vec<&EmissionFactor> = results.iter().filter(|f| usable(f)).collect();

    let Some(family) = family else {
        return usable_results.first().copied().cloned();
    };

    let want = match family {
        UnitFamily::Mass => FactorUnitType::Weight,
        UnitFamily::Volume => FactorUnitType::Volume,
        UnitFamily::Count => FactorUnitType::Number,
    };

    usable_results
        .iter()
        .find(|f| norm_unit_type(f.unit_type.as_deref()) == want)
        .or_else(|| {
            // Any weight/volume factor can still be reached through bridging.
            usable_results
                .iter()
                .find(|f| matches!(norm_unit_type(f.unit_type.as_deref()), FactorUnitType::Weight | FactorUnitType::Volume))
        })
        .or_else(|| usable_results.first())
        .copied()
        .cloned()
}

/// Density (kg per liter) for a product, preferring an explicit hint.
fn density_for(name: &str, hint: Option<f64>) -> Option<f64> {
    if let Some(density) = hint {
        return Some(density);
    }

    let name = name.to_lowercase();

    DENSITY_KG_PER_L.iter().find(|(key, _)| name.contains(key)).map(|(_, density)| *density)
}

/// Typical single-item mass (kg) for loose produce.
fn avg_item_mass_for(name: &str) -> Option<f64> {
    let name = name.to_lowercase();

    AVG_ITEM_MASS_KG.iter().find(|(key, _)| name.contains(key)).map(|(_, kg)| *kg)
}

/// Convert a shopping quantity into the factor's unit.
///
/// Same-family conversion first; then count → mass through typical item
/// weights (with the egg heuristic), and volume ↔ mass through density.
/// `None` means the units are genuinely incompatible and the item is skipped.
fn quantity_in_factor_unit(name: &str, quantity: f64, unit: Unit, factor_unit: Unit, density_hint: Option<f64>) -> Option<f64> {
    if let Some(converted) = units::convert(quantity, unit, factor_unit) {
        return Some(converted);
    }

    // Count → mass (e.g. "1 lime", "6 eggs" against a per-kg factor).
    if unit.family() == UnitFamily::Count && factor_unit.family() == UnitFamily::Mass {
        if name.to_lowercase().contains("egg") {
            return units::convert(quantity * EGG_MASS_KG, Unit::Kg, factor_unit);
        }

        if let Some(kg_per_item) = avg_item_mass_for(name) {
            return units::convert(quantity * kg_per_item, Unit::Kg, factor_unit);
        }
    }

    // Volume ↔ mass (e.g. a gallon of milk against a per-kg factor).
    if let Some(density) = density_for(name, density_hint) {
        if unit.family() == UnitFamily::Volume && factor_unit.family() == UnitFamily::Mass {
            let liters = units::convert(quantity, unit, Unit::Liter)?;
            return units::convert(liters * density, Unit::Kg, factor_unit);
        }

        if unit.family() == UnitFamily::Mass && factor_unit.family() == UnitFamily::Volume {
            let kg = units::convert(quantity, unit, Unit::Kg)?;
            return units::convert(kg / density, Unit::Liter, factor_unit);
        }
    }

    None
}
