pub mod climatiq;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::{
    types::{Estimate, Intensity, NormalizedItem, Res},
    units::{Unit, UnitFamily},
};

// Traits.

/// Generic emission-factor database trait that clients must implement.
///
/// This trait defines the core functionality for resolving free-text grocery
/// items into emission factors and CO2e estimates. Implementing this trait
/// allows different emissions databases to be used with footprint-bot.
#[async_trait]
pub trait GenericEmissionsClient: Send + Sync + 'static {
    /// Find the best emission factor for a free-text query.
    ///
    /// Only factors denominated in weight, volume, or count are considered;
    /// when a family is given, factors of that family are preferred.
    /// `Ok(None)` means the database has nothing usable for the query.
    async fn search_factor(&self, query: &str, family: Option<UnitFamily>) -> Res<Option<crate::base::types::EmissionFactor>>;

    /// Estimate kg CO2e for one normalized item quantity.
    ///
    /// The quantity is converted into the factor's unit first, bridging
    /// across unit families through product data where necessary.
    /// `Ok(None)` means no factor matched or the units were incompatible;
    /// the item should be skipped rather than failing the basket.
    async fn estimate(&self, item: &NormalizedItem) -> Res<Option<Estimate>>;

    /// Emission intensity of a product: kg CO2e per one factor unit.
    ///
    /// Used for substitution math in suggestions.
    async fn intensity(&self, name: &str, preferred_unit: Option<Unit>) -> Res<Option<Intensity>>;
}

// Structs.

/// Emissions client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct EmissionsClient {
    inner: Arc<dyn GenericEmissionsClient>,
}

impl Deref for EmissionsClient {
    type Target = dyn GenericEmissionsClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl EmissionsClient {
    pub fn new(inner: Arc<dyn GenericEmissionsClient>) -> Self {
        Self { inner }
    }
}
