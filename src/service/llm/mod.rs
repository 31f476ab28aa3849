pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tracing::info;

use crate::base::{
    config::Config,
    types::{MediaAttachment, ModelEstimate, NormalizedItem, Res, ShoppingItem},
};

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the language-model work footprint-bot leans on:
/// reading receipts, canonicalizing item names, producing last-resort
/// estimates, and a one-line coaching message. Every call site treats a
/// failure as a degraded path, never a fatal one.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Extract shopping items from a receipt photo.
    ///
    /// Returns an empty list when the image holds no recognizable items.
    async fn parse_receipt(&self, attachment: &MediaAttachment) -> Res<Vec<ShoppingItem>>;

    /// Canonicalize parsed items for emission-factor search.
    ///
    /// The result preserves input order and always covers every input item;
    /// items the model cannot improve pass through unchanged.
    async fn normalize_items(&self, items: &[ShoppingItem]) -> Res<Vec<NormalizedItem>>;

    /// Produce a last-resort numeric estimate when no factor matches.
    ///
    /// `Ok(None)` means the model declined to guess.
    async fn fallback_estimate(&self, item: &NormalizedItem) -> Res<Option<ModelEstimate>>;

    /// One short closing encouragement for the reply.
    async fn encouragement(&self, total_kg_co2e: f64, item_names: &[String]) -> Res<Option<String>>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }

    /// Pick the implementation based on configuration: OpenAI when a key is
    /// present, otherwise a disabled client that degrades every call.
    pub fn from_config(config: &Config) -> Self {
        if config.openai_api_key.is_some() {
            Self::openai(config)
        } else {
            info!("No OpenAI API key configured; receipt photos, normalization, and coaching are disabled.");
            Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self { inner: Arc::new(DisabledLlmClient) }
    }
}

/// No-op LLM client used when no API key is configured.
///
/// The bot still works from typed text and factor lookups alone.
struct DisabledLlmClient;

#[async_trait]
impl GenericLlmClient for DisabledLlmClient {
    async fn parse_receipt(&self, _attachment: &MediaAttachment) -> Res<Vec<ShoppingItem>> {
        Ok(Vec::new())
    }

    async fn normalize_items(&self, items: &[ShoppingItem]) -> Res<Vec<NormalizedItem>> {
        Ok(items.iter().cloned().map(NormalizedItem::passthrough).collect())
    }

    async fn fallback_estimate(&self, _item: &NormalizedItem) -> Res<Option<ModelEstimate>> {
        Ok(None)
    }

    async fn encouragement(&self, _total_kg_co2e: f64, _item_names: &[String]) -> Res<Option<String>> {
        Ok(None)
    }
}
