//! OpenAI implementation of the LLM client.
//!
//! All calls are strict-JSON (or short-text) chat completions. Receipt photos
//! travel as base64 data URLs to the vision model. Responses are validated
//! hard: anything that does not match the expected shape is dropped rather
//! than guessed at, because every caller has a non-LLM fallback.

use std::{sync::Arc, time::Duration};

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs, ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs, ResponseFormat,
    },
};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::base::{
    config::Config,
    types::{MediaAttachment, ModelEstimate, NormalizedItem, Res, ShoppingItem, round2},
    units::Unit,
};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

/// Wire shape of the receipt and normalizer responses.
#[derive(Debug, Deserialize)]
struct ItemsEnvelope<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// One raw item as the model returns it; validated before use.
#[derive(Debug, Deserialize)]
struct RawReceiptItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    qty: f64,
    #[serde(default)]
    unit: Option<String>,
}

/// One normalized item as the model returns it.
#[derive(Debug, Deserialize)]
struct RawNormalizedItem {
    #[serde(default)]
    canonical: String,
    #[serde(default)]
    queries: Vec<String>,
    #[serde(default)]
    density_kg_per_l: Option<f64>,
}

/// Wire shape of the fallback-estimate response.
#[derive(Debug, Deserialize)]
struct RawFallbackEstimate {
    #[serde(default)]
    kg_co2e: f64,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    confidence: f64,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone().unwrap_or_default());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Helper function to make OpenAI API calls with retry logic and timeout handling.
    async fn call_openai_api(&self, request: CreateChatCompletionRequest) -> Res<String> {
        const MAX_RETRIES: u32 = 3;
        const TIMEOUT: u64 = 60;
        const RETRY_DELAY_MS: u64 = 1000;

        let mut retries = 0;

        loop {
            let result = timeout(Duration::from_secs(TIMEOUT), self.client.chat().create(request.clone())).await;

            match result {
                Ok(Ok(response)) => {
                    info!("OpenAI API call succeeded after {} attempts", retries + 1);

                    let content = response.choices.into_iter().next().and_then(|choice| choice.message.content);

                    return content.ok_or_else(|| anyhow::anyhow!("OpenAI response contained no message content."));
                }
                Ok(Err(err)) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call failed after {MAX_RETRIES} retries: {err}"));
                    }
                    retries += 1;
                    warn!("OpenAI API call failed, retrying {retries}/{MAX_RETRIES}: {err}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
                Err(_) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call timed out after {MAX_RETRIES} attempts"));
                    }
                    retries += 1;
                    warn!("OpenAI API call timed out, retrying {retries}/{MAX_RETRIES}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Build a strict-JSON request with a system directive and user message.
    fn build_json_request(&self, directive: &str, user: Vec<ChatCompletionRequestMessage>, model: &str, temperature: f32) -> Res<CreateChatCompletionRequest> {
        let mut messages = vec![ChatCompletionRequestSystemMessageArgs::default().content(directive).build()?.into()];
        messages.extend(user);

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .temperature(temperature)
            .max_completion_tokens(self.config.openai_max_tokens)
            .response_format(ResponseFormat::JsonObject)
            .messages(messages)
            .build()?;

        Ok(request)
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::parse_receipt", skip_all, fields(bytes = attachment.bytes.len(), mime = %attachment.mime))]
    async fn parse_receipt(&self, attachment: &MediaAttachment) -> Res<Vec<ShoppingItem>> {
        let b64 = base64::engine::general_purpose::STANDARD.encode(&attachment.bytes);
        let data_url = format!("data:{};base64,{b64}", attachment.mime);

        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(vec![
                ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text("Extract the items list from this receipt image as valid JSON only.")
                    .build()?
                    .into(),
                ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(ImageUrlArgs::default().url(data_url).detail(ImageDetail::Auto).build()?)
                    .build()?
                    .into(),
            ])
            .build()?
            .into();

        let request = self.build_json_request(
            &self.config.receipt_agent_directive,
            vec![user],
            &self.config.openai_vision_model,
            self.config.openai_vision_temperature,
        )?;

        let content = self.call_openai_api(request).await?;
        let envelope: ItemsEnvelope<RawReceiptItem> = serde_json::from_str(&content)?;

        let items = envelope.items.into_iter().filter_map(validate_receipt_item).collect::<Vec<_>>();

        info!("Receipt parse produced {} items.", items.len());

        Ok(items)
    }

    #[instrument(name = "OpenAiLlmClient::normalize_items", skip_all, fields(count = items.len()))]
    async fn normalize_items(&self, items: &[ShoppingItem]) -> Res<Vec<NormalizedItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(serde_json::to_string(&serde_json::json!({ "items": items }))?)
            .build()?
            .into();

        let request = self.build_json_request(
            &self.config.normalizer_agent_directive,
            vec![user],
            &self.config.openai_text_model,
            self.config.openai_normalizer_temperature,
        )?;

        let content = self.call_openai_api(request).await?;

        // A malformed response degrades to identity normalization.
        let Ok(envelope) = serde_json::from_str::<ItemsEnvelope<RawNormalizedItem>>(&content) else {
            warn!("Normalizer returned malformed JSON; passing items through.");
            return Ok(items.iter().cloned().map(NormalizedItem::passthrough).collect());
        };

        let normalized = items
            .iter()
            .zip(envelope.items.into_iter().map(Some).chain(std::iter::repeat_with(|| None)))
            .map(|(item, raw)| merge_normalized(item.clone(), raw))
            .collect();

        Ok(normalized)
    }

    #[instrument(name = "OpenAiLlmClient::fallback_estimate", skip_all, fields(name = %item.canonical))]
    async fn fallback_estimate(&self, item: &NormalizedItem) -> Res<Option<ModelEstimate>> {
        let ask = serde_json::json!({
            "item": {
                "canonical": item.canonical,
                "qty": item.item.quantity,
                "unit": item.item.unit,
            },
        });

        let user = ChatCompletionRequestUserMessageArgs::default().content(serde_json::to_string(&ask)?).build()?.into();

        let request = self.build_json_request(
            &self.config.fallback_agent_directive,
            vec![user],
            &self.config.openai_text_model,
            self.config.openai_normalizer_temperature,
        )?;

        let content = self.call_openai_api(request).await?;
        let raw: RawFallbackEstimate = serde_json::from_str(&content)?;

        if raw.kg_co2e <= 0.0 {
            return Ok(None);
        }

        Ok(Some(ModelEstimate {
            kg_co2e: raw.kg_co2e,
            explanation: if raw.explanation.is_empty() { "AI estimate".to_string() } else { raw.explanation },
            confidence: raw.confidence,
        }))
    }

    #[instrument(name = "OpenAiLlmClient::encouragement", skip_all)]
    async fn encouragement(&self, total_kg_co2e: f64, item_names: &[String]) -> Res<Option<String>> {
        let names = coach_names(item_names);
        let message = format!("Receipt total {} kg. Items: {names}.", round2(total_kg_co2e));

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default().content(self.config.coach_agent_directive.as_str()).build()?.into(),
            ChatCompletionRequestUserMessageArgs::default().content(message).build()?.into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.openai_text_model)
            .temperature(self.config.openai_coach_temperature)
            .max_completion_tokens(40_u32)
            .messages(messages)
            .build()?;

        let content = self.call_openai_api(request).await?;
        let content = content.trim();

        Ok(if content.is_empty() { None } else { Some(content.to_string()) })
    }
}

/// Join item names for the coach prompt, capped at 180 characters.
///
/// The cap counts characters, not bytes, so multibyte names never split.
fn coach_names(item_names: &[String]) -> String {
    item_names.join(", ").chars().take(180).collect()
}

/// Validate one model-returned receipt item; drop anything suspect.
fn validate_receipt_item(raw: RawReceiptItem) -> Option<ShoppingItem> {
    let name = raw.name.trim().to_lowercase();
    let unit = Unit::parse(raw.unit.as_deref()?)?;

    if name.len() < 2 || raw.qty <= 0.0 {
        return None;
    }

    Some(ShoppingItem {
        name,
        quantity: raw.qty,
        unit,
    })
}

/// Merge a model normalization onto its source item, guaranteeing fallbacks.
fn merge_normalized(item: ShoppingItem, raw: Option<RawNormalizedItem>) -> NormalizedItem {
    let Some(raw) = raw else {
        return NormalizedItem::passthrough(item);
    };

    let canonical = {
        let c = raw.canonical.trim().to_lowercase();
        if c.is_empty() { item.name.clone() } else { c }
    };

    let mut queries: Vec<String> = raw.queries.into_iter().map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty()).take(3).collect();

    if queries.is_empty() {
        queries.push(canonical.clone());
    }

    NormalizedItem {
        item,
        canonical,
        queries,
        density_kg_per_l: raw.density_kg_per_l.filter(|d| *d > 0.0),
    }
}
