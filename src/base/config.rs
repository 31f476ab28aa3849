//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::Res;

/// Default emissions API endpoint.
fn default_climatiq_endpoint() -> String {
    "https://api.climatiq.io".to_string()
}

/// Default emissions data version selector.
fn default_climatiq_data_version() -> String {
    "^3".to_string()
}

/// Default OpenAI vision model for receipt parsing.
fn default_openai_vision_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default OpenAI text model for normalization, fallback estimates, and coaching.
fn default_openai_text_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default sampling temperature for the receipt-vision agent.
fn default_openai_vision_temperature() -> f32 {
    0.1
}

/// Default sampling temperature for the normalizer and fallback agents.
fn default_openai_normalizer_temperature() -> f32 {
    0.2
}

/// Default sampling temperature for the eco-coach agent.
fn default_openai_coach_temperature() -> f32 {
    0.5
}

/// Default max output tokens for OpenAI calls.
fn default_openai_max_tokens() -> u32 {
    700
}

/// Default system directive for the receipt-vision agent.
fn default_receipt_agent_directive() -> String {
    prompts::RECEIPT_AGENT_SYSTEM_DIRECTIVE.to_string()
}

/// Default system directive for the item-normalizer agent.
fn default_normalizer_agent_directive() -> String {
    prompts::NORMALIZER_AGENT_SYSTEM_DIRECTIVE.to_string()
}

/// Default system directive for the fallback-estimate agent.
fn default_fallback_agent_directive() -> String {
    prompts::FALLBACK_AGENT_SYSTEM_DIRECTIVE.to_string()
}

/// Default system directive for the eco-coach agent.
fn default_coach_agent_directive() -> String {
    prompts::COACH_AGENT_SYSTEM_DIRECTIVE.to_string()
}

/// Default webhook bind address.
fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// Configuration for the footprint-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The shared configuration values.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The configuration values, loaded once and shared behind [`Config`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Emissions database API key (`CLIMATIQ_API_KEY`).
    pub climatiq_api_key: String,
    /// Emissions database endpoint (`CLIMATIQ_ENDPOINT`). Overridable for tests.
    #[serde(default = "default_climatiq_endpoint")]
    pub climatiq_endpoint: String,
    /// Emissions data version selector (`CLIMATIQ_DATA_VERSION`).
    #[serde(default = "default_climatiq_data_version")]
    pub climatiq_data_version: String,
    /// Optional region filter for factor search (`CLIMATIQ_REGION`).
    /// Regioned searches can hide food factors, so a failed regioned search
    /// is retried without it.
    #[serde(default)]
    pub climatiq_region: Option<String>,
    /// OpenAI API key (`OPENAI_API_KEY`). When absent, receipt photos,
    /// normalization, fallback estimates, and coaching are all disabled and
    /// the bot degrades to text parsing plus factor lookups.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// OpenAI vision model for receipt parsing (`OPENAI_VISION_MODEL`).
    #[serde(default = "default_openai_vision_model")]
    pub openai_vision_model: String,
    /// OpenAI text model for the other agents (`OPENAI_TEXT_MODEL`).
    #[serde(default = "default_openai_text_model")]
    pub openai_text_model: String,
    /// Sampling temperature for the receipt-vision agent (`OPENAI_VISION_TEMPERATURE`).
    /// Value between 0 and 2.
    #[serde(default = "default_openai_vision_temperature")]
    pub openai_vision_temperature: f32,
    /// Sampling temperature for the normalizer and fallback agents
    /// (`OPENAI_NORMALIZER_TEMPERATURE`). Value between 0 and 2.
    #[serde(default = "default_openai_normalizer_temperature")]
    pub openai_normalizer_temperature: f32,
    /// Sampling temperature for the eco-coach agent (`OPENAI_COACH_TEMPERATURE`).
    /// Value between 0 and 2.
    #[serde(default = "default_openai_coach_temperature")]
    pub openai_coach_temperature: f32,
    /// Max output tokens for OpenAI calls (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Optional custom receipt-vision directive to override the default (`RECEIPT_AGENT_DIRECTIVE`).
    #[serde(default = "default_receipt_agent_directive")]
    pub receipt_agent_directive: String,
    /// Optional custom normalizer directive to override the default (`NORMALIZER_AGENT_DIRECTIVE`).
    #[serde(default = "default_normalizer_agent_directive")]
    pub normalizer_agent_directive: String,
    /// Optional custom fallback-estimate directive to override the default (`FALLBACK_AGENT_DIRECTIVE`).
    #[serde(default = "default_fallback_agent_directive")]
    pub fallback_agent_directive: String,
    /// Optional custom eco-coach directive to override the default (`COACH_AGENT_DIRECTIVE`).
    #[serde(default = "default_coach_agent_directive")]
    pub coach_agent_directive: String,
    /// Twilio account SID for authenticated media downloads (`TWILIO_ACCOUNT_SID`).
    #[serde(default)]
    pub twilio_account_sid: Option<String>,
    /// Twilio auth token for authenticated media downloads (`TWILIO_AUTH_TOKEN`).
    #[serde(default)]
    pub twilio_auth_token: Option<String>,
    /// Webhook bind address (`BIND_ADDRESS`).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Config {
    /// Load configuration from the environment and an optional TOML file,
    /// then validate it.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("FOOTPRINT_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        if result.climatiq_api_key.is_empty() {
            return Err(anyhow::anyhow!("Climatiq API key is required (FOOTPRINT_BOT_CLIMATIQ_API_KEY)."));
        }

        for temperature in [result.openai_vision_temperature, result.openai_normalizer_temperature, result.openai_coach_temperature] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(anyhow::anyhow!("OpenAI temperatures must be between 0 and 2."));
            }
        }

        if result.openai_max_tokens < 1 || result.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        Ok(result)
    }
}
