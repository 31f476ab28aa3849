//! Runtime services and shared state for footprint-bot.

use tracing::instrument;

use crate::{
    base::{config::Config, types::Void},
    server,
    service::{emissions::EmissionsClient, llm::LlmClient, messaging::MessagingClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the messaging, emissions, and LLM clients plus the
/// configuration. It is designed to be trivially cloneable, allowing it to be
/// passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The messaging client instance.
    pub messaging: MessagingClient,
    /// The emissions client instance.
    pub emissions: EmissionsClient,
    /// The LLM client instance.
    pub llm: LlmClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub fn new(config: Config) -> Self {
        // Initialize the messaging client.
        let messaging = MessagingClient::twilio(&config);

        // Initialize the emissions client.
        let emissions = EmissionsClient::climatiq(&config);

        // Initialize the LLM client (disabled when no key is configured).
        let llm = LlmClient::from_config(&config);

        Self {
            config,
            messaging,
            emissions,
            llm,
        }
    }

    /// Serve the inbound webhook until shutdown.
    pub async fn start(&self) -> Void {
        server::serve(self.clone()).await
    }
}
