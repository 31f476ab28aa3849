//! Library root for `footprint-bot`.
//!
//! Footprint-bot is a carbon-footprint assistant for SMS/MMS designed to:
//! - Parse shopping lists from typed text or receipt photos
//! - Look up per-item emission factors in an external emissions database
//! - Compute an itemized CO2e total for the basket
//! - Suggest lower-carbon substitutions with quantified savings
//!
//! The bot integrates with Twilio for messaging, Climatiq for emission
//! factors, and OpenAI for receipt vision and coaching. The architecture is
//! built around extensible traits that allow for different implementations
//! of each service.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod server;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the footprint-bot runtime:
/// - Creates the runtime context with messaging, emissions, and LLM clients
/// - Starts the webhook server for processing inbound messages
pub async fn start(config: Config) -> Void {
    info!("Starting footprint-bot ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config);

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
