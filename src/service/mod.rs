//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by footprint-bot:
//! - Messaging providers (e.g., Twilio SMS/MMS)
//! - Emission-factor databases (e.g., Climatiq)
//! - LLM services (e.g., OpenAI)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod emissions;
pub mod llm;
pub mod messaging;
