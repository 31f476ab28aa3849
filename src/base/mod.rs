//! Core components, types, and utilities for footprint-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Agent directives for LLM interactions.
//! - Common types, result handling, and unit conversion.

pub mod config;
pub mod prompts;
pub mod types;
pub mod units;
