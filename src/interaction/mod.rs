//! The request pipeline for footprint-bot.
//!
//! This module turns one inbound message into one reply:
//! - Parsing typed lists and receipt photos into items
//! - Canonicalizing item names for factor search
//! - Computing the basket footprint
//! - Building substitution suggestions and the reply text

pub mod calculator;
pub mod inbound;
pub mod mapper;
pub mod parser;
pub mod suggestions;
