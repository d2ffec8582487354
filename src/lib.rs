//! Mot du jour - delivery backend for daily personalized SMS messages
//!
//! This library provides the pieces the orchestrator talks to: message
//! deduplication, the append-only delivery log, active recipient selection,
//! the random daily trigger scheduler, and the webhook handlers.

pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod middleware;
pub mod models;
pub mod orchestrator;
pub mod recipients;
pub mod scheduler;
pub mod util;
