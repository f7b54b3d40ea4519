//! Flight Agent Orchestrator
//!
//! A multi-agent core that turns free-text flight questions into
//! user-ready answers:
//! - Classifies each query into one operation intent with extracted slots
//! - Retrieves data through exactly one flight-data API operation
//! - Explains normalized results in plain language
//! - Converts every stage failure into a user-safe message
//!
//! PIPELINE:
//! REQUEST → CLASSIFY → FETCH → EXPLAIN → RESPOND

pub mod agent;
pub mod api;
pub mod audit;
pub mod classifier;
pub mod config;
pub mod error;
pub mod explainer;
pub mod flight_api;
pub mod models;
pub mod query;

// Re-export common types
pub use classifier::{IntentClassifier, RuleClassifier};
pub use error::{FailureKind, FailureReport, QueryFailure};
pub use models::*;
