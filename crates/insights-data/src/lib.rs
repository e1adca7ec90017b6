//! Data layer for Chat Insights.
//!
//! Responsible for reading conversation logs, deriving per-message features,
//! grouped means and correlations, the question-level analysis and the
//! top-level load → enrich pipeline.

pub mod aggregator;
pub mod analysis;
pub mod correlation;
pub mod enricher;
pub mod questions;
pub mod reader;

pub use insights_core as core;
