//! Runtime orchestration layer for Chat Insights.
//!
//! Drives the loader, the analyses and the dashboard renderers in sequence
//! and writes the final Markdown report.

pub mod report;

pub use insights_core as core;
pub use insights_data as data;
