//! Shared building blocks for Chat Insights.
//!
//! Holds the conversation data model, the error taxonomy, CLI settings,
//! timestamp/field parsing, time-bucket keys, statistics helpers and the
//! number formatting used by the dashboards and the report.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;
pub mod time_utils;
