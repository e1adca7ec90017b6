//! Dashboard rendering layer for Chat Insights.
//!
//! Each dashboard is a 2×2 grid of [`ratatui`] widgets drawn into an
//! off-screen buffer and written to the output directory as plain text.

pub mod canvas;
pub mod correlation_view;
pub mod dashboard_view;
pub mod question_view;

pub use insights_core as core;
