//! Report generator for the Chat Insights runtime.
//!
//! [`ReportGenerator`] runs every pipeline step in order against one loaded
//! table: load, the placeholder hourly/growth/topic figures, the
//! comprehensive dashboard, the question-level dashboard and the correlation
//! dashboard. It then fills the Markdown report template and writes it next
//! to the dashboards in the output directory.
//!
//! A failed load is logged and replaced by [`BasicStats::unavailable`]; every
//! later step that needs the table then fails with [`InsightsError::NoData`],
//! and that error propagates out of [`ReportGenerator::generate_final_report`].
//! A load that succeeds with no rows inside the window still writes every
//! dashboard and a report of zero counts.

use std::path::{Path, PathBuf};

use chrono::Local;
use chrono_tz::Tz;
use insights_core::error::{InsightsError, Result};
use insights_core::formatting::{format_count, percentage};
use insights_core::models::{BasicStats, ConversationTable};
use insights_core::time_utils::AnalysisWindow;
use insights_data::analysis::{analyze_conversations, DashboardStats};
use insights_data::correlation::{CorrelationAnalysis, CorrelationEngine};
use insights_data::questions::{QuestionLevelAnalysis, QuestionLevelAnalyzer, QuestionSummary};
use insights_ui::{correlation_view, dashboard_view, question_view};

/// Fixed name of the Markdown report in the output directory.
pub const REPORT_FILE_NAME: &str = "portfolio_analysis_report_en.md";

// ── Placeholder figures ───────────────────────────────────────────────────────

/// Stand-in hourly, growth and topic figures.
///
/// No analysis backs these values; each is logged as a default when used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceholderFigures {
    pub optimal_hour: u32,
    pub hourly_efficiency: f64,
    pub average_growth: f64,
    pub growth_rate: f64,
    pub top_topic: &'static str,
    pub top_topic_count: usize,
}

impl Default for PlaceholderFigures {
    fn default() -> Self {
        Self {
            optimal_hour: 15,
            hourly_efficiency: 0.8,
            average_growth: 0.5,
            growth_rate: 0.1,
            top_topic: "General",
            top_topic_count: 100,
        }
    }
}

// ── Report contents ───────────────────────────────────────────────────────────

/// Every scalar interpolated into the Markdown template.
#[derive(Debug, Clone)]
pub struct ReportContents {
    pub basic_stats: BasicStats,
    pub placeholders: PlaceholderFigures,
    /// Topics shown on the comprehensive dashboard.
    pub topic_count: usize,
    pub peak_efficiency: f64,
    pub questions: QuestionSummary,
    /// Learning-related share of all messages, in percent.
    pub learning_ratio: f64,
    pub correlation_summary: String,
    /// `(feature display name, formatted mean |r|)`.
    pub average_correlations: Vec<(String, String)>,
    pub strength_rows: Vec<(&'static str, usize)>,
    pub generated_files: Vec<String>,
    pub generated_at: String,
}

/// Fill the Markdown template.
pub fn render_report(c: &ReportContents) -> String {
    let stats = &c.basic_stats;
    let window = AnalysisWindow::fixed();
    let mut out = String::new();

    out.push_str("# Personalized Learning Pattern Analysis Report\n\n");

    out.push_str("## Analysis Overview\n");
    out.push_str(&format!(
        "- **Total Messages**: {}\n",
        format_count(stats.total_messages)
    ));
    out.push_str(&format!(
        "- **Analysis Period**: {} (Filtered from {} ~ {})\n",
        window.label(),
        stats.start_date,
        stats.end_date
    ));
    out.push_str(&format!(
        "- **Average Word Count**: {:.3}\n",
        stats.avg_word_count
    ));
    out.push_str(&format!(
        "- **Average Question Depth**: {:.3}\n",
        stats.avg_question_depth
    ));
    out.push_str(&format!(
        "- **Learning Conversations**: {} ({:.1}%)\n\n",
        format_count(c.questions.learning_count),
        c.learning_ratio
    ));

    let p = &c.placeholders;
    out.push_str("## Key Insights\n");
    out.push_str(&format!("- Optimal Learning Time: {}:00\n", p.optimal_hour));
    out.push_str(&format!("- Average Growth Rate: {:.3}\n", p.average_growth));
    out.push_str(&format!("- Most Discussed Topic: {}\n", p.top_topic));
    out.push_str(&format!("- Topics Analyzed: {}\n", c.topic_count));
    out.push_str(&format!(
        "- Peak Hourly Efficiency: {:.3}\n",
        c.peak_efficiency
    ));
    out.push_str(&format!(
        "- Daily Question Depth: {:.2}\n",
        c.questions.daily_average
    ));
    out.push_str(&format!(
        "- Weekly Question Depth: {:.2}\n\n",
        c.questions.weekly_average
    ));

    out.push_str("## Correlation Insights\n");
    out.push_str(&format!("- Strongest Pair: {}\n", c.correlation_summary));
    for (name, value) in &c.average_correlations {
        out.push_str(&format!("- Average |r| for {}: {}\n", name, value));
    }
    for (label, n) in &c.strength_rows {
        out.push_str(&format!("- {}: {}\n", label, n));
    }
    out.push('\n');

    out.push_str("## Generated Files\n");
    for name in &c.generated_files {
        out.push_str(&format!("- {}\n", name));
    }

    out.push_str("\n---\n");
    out.push_str(&format!("*Generated: {}*\n", c.generated_at));
    out
}

// ── ReportGenerator ───────────────────────────────────────────────────────────

/// Sequential driver over the whole pipeline.
///
/// # Example
/// ```no_run
/// use std::path::PathBuf;
/// use insights_runtime::report::ReportGenerator;
///
/// let mut generator = ReportGenerator::new(
///     PathBuf::from("conversations_parsed.jsonl"),
///     PathBuf::from("."),
///     chrono_tz::UTC,
/// );
/// let report = generator.generate_final_report()?;
/// println!("report written to {}", report.display());
/// # Ok::<(), insights_core::error::InsightsError>(())
/// ```
pub struct ReportGenerator {
    /// Conversation file or directory to load.
    data_path: PathBuf,
    /// Directory receiving dashboards and the report.
    output_dir: PathBuf,
    timezone: Tz,
    /// Enriched table; `None` until a load succeeds.
    table: Option<ConversationTable>,
}

impl ReportGenerator {
    /// Create a new generator.
    ///
    /// # Parameters
    /// - `data_path`  – conversation file or directory.
    /// - `output_dir` – where the dashboards and report are written.
    /// - `timezone`   – zone for date/hour derivation.
    pub fn new(data_path: PathBuf, output_dir: PathBuf, timezone: Tz) -> Self {
        Self {
            data_path,
            output_dir,
            timezone,
            table: None,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Loaded table, or [`InsightsError::NoData`] before a successful load.
    pub fn table(&self) -> Result<&ConversationTable> {
        self.table.as_ref().ok_or(InsightsError::NoData)
    }

    // ── Steps ─────────────────────────────────────────────────────────────

    /// Load and enrich the input. A failure is logged and yields
    /// [`BasicStats::unavailable`].
    pub fn run_data_loader(&mut self) -> BasicStats {
        tracing::info!(path = %self.data_path.display(), "running data loader");
        match analyze_conversations(&self.data_path, self.timezone) {
            Ok(result) => {
                tracing::info!(
                    messages = result.basic_stats.total_messages,
                    start = %result.basic_stats.start_date,
                    end = %result.basic_stats.end_date,
                    "data loaded"
                );
                self.table = Some(result.table);
                result.basic_stats
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load data");
                self.table = None;
                BasicStats::unavailable()
            }
        }
    }

    /// `(optimal hour, efficiency)` stand-in.
    pub fn run_hourly_analysis(&self) -> (u32, f64) {
        let p = PlaceholderFigures::default();
        tracing::info!(
            hour = p.optimal_hour,
            efficiency = p.hourly_efficiency,
            "hourly analysis: using default values"
        );
        (p.optimal_hour, p.hourly_efficiency)
    }

    /// `(average growth, growth rate)` stand-in.
    pub fn run_growth_analysis(&self) -> (f64, f64) {
        let p = PlaceholderFigures::default();
        tracing::info!(
            growth = p.average_growth,
            rate = p.growth_rate,
            "growth analysis: using default values"
        );
        (p.average_growth, p.growth_rate)
    }

    /// `(top topic, count)` stand-in.
    pub fn run_topic_analysis(&self) -> (&'static str, usize) {
        let p = PlaceholderFigures::default();
        tracing::info!(
            topic = p.top_topic,
            count = p.top_topic_count,
            "topic analysis: using default values"
        );
        (p.top_topic, p.top_topic_count)
    }

    /// Write the comprehensive dashboard.
    pub fn run_dashboard_creation(&self) -> Result<DashboardStats> {
        let stats = DashboardStats::compute(self.table()?)?;
        let path = dashboard_view::write_learning_dashboard(&stats, &self.output_dir)?;
        tracing::info!(
            topics = stats.topic_count(),
            path = %path.display(),
            "dashboard created"
        );
        Ok(stats)
    }

    /// Write the question-level dashboard.
    pub fn run_question_level_analysis(&self) -> Result<QuestionLevelAnalysis> {
        let analysis = QuestionLevelAnalyzer::analyze(self.table()?)?;
        let path = question_view::write_question_dashboard(&analysis, &self.output_dir)?;
        tracing::info!(
            learning = analysis.learning_count,
            path = %path.display(),
            "question level analysis complete"
        );
        Ok(analysis)
    }

    /// Write the correlation dashboard.
    pub fn run_correlation_analysis(&self) -> Result<CorrelationAnalysis> {
        let analysis = CorrelationEngine::analyze(self.table()?)?;
        let path = correlation_view::write_correlation_dashboard(&analysis, &self.output_dir)?;
        tracing::info!(
            summary = %analysis.insights.strongest_summary(),
            path = %path.display(),
            "correlation analysis complete"
        );
        Ok(analysis)
    }

    // ── Report ────────────────────────────────────────────────────────────

    /// Run every step and write the Markdown report.
    ///
    /// Returns the report path.
    pub fn generate_final_report(&mut self) -> Result<PathBuf> {
        tracing::info!("generating final report");

        let basic_stats = self.run_data_loader();
        let (optimal_hour, hourly_efficiency) = self.run_hourly_analysis();
        let (average_growth, growth_rate) = self.run_growth_analysis();
        let (top_topic, top_topic_count) = self.run_topic_analysis();
        let dashboard = self.run_dashboard_creation()?;
        let questions = self.run_question_level_analysis()?;
        let correlation = self.run_correlation_analysis()?;

        let insights = &correlation.insights;
        let contents = ReportContents {
            learning_ratio: percentage(
                questions.learning_count as f64,
                basic_stats.total_messages as f64,
                1,
            ),
            basic_stats,
            placeholders: PlaceholderFigures {
                optimal_hour,
                hourly_efficiency,
                average_growth,
                growth_rate,
                top_topic,
                top_topic_count,
            },
            topic_count: dashboard.topic_count(),
            peak_efficiency: dashboard.peak_hourly_efficiency().unwrap_or(0.0),
            questions: questions.summary(),
            correlation_summary: insights.strongest_summary(),
            average_correlations: insights
                .average_correlations
                .iter()
                .map(|(f, v)| {
                    let value = v.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v));
                    (f.display_name().to_string(), value)
                })
                .collect(),
            strength_rows: insights.distribution.rows().to_vec(),
            generated_files: vec![
                dashboard_view::FILE_NAME.to_string(),
                question_view::FILE_NAME.to_string(),
                correlation_view::FILE_NAME.to_string(),
            ],
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        let path = self.output_dir.join(REPORT_FILE_NAME);
        std::fs::create_dir_all(&self.output_dir).map_err(|source| InsightsError::FileWrite {
            path: self.output_dir.clone(),
            source,
        })?;
        std::fs::write(&path, render_report(&contents)).map_err(|source| InsightsError::FileWrite {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), "final report generated");
        Ok(path)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    const CONTENTS: [&str; 6] = [
        "What is AI?",
        "I love python coding",
        "Just chatting",
        "How do I train a neural network model?",
        "explain pandas dataframe",
        "why does my loss diverge?",
    ];

    /// JSONL file with `n` rows spread over several days in May 2025.
    fn write_input(dir: &Path, n: usize) -> PathBuf {
        let path = dir.join("conversations.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        for i in 0..n {
            let row = json!({
                "create_time": 1_746_093_600 + i as i64 * 5 * 3600,
                "content": CONTENTS[i % CONTENTS.len()],
            });
            writeln!(file, "{}", row).unwrap();
        }
        path
    }

    #[test]
    fn test_generate_final_report_writes_everything() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), 30);
        let out = tmp.path().join("out");

        let mut generator = ReportGenerator::new(input, out.clone(), chrono_tz::UTC);
        let report = generator.generate_final_report().unwrap();

        assert_eq!(report, out.join(REPORT_FILE_NAME));
        let body = std::fs::read_to_string(&report).unwrap();
        assert!(body.contains("- **Total Messages**: 30"));
        assert!(body.contains("Filtered from 2025-05-01 ~"));
        assert!(body.contains("- Optimal Learning Time: 15:00"));
        assert!(body.contains("- Average Growth Rate: 0.500"));
        assert!(body.contains("- Most Discussed Topic: General"));
        assert!(body.contains("Average Word Count"));
        assert!(body.contains("Average Question Depth"));
        assert!(body.contains("Strongest Pair:"));

        for name in [
            dashboard_view::FILE_NAME,
            question_view::FILE_NAME,
            correlation_view::FILE_NAME,
        ] {
            assert!(out.join(name).exists(), "missing {}", name);
            assert!(body.contains(name));
        }
    }

    #[test]
    fn test_load_failure_uses_unavailable_stats() {
        let tmp = TempDir::new().unwrap();
        let mut generator = ReportGenerator::new(
            tmp.path().join("missing.jsonl"),
            tmp.path().to_path_buf(),
            chrono_tz::UTC,
        );
        let stats = generator.run_data_loader();
        assert_eq!(stats, BasicStats::unavailable());
        assert!(matches!(generator.table(), Err(InsightsError::NoData)));
    }

    #[test]
    fn test_report_fails_with_no_data_after_load_failure() {
        let tmp = TempDir::new().unwrap();
        let mut generator = ReportGenerator::new(
            tmp.path().join("missing.jsonl"),
            tmp.path().to_path_buf(),
            chrono_tz::UTC,
        );
        let err = generator.generate_final_report().unwrap_err();
        assert!(matches!(err, InsightsError::NoData));
        assert!(!tmp.path().join(REPORT_FILE_NAME).exists());
    }

    #[test]
    fn test_report_with_no_rows_in_window_is_degenerate() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("old.jsonl");
        // 2024-01-01T00:00:00Z, before the analysis window.
        let row = json!({"create_time": 1_704_067_200, "content": "What is AI?"});
        std::fs::write(&input, format!("{}\n", row)).unwrap();

        let mut generator = ReportGenerator::new(input, tmp.path().to_path_buf(), chrono_tz::UTC);
        let report = generator.generate_final_report().unwrap();
        assert!(generator.table().unwrap().is_empty());

        let body = std::fs::read_to_string(report).unwrap();
        assert!(body.contains("- **Total Messages**: 0"));
        assert!(body.contains("- **Learning Conversations**: 0 (0.0%)"));
        assert!(body.contains("- Topics Analyzed: 0"));
        assert!(body.contains("No defined correlation between features"));

        let dashboard = std::fs::read_to_string(tmp.path().join(dashboard_view::FILE_NAME)).unwrap();
        assert!(dashboard.contains(insights_ui::canvas::NO_DATA));
        assert!(tmp.path().join(question_view::FILE_NAME).exists());
        assert!(tmp.path().join(correlation_view::FILE_NAME).exists());
    }

    #[test]
    fn test_placeholder_steps() {
        let generator = ReportGenerator::new(PathBuf::new(), PathBuf::new(), chrono_tz::UTC);
        assert_eq!(generator.run_hourly_analysis(), (15, 0.8));
        assert_eq!(generator.run_growth_analysis(), (0.5, 0.1));
        assert_eq!(generator.run_topic_analysis(), ("General", 100));
    }

    #[test]
    fn test_single_steps_after_load() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), 12);
        let mut generator = ReportGenerator::new(input, tmp.path().to_path_buf(), chrono_tz::UTC);
        assert_eq!(generator.run_data_loader().total_messages, 12);

        let questions = generator.run_question_level_analysis().unwrap();
        assert!(questions.learning_count > 0);
        assert!(tmp.path().join(question_view::FILE_NAME).exists());
        assert!(!tmp.path().join(dashboard_view::FILE_NAME).exists());
    }

    #[test]
    fn test_render_report_labels() {
        let contents = ReportContents {
            basic_stats: BasicStats {
                total_messages: 9543,
                start_date: "2025-04-01".to_string(),
                end_date: "2025-08-31".to_string(),
                avg_word_count: 42.5,
                avg_question_depth: 0.25,
            },
            placeholders: PlaceholderFigures::default(),
            topic_count: 8,
            peak_efficiency: 3.25,
            questions: QuestionSummary {
                learning_count: 4000,
                daily_average: 0.5,
                weekly_average: 0.45,
            },
            learning_ratio: 41.9,
            correlation_summary: "No defined correlation between features".to_string(),
            average_correlations: vec![("Word Count".to_string(), "0.123".to_string())],
            strength_rows: vec![("Weak (0-0.3)", 3)],
            generated_files: vec!["a.txt".to_string()],
            generated_at: "2025-09-01 12:00:00".to_string(),
        };
        let body = render_report(&contents);
        assert!(body.contains("- **Total Messages**: 9,543"));
        assert!(body.contains("- **Average Word Count**: 42.500"));
        assert!(body.contains("- **Average Question Depth**: 0.250"));
        assert!(body.contains("- **Learning Conversations**: 4,000 (41.9%)"));
        assert!(body.contains("- Daily Question Depth: 0.50"));
        assert!(body.contains("- Weekly Question Depth: 0.45"));
        assert!(body.contains("- Average |r| for Word Count: 0.123"));
        assert!(body.contains("- Weak (0-0.3): 3"));
        assert!(body.contains("*Generated: 2025-09-01 12:00:00*"));
    }
}
