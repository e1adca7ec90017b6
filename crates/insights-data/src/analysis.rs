//! Main analysis pipeline for Chat Insights.
//!
//! Loads a conversation log, fills in the derived feature columns and
//! computes the figures behind the comprehensive learning dashboard.

use std::path::Path;

use chrono::{NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use insights_core::error::Result;
use insights_core::models::{BasicStats, ConversationTable, Feature};
use insights_core::stats::rolling_mean;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::{FeatureAggregator, GroupMean};
use crate::enricher::FeatureEnricher;
use crate::reader::RecordLoader;

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// IANA name of the timezone used for date/hour derivation.
    pub timezone: String,
    pub records_loaded: usize,
    /// Wall-clock seconds spent reading and windowing the input.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent deriving feature columns.
    pub enrich_time_seconds: f64,
}

/// The complete output of [`analyze_conversations`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Windowed, fully enriched table.
    pub table: ConversationTable,
    pub basic_stats: BasicStats,
    pub metadata: AnalysisMetadata,
}

/// Run the load → enrich pipeline.
///
/// 1. Load and window the records via [`RecordLoader`].
/// 2. Derive every missing feature column via [`FeatureEnricher`].
/// 3. Compute [`BasicStats`]; an empty table yields the unavailable stand-in.
pub fn analyze_conversations(path: &Path, timezone: Tz) -> Result<AnalysisResult> {
    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let mut table = RecordLoader::new(timezone).load(path)?;
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Enrich ────────────────────────────────────────────────────────
    let enrich_start = std::time::Instant::now();
    FeatureEnricher::new(timezone).enrich(&mut table);
    let enrich_time = enrich_start.elapsed().as_secs_f64();

    // ── Step 3: Stats ─────────────────────────────────────────────────────────
    let basic_stats = table.basic_stats(&timezone).unwrap_or_else(BasicStats::unavailable);

    debug!(
        "Pipeline: load {:.3}s, enrich {:.3}s",
        load_time, enrich_time
    );

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        timezone: timezone.name().to_string(),
        records_loaded: table.len(),
        load_time_seconds: load_time,
        enrich_time_seconds: enrich_time,
    };

    Ok(AnalysisResult {
        table,
        basic_stats,
        metadata,
    })
}

// ── Comprehensive dashboard figures ───────────────────────────────────────────

/// One day on the growth trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyGrowth {
    pub date: NaiveDate,
    /// Mean complexity on this day.
    pub mean: f64,
    /// Trailing 7-day mean of `mean`; `None` for the first six days.
    pub trend: Option<f64>,
}

/// A labelled position on the growth trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseMarker {
    pub label: &'static str,
    /// Index into [`DashboardStats::daily`].
    pub index: usize,
    pub date: NaiveDate,
}

/// Weekday means of complexity and question depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekdayPattern {
    pub day: Weekday,
    pub complexity: f64,
    pub question_depth: f64,
}

/// Everything the comprehensive dashboard plots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    /// Mean complexity per hour of day.
    pub hourly: Vec<GroupMean<u32>>,
    pub daily: Vec<DailyGrowth>,
    pub phases: Vec<PhaseMarker>,
    /// Most frequent topics, largest first.
    pub topics: Vec<(String, usize)>,
    /// Monday first; weekdays without data read 0.
    pub weekday: [WeekdayPattern; 7],
}

impl DashboardStats {
    pub const TREND_WINDOW: usize = 7;
    pub const TOP_TOPICS: usize = 8;
    /// Hour highlighted on the hourly efficiency panel.
    pub const REFERENCE_HOUR: u32 = 15;
    pub const PHASES: [(&'static str, f64); 2] =
        [("Initial Phase", 0.3), ("Maturity Phase", 0.7)];

    /// Compute the dashboard figures from an enriched table. An empty table
    /// gives empty series and zero-filled weekday patterns.
    pub fn compute(table: &ConversationTable) -> Result<Self> {
        let hourly = FeatureAggregator::by_hour(table, Feature::ComplexityMa);

        let by_date = FeatureAggregator::by_date(table, Feature::ComplexityMa);
        let means: Vec<f64> = by_date.iter().map(|g| g.mean).collect();
        let trend = rolling_mean(&means, Self::TREND_WINDOW);
        let daily: Vec<DailyGrowth> = by_date
            .iter()
            .zip(trend)
            .map(|(g, t)| DailyGrowth {
                date: g.key,
                mean: g.mean,
                trend: t,
            })
            .collect();
        let phases = Self::phase_markers(&daily);

        let mut topics = FeatureAggregator::topic_counts(table);
        topics.truncate(Self::TOP_TOPICS);

        let complexity = FeatureAggregator::by_weekday_filled(table, Feature::ComplexityMa);
        let depth = FeatureAggregator::by_weekday_filled(table, Feature::QuestionDepth);
        let weekday = std::array::from_fn(|i| WeekdayPattern {
            day: complexity[i].0,
            complexity: complexity[i].1,
            question_depth: depth[i].1,
        });

        let stats = Self {
            hourly,
            daily,
            phases,
            topics,
            weekday,
        };
        info!(
            "Dashboard stats: {} topics, peak hourly efficiency {:.2}",
            stats.topic_count(),
            stats.peak_hourly_efficiency().unwrap_or(0.0)
        );
        Ok(stats)
    }

    /// Markers at 30% and 70% of the day range, clamped to the last day.
    fn phase_markers(daily: &[DailyGrowth]) -> Vec<PhaseMarker> {
        let n = daily.len();
        if n == 0 {
            return Vec::new();
        }
        Self::PHASES
            .iter()
            .map(|&(label, frac)| {
                let index = ((n as f64 * frac) as usize).min(n - 1);
                PhaseMarker {
                    label,
                    index,
                    date: daily[index].date,
                }
            })
            .collect()
    }

    /// Highest hourly mean complexity.
    pub fn peak_hourly_efficiency(&self) -> Option<f64> {
        self.hourly.iter().map(|g| g.mean).reduce(f64::max)
    }

    /// Hour with the highest mean complexity; the earliest hour wins ties.
    pub fn peak_hour(&self) -> Option<u32> {
        self.hourly
            .iter()
            .fold(None::<&GroupMean<u32>>, |best, g| match best {
                Some(b) if b.mean >= g.mean => Some(b),
                _ => Some(g),
            })
            .map(|g| g.key)
    }

    /// Number of topics shown (at most [`Self::TOP_TOPICS`]).
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use insights_core::error::InsightsError;
    use insights_core::models::ConversationRecord;
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    fn record(days: i64, hour: u32, content: &str) -> ConversationRecord {
        let ts = Utc.with_ymd_and_hms(2025, 5, 5, hour, 0, 0).unwrap() + Duration::days(days);
        ConversationRecord::new(ts, content)
    }

    fn enriched(records: Vec<ConversationRecord>) -> ConversationTable {
        let mut table = ConversationTable::new(records);
        FeatureEnricher::default().enrich(&mut table);
        table
    }

    #[test]
    fn test_analyze_conversations_enriches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conv.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        for (i, content) in ["What is AI?", "I love python coding", "Just chatting"]
            .iter()
            .enumerate()
        {
            let row = json!({"create_time": 1_746_093_600 + i as i64 * 60, "content": content});
            writeln!(file, "{}", row).unwrap();
        }

        let result = analyze_conversations(&path, Tz::UTC).unwrap();
        assert_eq!(result.table.len(), 3);
        assert_eq!(result.table.records()[0].topic(), "AI/ML");
        assert_eq!(result.table.records()[1].topic(), "Development");
        assert_eq!(result.table.records()[2].topic(), "General");
        assert_eq!(result.basic_stats.total_messages, 3);
        assert_eq!(result.basic_stats.start_date, "2025-05-01");
        assert_eq!(result.metadata.records_loaded, 3);
        assert_eq!(result.metadata.timezone, "UTC");
    }

    #[test]
    fn test_analyze_conversations_propagates_load_errors() {
        let dir = TempDir::new().unwrap();
        let err = analyze_conversations(&dir.path().join("missing.csv"), Tz::UTC).unwrap_err();
        assert!(matches!(err, InsightsError::FileNotFound(_)));
    }

    #[test]
    fn test_dashboard_stats_empty_table_is_degenerate() {
        let stats = DashboardStats::compute(&ConversationTable::default()).unwrap();
        assert!(stats.hourly.is_empty());
        assert!(stats.daily.is_empty());
        assert!(stats.phases.is_empty());
        assert_eq!(stats.topic_count(), 0);
        assert_eq!(stats.peak_hour(), None);
        assert!(stats.weekday.iter().all(|p| p.complexity == 0.0 && p.question_depth == 0.0));
    }

    #[test]
    fn test_hourly_efficiency_and_peak() {
        // "What?" → 0.05 + 10, "ok" → 0.02.
        let table = enriched(vec![
            record(0, 9, "ok"),
            record(0, 15, "What?"),
            record(1, 15, "ok"),
        ]);
        let stats = DashboardStats::compute(&table).unwrap();
        assert_eq!(stats.hourly.len(), 2);
        assert_eq!(stats.peak_hour(), Some(15));
        let peak = stats.peak_hourly_efficiency().unwrap();
        assert!((peak - (10.05 + 0.02) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_growth_trend_and_phases() {
        let records: Vec<ConversationRecord> = (0..10).map(|d| record(d, 12, "ok")).collect();
        let stats = DashboardStats::compute(&enriched(records)).unwrap();

        assert_eq!(stats.daily.len(), 10);
        assert!(stats.daily[5].trend.is_none());
        assert!(stats.daily[6].trend.is_some());

        let indices: Vec<usize> = stats.phases.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![3, 7]);
        assert_eq!(stats.phases[0].label, "Initial Phase");
    }

    #[test]
    fn test_single_day_phases_clamp() {
        let stats = DashboardStats::compute(&enriched(vec![record(0, 12, "ok")])).unwrap();
        let indices: Vec<usize> = stats.phases.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 0]);
    }

    #[test]
    fn test_topics_capped_at_eight() {
        let mut records: Vec<ConversationRecord> = (0..10)
            .map(|i| {
                let mut r = record(i, 10, "ok");
                r.primary_topic = Some(format!("Topic {}", i));
                r
            })
            .collect();
        let mut extra = record(11, 10, "ok");
        extra.primary_topic = Some("Topic 9".to_string());
        records.push(extra);

        let stats = DashboardStats::compute(&enriched(records)).unwrap();
        assert_eq!(stats.topic_count(), 8);
        assert_eq!(stats.topics[0], ("Topic 9".to_string(), 2));
        assert_eq!(stats.topics[1].0, "Topic 0");
    }

    #[test]
    fn test_weekday_patterns_zero_filled() {
        // 2025-05-05 is a Monday.
        let stats = DashboardStats::compute(&enriched(vec![record(0, 10, "What?")])).unwrap();
        assert_eq!(stats.weekday[0].day, Weekday::Mon);
        assert!((stats.weekday[0].question_depth - 1.0).abs() < 1e-12);
        assert_eq!(stats.weekday[3].complexity, 0.0);
        assert_eq!(stats.weekday[6].day, Weekday::Sun);
    }
}
