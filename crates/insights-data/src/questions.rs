//! Question-level evolution over learning-related conversations.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use insights_core::error::Result;
use insights_core::formatting::percentage;
use insights_core::models::{ConversationRecord, ConversationTable, Feature, QuestionCategory};
use insights_core::stats::{mean, LinearTrend};
use insights_core::time_utils::{IsoWeekKey, MonthKey};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregator::{FeatureAggregator, GroupMean};
use crate::enricher::{is_question, refine_general_topics, tech_term_density};

const LEARNING_KEYWORDS: &[&str] = &[
    "learn",
    "study",
    "understand",
    "explain",
    "how",
    "what",
    "why",
    "teach",
    "concept",
    "algorithm",
    "model",
    "data",
    "analysis",
    "programming",
    "code",
    "python",
    "machine learning",
    "ai",
    "deep learning",
    "neural",
    "network",
    "statistics",
    "probability",
    "math",
    "calculus",
    "linear algebra",
    "optimization",
    "gradient",
    "loss",
    "accuracy",
    "training",
    "validation",
];

/// Tech-term density above which a message counts as learning-related.
const TECH_DENSITY_THRESHOLD: f64 = 0.1;

/// A learning keyword in the content, a question, or dense technical
/// vocabulary. Missing flags are computed from the content.
pub fn is_learning_related(record: &ConversationRecord) -> bool {
    let lower = record.content.to_lowercase();
    if LEARNING_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return true;
    }
    if record
        .has_question
        .unwrap_or_else(|| is_question(&record.content))
    {
        return true;
    }
    record
        .tech_term_density
        .unwrap_or_else(|| tech_term_density(&record.content))
        > TECH_DENSITY_THRESHOLD
}

// ── Result types ──────────────────────────────────────────────────────────────

/// Question-category counts for one ISO week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyCategoryCounts {
    pub week: IsoWeekKey,
    /// Counts in [`QuestionCategory::ALL`] order.
    pub counts: [usize; 3],
}

impl WeeklyCategoryCounts {
    pub fn get(&self, category: QuestionCategory) -> usize {
        self.counts[category as usize]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// `(learning_count, mean of daily means, mean of weekly means)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuestionSummary {
    pub learning_count: usize,
    pub daily_average: f64,
    pub weekly_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionLevelAnalysis {
    /// Rows in the input table.
    pub total_count: usize,
    pub learning_count: usize,
    pub daily: Vec<GroupMean<NaiveDate>>,
    pub weekly: Vec<GroupMean<IsoWeekKey>>,
    pub monthly: Vec<GroupMean<MonthKey>>,
    pub categories: Vec<WeeklyCategoryCounts>,
    /// Refined topic label → learning rows, largest first.
    pub topics: Vec<(String, usize)>,
    /// Least-squares line over the monthly means; needs two months.
    pub monthly_trend: Option<LinearTrend>,
}

impl QuestionLevelAnalysis {
    /// Share of learning-related rows, in percent with one decimal.
    pub fn learning_ratio(&self) -> f64 {
        percentage(self.learning_count as f64, self.total_count as f64, 1)
    }

    /// Headline figures; averages over empty series read `0.0`.
    pub fn summary(&self) -> QuestionSummary {
        let daily: Vec<f64> = self.daily.iter().map(|g| g.mean).collect();
        let weekly: Vec<f64> = self.weekly.iter().map(|g| g.mean).collect();
        QuestionSummary {
            learning_count: self.learning_count,
            daily_average: mean(&daily).unwrap_or(0.0),
            weekly_average: mean(&weekly).unwrap_or(0.0),
        }
    }
}

// ── QuestionLevelAnalyzer ─────────────────────────────────────────────────────

pub struct QuestionLevelAnalyzer;

impl QuestionLevelAnalyzer {
    /// Learning-related rows of `table`, cloned.
    pub fn learning_records(table: &ConversationTable) -> Vec<ConversationRecord> {
        table
            .iter()
            .filter(|r| is_learning_related(r))
            .cloned()
            .collect()
    }

    /// Basic/Intermediate/Advanced counts per ISO week.
    pub fn categories_by_week(records: &[ConversationRecord]) -> Vec<WeeklyCategoryCounts> {
        let mut weeks: BTreeMap<IsoWeekKey, [usize; 3]> = BTreeMap::new();
        for record in records {
            let (Some(date), Some(depth)) = (record.date, record.question_depth) else {
                continue;
            };
            let category = QuestionCategory::from_depth(depth);
            weeks.entry(IsoWeekKey::of(date)).or_default()[category as usize] += 1;
        }
        weeks
            .into_iter()
            .map(|(week, counts)| WeeklyCategoryCounts { week, counts })
            .collect()
    }

    /// Filter to learning rows, then compute trends, weekly categories and
    /// the refined topic distribution. An empty table gives zero counts and
    /// empty series.
    pub fn analyze(table: &ConversationTable) -> Result<QuestionLevelAnalysis> {
        let mut learning = Self::learning_records(table);
        let refined = refine_general_topics(&mut learning);
        debug!("Question levels: {} General rows re-labelled", refined);

        let daily = FeatureAggregator::by_date(&learning, Feature::QuestionDepth);
        let weekly = FeatureAggregator::by_week(&learning, Feature::QuestionDepth);
        let monthly = FeatureAggregator::by_month(&learning, Feature::QuestionDepth);
        let monthly_values: Vec<f64> = monthly.iter().map(|g| g.mean).collect();

        let analysis = QuestionLevelAnalysis {
            total_count: table.len(),
            learning_count: learning.len(),
            categories: Self::categories_by_week(&learning),
            topics: FeatureAggregator::topic_counts(&learning),
            monthly_trend: LinearTrend::fit(&monthly_values),
            daily,
            weekly,
            monthly,
        };

        info!(
            "Learning-related conversations: {} of {} ({:.1}%)",
            analysis.learning_count,
            analysis.total_count,
            analysis.learning_ratio()
        );
        Ok(analysis)
    }
}
