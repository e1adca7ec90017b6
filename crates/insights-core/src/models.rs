use chrono::{DateTime, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::time_utils::LocalParts;

/// Topic assigned when no keyword set matches.
pub const GENERAL_TOPIC: &str = "General";

/// One chat message together with its derived features.
///
/// Every derived field is optional: `None` means the value was not present in
/// the input and has not been derived yet. Derivation only ever fills `None`
/// values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// UTC instant the message was sent.
    pub timestamp: DateTime<Utc>,
    /// Message text (empty when the input carried none).
    #[serde(default)]
    pub content: String,
    /// Title of the conversation the message belongs to.
    #[serde(default)]
    pub conversation_title: Option<String>,
    /// Character length of `content`.
    #[serde(default)]
    pub word_count: Option<u64>,
    /// Interrogative score (1 when a question marker is present).
    #[serde(default)]
    pub question_depth: Option<u32>,
    /// Calendar day of `timestamp` in the analysis timezone.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Hour of day (0–23) in the analysis timezone.
    #[serde(default)]
    pub hour: Option<u32>,
    /// Weekday in the analysis timezone.
    #[serde(default)]
    pub day_of_week: Option<Weekday>,
    /// Keyword-classified topic label.
    #[serde(default)]
    pub primary_topic: Option<String>,
    /// Complexity proxy combining length and question depth.
    #[serde(default)]
    pub complexity_ma: Option<f64>,
    /// Whether the content looks like a question.
    #[serde(default)]
    pub has_question: Option<bool>,
    /// Fraction of the technical vocabulary found in `content`.
    #[serde(default)]
    pub tech_term_density: Option<f64>,
}

impl ConversationRecord {
    /// A record with only the raw fields set.
    pub fn new(timestamp: DateTime<Utc>, content: impl Into<String>) -> Self {
        Self {
            timestamp,
            content: content.into(),
            conversation_title: None,
            word_count: None,
            question_depth: None,
            date: None,
            hour: None,
            day_of_week: None,
            primary_topic: None,
            complexity_ma: None,
            has_question: None,
            tech_term_density: None,
        }
    }

    /// Topic label, defaulting to [`GENERAL_TOPIC`].
    pub fn topic(&self) -> &str {
        self.primary_topic.as_deref().unwrap_or(GENERAL_TOPIC)
    }
}

// ── Feature ───────────────────────────────────────────────────────────────────

/// Numeric features that take part in correlation and grouped means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    ComplexityMa,
    WordCount,
    QuestionDepth,
    Hour,
}

impl Feature {
    /// Correlation candidates in matrix order.
    pub const ALL: [Feature; 4] = [
        Feature::ComplexityMa,
        Feature::WordCount,
        Feature::QuestionDepth,
        Feature::Hour,
    ];

    /// Column name as it appears in input files.
    pub fn column_name(self) -> &'static str {
        match self {
            Feature::ComplexityMa => "complexity_ma",
            Feature::WordCount => "word_count",
            Feature::QuestionDepth => "question_depth",
            Feature::Hour => "hour",
        }
    }

    /// Human-readable label for dashboards.
    pub fn display_name(self) -> &'static str {
        match self {
            Feature::ComplexityMa => "Learning Complexity",
            Feature::WordCount => "Expression Length",
            Feature::QuestionDepth => "Question Depth",
            Feature::Hour => "Hour",
        }
    }

    /// Value of this feature for `record`, if present.
    pub fn value(self, record: &ConversationRecord) -> Option<f64> {
        match self {
            Feature::ComplexityMa => record.complexity_ma,
            Feature::WordCount => record.word_count.map(|v| v as f64),
            Feature::QuestionDepth => record.question_depth.map(f64::from),
            Feature::Hour => record.hour.map(f64::from),
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

// ── QuestionCategory ──────────────────────────────────────────────────────────

/// Question-depth bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestionCategory {
    /// Depth 0.
    Basic,
    /// Depth 1–2.
    Intermediate,
    /// Depth 3 and above.
    Advanced,
}

impl QuestionCategory {
    pub const ALL: [QuestionCategory; 3] = [
        QuestionCategory::Basic,
        QuestionCategory::Intermediate,
        QuestionCategory::Advanced,
    ];

    pub fn from_depth(depth: u32) -> Self {
        match depth {
            0 => QuestionCategory::Basic,
            1 | 2 => QuestionCategory::Intermediate,
            _ => QuestionCategory::Advanced,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuestionCategory::Basic => "Basic",
            QuestionCategory::Intermediate => "Intermediate",
            QuestionCategory::Advanced => "Advanced",
        }
    }
}

// ── ConversationTable ─────────────────────────────────────────────────────────

/// The in-memory table of conversation records, sorted by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationTable {
    records: Vec<ConversationRecord>,
}

impl ConversationTable {
    /// Build a table, sorting records by timestamp.
    pub fn new(mut records: Vec<ConversationRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ConversationRecord] {
        &self.records
    }

    /// Mutable access for in-place derivation of missing columns.
    pub fn records_mut(&mut self) -> &mut [ConversationRecord] {
        &mut self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConversationRecord> {
        self.records.iter()
    }

    /// A feature counts as a present column when at least one record has it.
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.records.iter().any(|r| feature.value(r).is_some())
    }

    /// Row count, date range and mean length/depth; `None` for an empty table.
    ///
    /// The range is taken from the timestamps seen in `tz`, the same local
    /// dates the analysis window filters on.
    pub fn basic_stats(&self, tz: &Tz) -> Option<BasicStats> {
        let local_date = |r: &ConversationRecord| LocalParts::of(r.timestamp, tz).date;
        let first = self.records.iter().map(local_date).min()?;
        let last = self.records.iter().map(local_date).max()?;

        let word_counts: Vec<f64> = self
            .records
            .iter()
            .filter_map(|r| Feature::WordCount.value(r))
            .collect();
        let depths: Vec<f64> = self
            .records
            .iter()
            .filter_map(|r| Feature::QuestionDepth.value(r))
            .collect();

        Some(BasicStats {
            total_messages: self.records.len(),
            start_date: first.format("%Y-%m-%d").to_string(),
            end_date: last.format("%Y-%m-%d").to_string(),
            avg_word_count: crate::stats::mean(&word_counts).unwrap_or(0.0),
            avg_question_depth: crate::stats::mean(&depths).unwrap_or(0.0),
        })
    }
}

impl<'a> IntoIterator for &'a ConversationTable {
    type Item = &'a ConversationRecord;
    type IntoIter = std::slice::Iter<'a, ConversationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ── BasicStats ────────────────────────────────────────────────────────────────

/// Summary figures reported after a successful load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_messages: usize,
    /// First day in the table, `%Y-%m-%d`.
    pub start_date: String,
    /// Last day in the table, `%Y-%m-%d`.
    pub end_date: String,
    pub avg_word_count: f64,
    pub avg_question_depth: f64,
}

impl BasicStats {
    /// Stand-in used when loading failed.
    pub fn unavailable() -> Self {
        Self {
            total_messages: 0,
            start_date: "N/A".to_string(),
            end_date: "N/A".to_string(),
            avg_word_count: 0.0,
            avg_question_depth: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(day: u32, hour: u32, content: &str) -> ConversationRecord {
        let ts = Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0).unwrap();
        ConversationRecord::new(ts, content)
    }

    #[test]
    fn test_table_sorted_on_construction() {
        let table = ConversationTable::new(vec![record(3, 0, "b"), record(1, 0, "a")]);
        assert_eq!(table.records()[0].content, "a");
        assert_eq!(table.records()[1].content, "b");
    }

    #[test]
    fn test_feature_value_mapping() {
        let mut r = record(1, 9, "hi");
        r.word_count = Some(42);
        r.question_depth = Some(1);
        r.hour = Some(9);
        assert_eq!(Feature::WordCount.value(&r), Some(42.0));
        assert_eq!(Feature::QuestionDepth.value(&r), Some(1.0));
        assert_eq!(Feature::Hour.value(&r), Some(9.0));
        assert_eq!(Feature::ComplexityMa.value(&r), None);
    }

    #[test]
    fn test_has_feature_any_record() {
        let mut a = record(1, 0, "a");
        let b = record(2, 0, "b");
        a.complexity_ma = Some(1.5);
        let table = ConversationTable::new(vec![a, b]);
        assert!(table.has_feature(Feature::ComplexityMa));
        assert!(!table.has_feature(Feature::Hour));
    }

    #[test]
    fn test_basic_stats() {
        let mut a = record(1, 0, "a");
        let mut b = record(20, 0, "b");
        a.word_count = Some(10);
        b.word_count = Some(30);
        a.question_depth = Some(1);
        b.question_depth = Some(0);
        let stats = ConversationTable::new(vec![b, a]).basic_stats(&Tz::UTC).unwrap();
        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.start_date, "2025-05-01");
        assert_eq!(stats.end_date, "2025-05-20");
        assert!((stats.avg_word_count - 20.0).abs() < 1e-9);
        assert!((stats.avg_question_depth - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_basic_stats_empty_table() {
        assert!(ConversationTable::default().basic_stats(&Tz::UTC).is_none());
    }

    #[test]
    fn test_basic_stats_range_follows_local_timestamp() {
        // 2025-04-30T20:00Z is already May 1st in Seoul; the stale `date`
        // column must not leak into the range.
        let ts = Utc.with_ymd_and_hms(2025, 4, 30, 20, 0, 0).unwrap();
        let mut early = ConversationRecord::new(ts, "early");
        early.date = NaiveDate::from_ymd_opt(2025, 4, 30);
        let mut late = record(3, 0, "late");
        late.date = NaiveDate::from_ymd_opt(2025, 6, 1);

        let table = ConversationTable::new(vec![early, late]);
        let seoul = table.basic_stats(&Tz::Asia__Seoul).unwrap();
        assert_eq!(seoul.start_date, "2025-05-01");
        assert_eq!(seoul.end_date, "2025-05-03");

        let utc = table.basic_stats(&Tz::UTC).unwrap();
        assert_eq!(utc.start_date, "2025-04-30");
    }

    #[test]
    fn test_question_category_buckets() {
        assert_eq!(QuestionCategory::from_depth(0), QuestionCategory::Basic);
        assert_eq!(QuestionCategory::from_depth(1), QuestionCategory::Intermediate);
        assert_eq!(QuestionCategory::from_depth(2), QuestionCategory::Intermediate);
        assert_eq!(QuestionCategory::from_depth(3), QuestionCategory::Advanced);
        assert_eq!(QuestionCategory::from_depth(40), QuestionCategory::Advanced);
    }

    #[test]
    fn test_topic_defaults_to_general() {
        let r = record(1, 0, "x");
        assert_eq!(r.topic(), GENERAL_TOPIC);
    }
}
