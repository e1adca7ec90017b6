//! Per-message feature derivation.
//!
//! Every derived column is filled only where it is missing, so running the
//! enricher twice over the same table is a no-op the second time.

use std::sync::OnceLock;

use chrono_tz::Tz;
use insights_core::models::{ConversationRecord, ConversationTable, GENERAL_TOPIC};
use insights_core::time_utils::LocalParts;
use regex::Regex;
use tracing::debug;

// ── Keyword tables ────────────────────────────────────────────────────────────

/// First-match topic table, checked in order against the title.
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "AI/ML",
        &[
            "llm",
            "ai",
            "ml",
            "neural",
            "deep learning",
            "machine learning",
            "langchain",
            "langgraph",
            "transformer",
            "gpt",
            "bert",
        ],
    ),
    (
        "Development",
        &["설치", "오류", "코드", "개발", "programming", "python", "javascript"],
    ),
    (
        "Cloud/Infra",
        &["aws", "클라우드", "서버리스", "docker", "kubernetes"],
    ),
    ("Design", &["디자인", "ui", "ux", "그래픽", "design"]),
    (
        "Business",
        &["프로젝트", "비즈니스", "네이밍", "마케팅", "사업", "ott", "ota"],
    ),
    ("Education", &["교육", "학습", "teaching", "course", "tutorial"]),
    ("Data", &["데이터", "분석", "data", "analytics", "온톨로지"]),
];

/// Richer table used to re-home rows still labelled "General".
/// Most hits wins; ties go to the earlier entry.
const REFINED_TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Programming",
        &[
            "code", "python", "javascript", "java", "c++", "php", "ruby", "swift", "kotlin",
            "function", "class", "method", "variable", "loop", "algorithm", "debug", "error",
            "compile", "syntax", "programming", "script", "library", "framework", "api",
            "database", "sql", "query", "server", "backend", "frontend",
        ],
    ),
    (
        "AI/ML",
        &[
            "ai",
            "artificial intelligence",
            "machine learning",
            "ml",
            "neural",
            "network",
            "deep learning",
            "model",
            "training",
            "predict",
            "classification",
            "regression",
            "tensor",
            "pytorch",
            "tensorflow",
            "keras",
            "scikit",
            "nlp",
            "vision",
            "gpt",
            "bert",
            "transformer",
            "embedding",
            "token",
            "fine-tune",
            "inference",
        ],
    ),
    (
        "Data Science",
        &[
            "data",
            "dataset",
            "dataframe",
            "pandas",
            "numpy",
            "matplotlib",
            "seaborn",
            "analysis",
            "analytics",
            "statistics",
            "probability",
            "correlation",
            "plot",
            "visualization",
            "chart",
            "graph",
            "csv",
            "json",
            "excel",
            "table",
            "pivot",
        ],
    ),
    (
        "Web Development",
        &[
            "html", "css", "javascript", "react", "vue", "angular", "node", "express", "jquery",
            "bootstrap", "sass", "webpack", "babel", "npm", "yarn", "web", "website", "browser",
            "dom", "http", "ajax", "json", "api", "rest",
        ],
    ),
    (
        "Mathematics",
        &[
            "math",
            "calculus",
            "algebra",
            "geometry",
            "statistics",
            "probability",
            "equation",
            "formula",
            "theorem",
            "matrix",
            "vector",
            "integral",
            "derivative",
            "function",
            "graph",
            "plot",
            "linear",
            "quadratic",
            "differential",
        ],
    ),
    (
        "Development Tools",
        &[
            "vscode", "cursor", "git", "github", "terminal", "cli", "command", "shell", "bash",
            "docker", "kubernetes", "linux", "mac", "windows", "editor", "ide", "debug",
            "compile", "build", "deploy",
        ],
    ),
    (
        "Design Tools",
        &[
            "figma",
            "sketch",
            "photoshop",
            "illustrator",
            "ui",
            "ux",
            "design",
            "wireframe",
            "prototype",
            "mockup",
            "color",
            "font",
            "layout",
            "responsive",
            "mobile",
            "web",
            "app",
            "interface",
            "user experience",
        ],
    ),
    (
        "Research/Education",
        &[
            "learn",
            "study",
            "understand",
            "explain",
            "research",
            "paper",
            "experiment",
            "methodology",
            "analysis",
            "theory",
            "concept",
            "principle",
            "education",
            "teaching",
            "course",
            "tutorial",
            "guide",
            "documentation",
        ],
    ),
];

/// Vocabulary behind `tech_term_density`.
const TECH_TERMS: &[&str] = &[
    "python",
    "ai",
    "machine learning",
    "data",
    "algorithm",
    "neural",
    "network",
    "model",
    "training",
];

fn question_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\?|what|how|why|when|where").expect("regex is valid"))
}

// ── Single-value derivations ──────────────────────────────────────────────────

/// Whether `content` carries an interrogative marker.
pub fn is_question(content: &str) -> bool {
    question_regex().is_match(content)
}

/// 1 when `content` is a question, else 0.
pub fn question_depth(content: &str) -> u32 {
    u32::from(is_question(content))
}

/// Length proxy: number of characters in `content`.
pub fn word_count(content: &str) -> u64 {
    content.chars().count() as u64
}

/// `word_count / 100 + question_depth * 10`, or `1.0` when either input is
/// unknown.
pub fn complexity(word_count: Option<u64>, question_depth: Option<u32>) -> f64 {
    match (word_count, question_depth) {
        (Some(words), Some(depth)) => words as f64 / 100.0 + f64::from(depth) * 10.0,
        _ => 1.0,
    }
}

/// Fraction of [`TECH_TERMS`] that occur in `content`.
pub fn tech_term_density(content: &str) -> f64 {
    if content.is_empty() {
        return 0.0;
    }
    let lower = content.to_lowercase();
    let hits = TECH_TERMS.iter().filter(|t| lower.contains(*t)).count();
    hits as f64 / TECH_TERMS.len() as f64
}

/// First topic whose keyword list matches `text`; "General" otherwise.
pub fn classify_topic(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(topic, _)| *topic)
        .unwrap_or(GENERAL_TOPIC)
}

/// Topic with the most keyword hits in `content`, if any keyword hits.
pub fn refine_topic(content: &str) -> Option<&'static str> {
    let lower = content.to_lowercase();
    let mut best: Option<(&'static str, usize)> = None;
    for (topic, keywords) in REFINED_TOPIC_KEYWORDS {
        let hits = keywords.iter().filter(|k| lower.contains(*k)).count();
        // Strictly greater keeps the earlier topic on ties.
        if hits > best.map(|(_, n)| n).unwrap_or(0) {
            best = Some((topic, hits));
        }
    }
    best.map(|(topic, _)| topic)
}

/// Re-label records whose topic is "General" using [`refine_topic`].
///
/// Returns how many records were re-labelled.
pub fn refine_general_topics(records: &mut [ConversationRecord]) -> usize {
    let mut changed = 0;
    for record in records.iter_mut().filter(|r| r.topic() == GENERAL_TOPIC) {
        if let Some(topic) = refine_topic(&record.content) {
            record.primary_topic = Some(topic.to_string());
            changed += 1;
        }
    }
    changed
}

// ── FeatureEnricher ───────────────────────────────────────────────────────────

/// Fills missing derived columns on conversation records.
#[derive(Debug, Clone)]
pub struct FeatureEnricher {
    timezone: Tz,
}

impl Default for FeatureEnricher {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl FeatureEnricher {
    /// `timezone` decides how `date`, `hour` and `day_of_week` are derived.
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Derive `word_count`, `question_depth`, `date`, `hour` and
    /// `day_of_week` where missing.
    pub fn derive_base_columns(&self, records: &mut [ConversationRecord]) {
        for record in records.iter_mut() {
            if record.word_count.is_none() {
                record.word_count = Some(word_count(&record.content));
            }
            if record.question_depth.is_none() {
                record.question_depth = Some(question_depth(&record.content));
            }
            if record.date.is_none() || record.hour.is_none() || record.day_of_week.is_none() {
                let parts = LocalParts::of(record.timestamp, &self.timezone);
                record.date.get_or_insert(parts.date);
                record.hour.get_or_insert(parts.hour);
                record.day_of_week.get_or_insert(parts.weekday);
            }
        }
    }

    /// Derive `complexity_ma`, `primary_topic`, `has_question` and
    /// `tech_term_density` where missing.
    ///
    /// Topics are classified from `conversation_title`, falling back to the
    /// message content when the record has no title.
    pub fn enrich_features(&self, records: &mut [ConversationRecord]) {
        let mut classified = 0usize;
        for record in records.iter_mut() {
            if record.complexity_ma.is_none() {
                record.complexity_ma = Some(complexity(record.word_count, record.question_depth));
            }
            if record.primary_topic.is_none() {
                let source = record
                    .conversation_title
                    .as_deref()
                    .unwrap_or(&record.content);
                record.primary_topic = Some(classify_topic(source).to_string());
                classified += 1;
            }
            if record.has_question.is_none() {
                record.has_question = Some(is_question(&record.content));
            }
            if record.tech_term_density.is_none() {
                record.tech_term_density = Some(tech_term_density(&record.content));
            }
        }
        debug!("FeatureEnricher: classified {} topics", classified);
    }

    /// Base columns followed by feature columns.
    pub fn enrich(&self, table: &mut ConversationTable) {
        let records = table.records_mut();
        self.derive_base_columns(records);
        self.enrich_features(records);
    }
}
