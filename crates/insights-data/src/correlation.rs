//! Pearson correlation across the numeric conversation features.
//!
//! The overall matrix covers every present feature; hourly and weekday
//! slices are only computed when the slice has more than
//! [`CorrelationEngine::MIN_SLICE_ROWS`] rows.

use std::collections::BTreeMap;

use chrono::Weekday;
use insights_core::error::{InsightsError, Result};
use insights_core::models::{ConversationRecord, ConversationTable, Feature};
use insights_core::stats::{mean, pearson};
use insights_core::time_utils::WEEKDAY_ORDER;
use serde::Serialize;
use tracing::{debug, info};

// ── Strength ──────────────────────────────────────────────────────────────────

/// Qualitative strength of an absolute coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Strength {
    /// `|r| < 0.3`
    Weak,
    /// `0.3 ≤ |r| < 0.7`
    Moderate,
    /// `|r| ≥ 0.7`
    Strong,
}

impl Strength {
    pub fn of(r: f64) -> Self {
        let abs = r.abs();
        if abs >= 0.7 {
            Strength::Strong
        } else if abs >= 0.3 {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Strength::Weak => "Weak",
            Strength::Moderate => "Moderate",
            Strength::Strong => "Strong",
        }
    }
}

/// Number of unique feature pairs per [`Strength`] bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrengthDistribution {
    pub weak: usize,
    pub moderate: usize,
    pub strong: usize,
}

impl StrengthDistribution {
    pub fn total(&self) -> usize {
        self.weak + self.moderate + self.strong
    }

    /// `(label, count)` rows in Weak, Moderate, Strong order.
    pub fn rows(&self) -> [(&'static str, usize); 3] {
        [
            ("Weak (0-0.3)", self.weak),
            ("Moderate (0.3-0.7)", self.moderate),
            ("Strong (0.7+)", self.strong),
        ]
    }
}

// ── CorrelationMatrix ─────────────────────────────────────────────────────────

/// A pair of distinct features with their coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeaturePair {
    pub a: Feature,
    pub b: Feature,
    pub r: f64,
}

/// Symmetric Pearson matrix with a unit diagonal.
///
/// Off-diagonal cells are `None` when the pair has fewer than two joint
/// observations or one side has zero variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub features: Vec<Feature>,
    pub values: Vec<Vec<Option<f64>>>,
    /// Rows the matrix was computed from.
    pub rows: usize,
}

impl CorrelationMatrix {
    /// Pairwise-complete Pearson matrix over `features`. With no records
    /// every entry, the diagonal included, is undefined.
    pub fn compute(records: &[&ConversationRecord], features: &[Feature]) -> Self {
        let n = features.len();
        let mut values = vec![vec![None; n]; n];
        let diagonal = (!records.is_empty()).then_some(1.0);

        for i in 0..n {
            values[i][i] = diagonal;
            for j in (i + 1)..n {
                let r = pair_coefficient(records, features[i], features[j]);
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        Self {
            features: features.to_vec(),
            values,
            rows: records.len(),
        }
    }

    fn index_of(&self, feature: Feature) -> Option<usize> {
        self.features.iter().position(|f| *f == feature)
    }

    /// Coefficient between `a` and `b`, if both are in the matrix and defined.
    pub fn get(&self, a: Feature, b: Feature) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        self.values[i][j]
    }

    /// Defined off-diagonal pairs, each listed once (upper triangle).
    pub fn pairs(&self) -> Vec<FeaturePair> {
        let n = self.features.len();
        let mut out = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if let Some(r) = self.values[i][j] {
                    out.push(FeaturePair {
                        a: self.features[i],
                        b: self.features[j],
                        r,
                    });
                }
            }
        }
        out
    }

    /// Off-diagonal pair with the largest `|r|`; the first one wins ties.
    pub fn strongest_pair(&self) -> Option<FeaturePair> {
        self.pairs().into_iter().fold(None, |best, p| match best {
            Some(b) if b.r.abs() >= p.r.abs() => Some(b),
            _ => Some(p),
        })
    }

    /// Mean `|r|` of each feature against every other feature.
    pub fn average_abs(&self) -> Vec<(Feature, Option<f64>)> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let others: Vec<f64> = self.values[i]
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .filter_map(|(_, v)| v.map(f64::abs))
                    .collect();
                (*f, mean(&others))
            })
            .collect()
    }

    pub fn strength_distribution(&self) -> StrengthDistribution {
        let mut dist = StrengthDistribution::default();
        for p in self.pairs() {
            match Strength::of(p.r) {
                Strength::Weak => dist.weak += 1,
                Strength::Moderate => dist.moderate += 1,
                Strength::Strong => dist.strong += 1,
            }
        }
        dist
    }
}

/// Pearson over the records where both features are present.
fn pair_coefficient(records: &[&ConversationRecord], a: Feature, b: Feature) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = records
        .iter()
        .filter_map(|r| Some((a.value(r)?, b.value(r)?)))
        .unzip();
    pearson(&xs, &ys)
}

// ── Insights ──────────────────────────────────────────────────────────────────

/// Headline figures derived from the overall matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationInsights {
    pub strongest: Option<(FeaturePair, Strength)>,
    pub average_correlations: Vec<(Feature, Option<f64>)>,
    pub distribution: StrengthDistribution,
}

impl CorrelationInsights {
    pub fn from_matrix(matrix: &CorrelationMatrix) -> Self {
        Self {
            strongest: matrix.strongest_pair().map(|p| (p, Strength::of(p.r))),
            average_correlations: matrix.average_abs(),
            distribution: matrix.strength_distribution(),
        }
    }

    /// One-line description of the strongest pair.
    pub fn strongest_summary(&self) -> String {
        match &self.strongest {
            Some((p, strength)) => format!(
                "{} ↔ {}: |r| = {:.3} ({})",
                p.a.display_name(),
                p.b.display_name(),
                p.r.abs(),
                strength.label()
            ),
            None => "No defined correlation between features".to_string(),
        }
    }
}

// ── Weekday slice ─────────────────────────────────────────────────────────────

/// Coefficient for one weekday slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekdayCorrelation {
    pub day: Weekday,
    pub r: f64,
    pub rows: usize,
}

// ── CorrelationAnalysis ───────────────────────────────────────────────────────

/// Full output of [`CorrelationEngine::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationAnalysis {
    pub overall: CorrelationMatrix,
    /// Hour → matrix over that hour's rows.
    pub hourly: BTreeMap<u32, CorrelationMatrix>,
    /// word_count ↔ question_depth per qualifying weekday, Monday first.
    pub weekday: Vec<WeekdayCorrelation>,
    pub insights: CorrelationInsights,
}

impl CorrelationAnalysis {
    /// `(hour, r)` for a pair across the hourly slices where it is defined.
    pub fn hourly_pair(&self, a: Feature, b: Feature) -> Vec<(u32, f64)> {
        self.hourly
            .iter()
            .filter_map(|(h, m)| m.get(a, b).map(|r| (*h, r)))
            .collect()
    }
}

// ── CorrelationEngine ─────────────────────────────────────────────────────────

/// Stateless correlation driver over a [`ConversationTable`].
pub struct CorrelationEngine;

impl CorrelationEngine {
    /// A slice must have strictly more rows than this to be analysed.
    pub const MIN_SLICE_ROWS: usize = 10;

    /// Features with at least one value in the table, in matrix order.
    pub fn present_features(table: &ConversationTable) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| table.has_feature(*f))
            .collect()
    }

    /// Matrix over all present features. An empty table yields an
    /// undefined matrix over every feature.
    pub fn overall(table: &ConversationTable) -> Result<CorrelationMatrix> {
        if table.is_empty() {
            return Ok(CorrelationMatrix::compute(&[], &Feature::ALL));
        }
        let features = Self::present_features(table);
        if features.len() < 2 {
            return Err(InsightsError::InsufficientColumns {
                found: features.len(),
            });
        }
        let records: Vec<&ConversationRecord> = table.iter().collect();
        Ok(CorrelationMatrix::compute(&records, &features))
    }

    /// Matrix per hour of day, for hours with more than
    /// [`Self::MIN_SLICE_ROWS`] rows.
    pub fn hourly(table: &ConversationTable, features: &[Feature]) -> BTreeMap<u32, CorrelationMatrix> {
        let mut slices: BTreeMap<u32, Vec<&ConversationRecord>> = BTreeMap::new();
        for record in table {
            if let Some(h) = record.hour {
                slices.entry(h).or_default().push(record);
            }
        }

        slices
            .into_iter()
            .filter(|(_, rows)| rows.len() > Self::MIN_SLICE_ROWS)
            .map(|(h, rows)| (h, CorrelationMatrix::compute(&rows, features)))
            .collect()
    }

    /// `a` ↔ `b` per weekday with more than [`Self::MIN_SLICE_ROWS`] rows.
    /// Weekdays whose coefficient is undefined are omitted.
    pub fn weekday_pair(table: &ConversationTable, a: Feature, b: Feature) -> Vec<WeekdayCorrelation> {
        WEEKDAY_ORDER
            .iter()
            .filter_map(|day| {
                let rows: Vec<&ConversationRecord> =
                    table.iter().filter(|r| r.day_of_week == Some(*day)).collect();
                if rows.len() <= Self::MIN_SLICE_ROWS {
                    return None;
                }
                let r = pair_coefficient(&rows, a, b)?;
                Some(WeekdayCorrelation {
                    day: *day,
                    r,
                    rows: rows.len(),
                })
            })
            .collect()
    }

    /// Overall and hourly matrices, the weekday slice and the insights.
    pub fn analyze(table: &ConversationTable) -> Result<CorrelationAnalysis> {
        let overall = Self::overall(table)?;
        let hourly = Self::hourly(table, &overall.features);
        let weekday = Self::weekday_pair(table, Feature::WordCount, Feature::QuestionDepth);
        let insights = CorrelationInsights::from_matrix(&overall);

        debug!(
            "Correlation: {} features, {} hourly slices, {} weekday slices",
            overall.features.len(),
            hourly.len(),
            weekday.len()
        );
        info!("Correlation analysis complete");

        Ok(CorrelationAnalysis {
            overall,
            hourly,
            weekday,
            insights,
        })
    }
}
