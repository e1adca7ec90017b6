//! Grouped means over hour, date, ISO week, month and weekday.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Weekday};
use insights_core::models::{ConversationRecord, Feature};
use insights_core::stats::mean;
use insights_core::time_utils::{IsoWeekKey, MonthKey, WEEKDAY_ORDER};
use serde::Serialize;

// ── GroupMean ─────────────────────────────────────────────────────────────────

/// Mean of one feature over one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupMean<K> {
    pub key: K,
    pub mean: f64,
    /// Number of records that contributed a value.
    pub count: usize,
}

// ── FeatureAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that groups records and averages a feature per group.
///
/// Records lacking the feature or the grouping key are skipped. Results are
/// ordered by key ascending.
pub struct FeatureAggregator;

impl FeatureAggregator {
    /// Mean per hour of day (0–23).
    pub fn by_hour<'a, I>(records: I, feature: Feature) -> Vec<GroupMean<u32>>
    where
        I: IntoIterator<Item = &'a ConversationRecord>,
    {
        Self::grouped_mean(records, feature, |r| r.hour)
    }

    /// Mean per calendar date.
    pub fn by_date<'a, I>(records: I, feature: Feature) -> Vec<GroupMean<NaiveDate>>
    where
        I: IntoIterator<Item = &'a ConversationRecord>,
    {
        Self::grouped_mean(records, feature, |r| r.date)
    }

    /// Mean per ISO week.
    pub fn by_week<'a, I>(records: I, feature: Feature) -> Vec<GroupMean<IsoWeekKey>>
    where
        I: IntoIterator<Item = &'a ConversationRecord>,
    {
        Self::grouped_mean(records, feature, |r| r.date.map(IsoWeekKey::of))
    }

    /// Mean per calendar month.
    pub fn by_month<'a, I>(records: I, feature: Feature) -> Vec<GroupMean<MonthKey>>
    where
        I: IntoIterator<Item = &'a ConversationRecord>,
    {
        Self::grouped_mean(records, feature, |r| r.date.map(MonthKey::of))
    }

    /// Mean per weekday, Monday first. Weekdays without data are omitted.
    pub fn by_weekday<'a, I>(records: I, feature: Feature) -> Vec<GroupMean<Weekday>>
    where
        I: IntoIterator<Item = &'a ConversationRecord>,
    {
        Self::grouped_mean(records, feature, |r| {
            r.day_of_week.map(|d| d.num_days_from_monday())
        })
        .into_iter()
        .map(|g| GroupMean {
            key: WEEKDAY_ORDER[g.key as usize],
            mean: g.mean,
            count: g.count,
        })
        .collect()
    }

    /// Mean per weekday for all seven days, Monday first; days without data
    /// read `0.0`.
    pub fn by_weekday_filled<'a, I>(records: I, feature: Feature) -> [(Weekday, f64); 7]
    where
        I: IntoIterator<Item = &'a ConversationRecord>,
    {
        let mut out = WEEKDAY_ORDER.map(|d| (d, 0.0));
        for g in Self::by_weekday(records, feature) {
            out[g.key.num_days_from_monday() as usize].1 = g.mean;
        }
        out
    }

    /// Topic label counts, largest first; ties ordered by label.
    pub fn topic_counts<'a, I>(records: I) -> Vec<(String, usize)>
    where
        I: IntoIterator<Item = &'a ConversationRecord>,
    {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in records {
            *counts.entry(record.topic()).or_default() += 1;
        }
        let mut out: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(topic, n)| (topic.to_string(), n))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    /// Generic grouping driver.
    ///
    /// `key_fn` maps a record to its group key, or `None` to skip it.
    pub fn grouped_mean<'a, I, K>(
        records: I,
        feature: Feature,
        key_fn: impl Fn(&ConversationRecord) -> Option<K>,
    ) -> Vec<GroupMean<K>>
    where
        I: IntoIterator<Item = &'a ConversationRecord>,
        K: Ord,
    {
        let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
        for record in records {
            let (Some(key), Some(value)) = (key_fn(record), feature.value(record)) else {
                continue;
            };
            groups.entry(key).or_default().push(value);
        }

        groups
            .into_iter()
            .filter_map(|(key, values)| {
                let m = mean(&values)?;
                Some(GroupMean {
                    key,
                    mean: m,
                    count: values.len(),
                })
            })
            .collect()
    }
}
