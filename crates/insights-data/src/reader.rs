//! Conversation log discovery and loading.
//!
//! Reads `.csv`, `.json`, `.jsonl` and `.ndjson` exports into a
//! [`ConversationTable`], normalising the timestamp, restricting rows to the
//! analysis window and deriving the base columns that are missing.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use insights_core::data_processors::{FieldReader, TimestampProcessor};
use insights_core::error::{InsightsError, Result};
use insights_core::models::{ConversationRecord, ConversationTable};
use insights_core::time_utils::{AnalysisWindow, LocalParts};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::enricher::FeatureEnricher;

/// One untyped input row: column name → cell value.
pub type RawRow = Map<String, Value>;

// ── InputFormat ───────────────────────────────────────────────────────────────

/// Supported on-disk layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
    JsonLines,
}

impl InputFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            "jsonl" | "ndjson" => Ok(InputFormat::JsonLines),
            _ => Err(InsightsError::UnsupportedFormat(ext)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InputFormat::Csv => "CSV",
            InputFormat::Json => "JSON",
            InputFormat::JsonLines => "JSONL",
        }
    }
}

// ── Timestamp column ──────────────────────────────────────────────────────────

/// Which column carries the message time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimestampColumn {
    /// `create_time`, epoch seconds.
    CreateTime,
    /// `timestamp`, free-form date-time.
    Timestamp,
}

impl TimestampColumn {
    /// `create_time` wins as soon as any row carries it.
    fn detect(rows: &[RawRow]) -> Result<Self> {
        if rows.iter().any(|r| r.contains_key("create_time")) {
            Ok(TimestampColumn::CreateTime)
        } else if rows.iter().any(|r| r.contains_key("timestamp")) {
            Ok(TimestampColumn::Timestamp)
        } else {
            Err(InsightsError::MissingTimestamp)
        }
    }

    fn name(self) -> &'static str {
        match self {
            TimestampColumn::CreateTime => "create_time",
            TimestampColumn::Timestamp => "timestamp",
        }
    }

    fn parse(self, value: &Value) -> Option<DateTime<Utc>> {
        match self {
            TimestampColumn::CreateTime => TimestampProcessor::parse_epoch(value),
            TimestampColumn::Timestamp => TimestampProcessor::parse(value),
        }
    }
}

// ── File discovery ────────────────────────────────────────────────────────────

/// Find every supported data file under `dir`, recursively, sorted by path.
pub fn find_data_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file() && InputFormat::from_path(entry.path()).is_ok()
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Read the raw rows of a single file without any interpretation.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
    let format = InputFormat::from_path(path)?;
    let rows = match format {
        InputFormat::Csv => read_csv(path)?,
        InputFormat::Json => read_json(path)?,
        InputFormat::JsonLines => read_json_lines(path)?,
    };
    debug!(
        "Read {} {} rows from {}",
        rows.len(),
        format.label(),
        path.display()
    );
    Ok(rows)
}

fn read_csv(path: &Path) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| InsightsError::load_failure(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| InsightsError::load_failure(path, e))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| InsightsError::load_failure(path, e))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn read_json(path: &Path) -> Result<Vec<RawRow>> {
    let text = std::fs::read_to_string(path).map_err(|e| InsightsError::load_failure(path, e))?;
    let value: Value =
        serde_json::from_str(&text).map_err(|e| InsightsError::load_failure(path, e))?;

    match value {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(InsightsError::load_failure(
                    path,
                    format!("element {} is not an object: {}", i, kind_of(&other)),
                )),
            })
            .collect(),
        other => Err(InsightsError::load_failure(
            path,
            format!("expected an object or an array, found {}", kind_of(&other)),
        )),
    }
}

fn read_json_lines(path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path).map_err(|e| InsightsError::load_failure(path, e))?;
    let reader = std::io::BufReader::new(file);

    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| InsightsError::load_failure(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|e| {
            InsightsError::load_failure(path, format!("line {}: {}", line_no, e))
        })?;
        match value {
            Value::Object(map) => rows.push(map),
            other => {
                return Err(InsightsError::load_failure(
                    path,
                    format!("line {}: expected an object, found {}", line_no, kind_of(&other)),
                ))
            }
        }
    }
    Ok(rows)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── RecordLoader ──────────────────────────────────────────────────────────────

/// Loads conversation logs into a windowed, base-enriched table.
#[derive(Debug, Clone)]
pub struct RecordLoader {
    enricher: FeatureEnricher,
    window: AnalysisWindow,
}

impl Default for RecordLoader {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl RecordLoader {
    pub fn new(timezone: Tz) -> Self {
        Self {
            enricher: FeatureEnricher::new(timezone),
            window: AnalysisWindow::fixed(),
        }
    }

    pub fn window(&self) -> AnalysisWindow {
        self.window
    }

    /// Load a file, or every supported file under a directory.
    pub fn load(&self, path: &Path) -> Result<ConversationTable> {
        if !path.exists() {
            return Err(InsightsError::FileNotFound(path.to_path_buf()));
        }

        let (records, source) = if path.is_dir() {
            let files = find_data_files(path);
            if files.is_empty() {
                return Err(InsightsError::NoDataFiles(path.to_path_buf()));
            }
            // Each file detects its own timestamp column.
            let mut records = Vec::new();
            for file in &files {
                let rows = read_rows(file)?;
                if rows.is_empty() {
                    debug!("Skipping empty file {}", file.display());
                    continue;
                }
                records.extend(self.build_records(file, rows)?);
            }
            debug!("Read {} files under {}", files.len(), path.display());
            (records, format!("{} files", files.len()))
        } else {
            let format = InputFormat::from_path(path)?;
            let rows = read_rows(path)?;
            (self.build_records(path, rows)?, format!("{} file", format.label()))
        };

        let table = self.finish(records);
        info!("{} messages loaded successfully from {}", table.len(), source);
        Ok(table)
    }

    /// Turn raw rows into a sorted table: parse timestamps, drop rows outside
    /// the window, map known columns and derive missing base columns.
    pub fn build_table(&self, path: &Path, rows: Vec<RawRow>) -> Result<ConversationTable> {
        let records = self.build_records(path, rows)?;
        Ok(self.finish(records))
    }

    /// Records of one source, windowed, in input order. The timestamp
    /// column is detected from `rows` alone.
    fn build_records(&self, path: &Path, rows: Vec<RawRow>) -> Result<Vec<ConversationRecord>> {
        let column = TimestampColumn::detect(&rows)?;
        let total = rows.len();

        let mut records = Vec::with_capacity(total);
        let mut dropped_missing = 0usize;
        let mut dropped_window = 0usize;

        for row in &rows {
            let raw_ts = row.get(column.name()).unwrap_or(&Value::Null);
            if FieldReader::is_missing(raw_ts) {
                dropped_missing += 1;
                continue;
            }
            let ts = column.parse(raw_ts).ok_or_else(|| {
                let shown = FieldReader::text(raw_ts).unwrap_or_default();
                InsightsError::load_failure(path, InsightsError::TimestampParse(shown))
            })?;

            let local = LocalParts::of(ts, &self.enricher.timezone());
            if !self.window.contains(local.date) {
                dropped_window += 1;
                continue;
            }

            records.push(record_from_row(ts, row));
        }

        if dropped_missing > 0 {
            warn!(
                "Dropped {} rows with an empty {} value",
                dropped_missing,
                column.name()
            );
        }
        debug!(
            "{} rows read, {} outside {}, {} kept",
            total,
            dropped_window,
            self.window.label(),
            records.len()
        );
        Ok(records)
    }

    fn finish(&self, mut records: Vec<ConversationRecord>) -> ConversationTable {
        self.enricher.derive_base_columns(&mut records);
        ConversationTable::new(records)
    }
}

/// Map the known columns of `row` onto a record; unknown columns are ignored.
fn record_from_row(timestamp: DateTime<Utc>, row: &RawRow) -> ConversationRecord {
    let field = |name: &str| row.get(name).filter(|v| !FieldReader::is_missing(v));

    let mut record = ConversationRecord::new(
        timestamp,
        field("content").and_then(FieldReader::text).unwrap_or_default(),
    );
    record.conversation_title = field("conversation_title").and_then(FieldReader::text);
    record.word_count = field("word_count").and_then(FieldReader::unsigned);
    record.question_depth = field("question_depth")
        .and_then(FieldReader::unsigned)
        .and_then(|d| u32::try_from(d).ok());
    record.date = field("date").and_then(FieldReader::date);
    record.hour = field("hour")
        .and_then(FieldReader::unsigned)
        .and_then(|h| u32::try_from(h).ok())
        .filter(|h| *h < 24);
    record.day_of_week = field("day_of_week").and_then(FieldReader::weekday);
    record.primary_topic = field("primary_topic").and_then(FieldReader::text);
    record.complexity_ma = field("complexity_ma").and_then(FieldReader::float);
    record.has_question = field("has_question").and_then(FieldReader::boolean);
    record.tech_term_density = field("tech_term_density").and_then(FieldReader::float);
    record
}

/// Load `path` with a [`RecordLoader`] for `timezone`.
pub fn load_conversations(path: &Path, timezone: Tz) -> Result<ConversationTable> {
    RecordLoader::new(timezone).load(path)
}
