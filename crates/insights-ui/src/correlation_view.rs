//! Correlation dashboard: matrix, hourly pair line, weekday pair bars and the
//! strength distribution.

use std::path::{Path, PathBuf};

use insights_core::error::Result;
use insights_core::formatting::{format_coefficient, truncate_label};
use insights_core::models::Feature;
use insights_data::correlation::{CorrelationAnalysis, CorrelationMatrix};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table, Widget},
};

use crate::canvas::{render_bar_panel, BarSpec, DashboardCanvas, LinePanel, Series};

pub const FILE_NAME: &str = "correlation_learning_patterns.txt";
pub const TITLE: &str = "Learning Pattern Correlation Deep Analysis (April-August 2025)";

const LABEL_WIDTH: usize = 12;

/// Draw the four correlation panels.
pub fn render_correlation_dashboard(analysis: &CorrelationAnalysis) -> DashboardCanvas {
    let mut canvas = DashboardCanvas::new(TITLE);
    let [matrix_area, hourly_area, weekday_area, strength_area] = canvas.panels();
    let buf = canvas.buffer_mut();

    render_matrix(&analysis.overall, matrix_area, buf);

    let pair = analysis.hourly_pair(Feature::WordCount, Feature::QuestionDepth);
    let hourly: Vec<(f64, f64)> = pair.iter().map(|&(h, r)| (f64::from(h), r)).collect();
    LinePanel {
        title: "Hourly Learning Pattern Correlation Changes".to_string(),
        x_title: "Hour".to_string(),
        y_title: "Correlation".to_string(),
        x_labels: Vec::new(),
        series: vec![Series::new("Expression ↔ Question Depth", hourly)],
    }
    .render(hourly_area, buf);

    // Bar height is |r| in hundredths; the printed value keeps the sign.
    let weekday_bars: Vec<BarSpec> = analysis
        .weekday
        .iter()
        .map(|w| {
            BarSpec::new(
                w.day.to_string(),
                (w.r.abs() * 100.0).round() as u64,
                format!("{:+.2}", w.r),
            )
        })
        .collect();
    render_bar_panel(
        "Daily Learning Style Correlation",
        &[(String::new(), weekday_bars)],
        weekday_area,
        buf,
    );

    let dist = analysis.insights.distribution;
    let strength_bars: Vec<BarSpec> = if dist.total() == 0 {
        Vec::new()
    } else {
        dist.rows()
            .iter()
            .map(|(label, n)| BarSpec::new(*label, *n as u64, n.to_string()))
            .collect()
    };
    render_bar_panel(
        "Correlation Strength Distribution",
        &[(String::new(), strength_bars)],
        strength_area,
        buf,
    );

    canvas
}

/// Matrix as a table: one row and one column per feature.
fn render_matrix(matrix: &CorrelationMatrix, area: Rect, buf: &mut Buffer) {
    let names: Vec<String> = matrix
        .features
        .iter()
        .map(|f| truncate_label(f.display_name(), LABEL_WIDTH))
        .collect();

    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(names.iter().map(|n| Cell::from(n.clone())))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = matrix
        .values
        .iter()
        .zip(&names)
        .map(|(values, name)| {
            Row::new(
                std::iter::once(Cell::from(name.clone()))
                    .chain(values.iter().map(|v| Cell::from(format_coefficient(*v))))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let widths = vec![Constraint::Length(LABEL_WIDTH as u16 + 3); names.len() + 1];
    Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Learning Variables Correlation Matrix (n = {}) ", matrix.rows)),
        )
        .render(area, buf);
}

/// Render and write to `output_dir/correlation_learning_patterns.txt`.
pub fn write_correlation_dashboard(analysis: &CorrelationAnalysis, output_dir: &Path) -> Result<PathBuf> {
    render_correlation_dashboard(analysis).write_to(output_dir, FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::NO_DATA;
    use chrono::{Datelike, Duration, TimeZone, Utc};
    use insights_core::models::{ConversationRecord, ConversationTable};
    use insights_data::correlation::CorrelationEngine;
    use tempfile::TempDir;

    fn analysis(days: i64) -> CorrelationAnalysis {
        let base = Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap();
        let records: Vec<ConversationRecord> = (0..days)
            .map(|i| {
                let ts = base + Duration::days(i);
                let mut r = ConversationRecord::new(ts, "x");
                r.date = Some(ts.date_naive());
                r.hour = Some(9 + (i % 3) as u32);
                r.day_of_week = Some(ts.date_naive().weekday());
                r.word_count = Some(10 + (i * 7 % 11) as u64);
                r.question_depth = Some((i % 2) as u32);
                r.complexity_ma = Some(i as f64 / 10.0);
                r
            })
            .collect();
        CorrelationEngine::analyze(&ConversationTable::new(records)).unwrap()
    }

    #[test]
    fn test_render_contains_all_panels() {
        let text = render_correlation_dashboard(&analysis(80)).to_text();
        assert!(text.contains(TITLE));
        assert!(text.contains("Correlation Matrix"));
        assert!(text.contains("Hourly Learning Pattern"));
        assert!(text.contains("Daily Learning Style Correlation"));
        assert!(text.contains("Correlation Strength Distribution"));
        assert!(text.contains("+1.00"));
    }

    #[test]
    fn test_small_dataset_uses_placeholders() {
        // Too few rows for any hourly or weekday slice.
        let text = render_correlation_dashboard(&analysis(6)).to_text();
        assert!(text.contains(NO_DATA));
        assert!(text.contains("Correlation Matrix"));
    }

    #[test]
    fn test_empty_table_renders_undefined_matrix() {
        let analysis = CorrelationEngine::analyze(&ConversationTable::default()).unwrap();
        let text = render_correlation_dashboard(&analysis).to_text();
        assert!(text.contains("(n = 0)"));
        assert!(!text.contains("+1.00"));
        assert!(text.contains(NO_DATA));
    }

    #[test]
    fn test_write_uses_fixed_name() {
        let tmp = TempDir::new().unwrap();
        let path = write_correlation_dashboard(&analysis(30), tmp.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), FILE_NAME);
        assert!(path.exists());
    }
}
