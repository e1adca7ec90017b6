//! Question-level evolution dashboard.

use std::path::{Path, PathBuf};

use insights_core::error::Result;
use insights_core::models::QuestionCategory;
use insights_data::aggregator::GroupMean;
use insights_data::questions::QuestionLevelAnalysis;

use crate::canvas::{axis_labels, DashboardCanvas, LinePanel, Series};

pub const FILE_NAME: &str = "question_level_evolution.txt";
pub const TITLE: &str = "Question Level Evolution Analysis";

/// Points at `(index, mean)` plus the key labels for the x axis.
fn indexed<K: ToString>(groups: &[GroupMean<K>]) -> (Vec<(f64, f64)>, Vec<String>) {
    groups
        .iter()
        .enumerate()
        .map(|(i, g)| ((i as f64, g.mean), g.key.to_string()))
        .unzip()
}

pub fn render_question_dashboard(analysis: &QuestionLevelAnalysis) -> DashboardCanvas {
    let mut canvas = DashboardCanvas::new(TITLE);
    let [daily_area, weekly_area, category_area, monthly_area] = canvas.panels();
    let buf = canvas.buffer_mut();

    let (daily, dates) = indexed(&analysis.daily);
    LinePanel {
        title: "Daily Question Depth".to_string(),
        x_title: "Date".to_string(),
        y_title: "Depth".to_string(),
        x_labels: axis_labels(&dates),
        series: vec![Series::new("Daily Average", daily)],
    }
    .render(daily_area, buf);

    let (weekly, weeks) = indexed(&analysis.weekly);
    LinePanel {
        title: "Weekly Question Depth".to_string(),
        x_title: "Week".to_string(),
        y_title: "Depth".to_string(),
        x_labels: axis_labels(&weeks),
        series: vec![Series::new("Weekly Average", weekly)],
    }
    .render(weekly_area, buf);

    let category_weeks: Vec<String> = analysis.categories.iter().map(|c| c.week.to_string()).collect();
    let category_series: Vec<Series> = QuestionCategory::ALL
        .iter()
        .map(|&category| {
            let points = analysis
                .categories
                .iter()
                .enumerate()
                .map(|(i, c)| (i as f64, c.get(category) as f64))
                .collect();
            Series::new(category.label(), points)
        })
        .collect();
    LinePanel {
        title: "Question Categories by Week".to_string(),
        x_title: "Week".to_string(),
        y_title: "Count".to_string(),
        x_labels: axis_labels(&category_weeks),
        series: category_series,
    }
    .render(category_area, buf);

    let (monthly, months) = indexed(&analysis.monthly);
    let mut series = vec![Series::new("Monthly Average", monthly)];
    if let Some(trend) = analysis.monthly_trend {
        let points = (0..analysis.monthly.len())
            .map(|i| (i as f64, trend.at(i as f64)))
            .collect();
        series.push(Series::new("Trend", points));
    }
    LinePanel {
        title: "Monthly Question Level Progression".to_string(),
        x_title: "Month".to_string(),
        y_title: "Depth".to_string(),
        x_labels: axis_labels(&months),
        series,
    }
    .render(monthly_area, buf);

    canvas
}

pub fn write_question_dashboard(analysis: &QuestionLevelAnalysis, output_dir: &Path) -> Result<PathBuf> {
    render_question_dashboard(analysis).write_to(output_dir, FILE_NAME)
}
