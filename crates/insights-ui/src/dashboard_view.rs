//! Comprehensive learning dashboard: hourly efficiency, growth trajectory,
//! main topics and weekly patterns.

use std::path::{Path, PathBuf};

use insights_core::error::Result;
use insights_core::formatting::truncate_label;
use insights_core::time_utils::AnalysisWindow;
use insights_data::analysis::DashboardStats;

use crate::canvas::{axis_labels, render_bar_panel, BarSpec, DashboardCanvas, LinePanel, Series};

pub const FILE_NAME: &str = "comprehensive_learning_dashboard.txt";
pub const TITLE: &str = "Personalized Learning Analysis Dashboard";

const TOPIC_LABEL_WIDTH: usize = 10;

pub fn render_learning_dashboard(stats: &DashboardStats) -> DashboardCanvas {
    let mut canvas = DashboardCanvas::new(TITLE);
    let [hourly_area, growth_area, topic_area, weekday_area] = canvas.panels();
    let buf = canvas.buffer_mut();

    hourly_panel(stats).render(hourly_area, buf);
    growth_panel(stats).render(growth_area, buf);

    let topic_bars: Vec<BarSpec> = stats
        .topics
        .iter()
        .map(|(topic, n)| BarSpec::new(truncate_label(topic, TOPIC_LABEL_WIDTH), *n as u64, n.to_string()))
        .collect();
    render_bar_panel("Main Topics", &[(String::new(), topic_bars)], topic_area, buf);

    // Means are fractional; bars carry them in hundredths.
    let weekday_groups: Vec<(String, Vec<BarSpec>)> = stats
        .weekday
        .iter()
        .map(|p| {
            (
                p.day.to_string(),
                vec![
                    BarSpec::new("Cpx", scaled(p.complexity), format!("{:.1}", p.complexity)),
                    BarSpec::new("Qst", scaled(p.question_depth), format!("{:.1}", p.question_depth)),
                ],
            )
        })
        .collect();
    render_bar_panel("Weekly Patterns", &weekday_groups, weekday_area, buf);

    canvas
}

fn scaled(v: f64) -> u64 {
    (v.max(0.0) * 100.0).round() as u64
}

/// Vertical segment at `x` spanning `[lo, hi]`.
fn marker(name: String, x: f64, lo: f64, hi: f64) -> Series {
    Series::new(name, vec![(x, lo), (x, hi)])
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
    })
}

fn hourly_panel(stats: &DashboardStats) -> LinePanel {
    let points: Vec<(f64, f64)> = stats
        .hourly
        .iter()
        .map(|g| (f64::from(g.key), g.mean))
        .collect();

    let mut series = vec![Series::new("Complexity", points)];
    if let Some((lo, hi)) = min_max(stats.hourly.iter().map(|g| g.mean)) {
        let hour = DashboardStats::REFERENCE_HOUR;
        series.push(marker(format!("Peak Study Time ({}:00)", hour), f64::from(hour), lo, hi));
    }

    LinePanel {
        title: "Hourly Efficiency".to_string(),
        x_title: "Hour".to_string(),
        y_title: "Complexity".to_string(),
        x_labels: Vec::new(),
        series,
    }
}

fn growth_panel(stats: &DashboardStats) -> LinePanel {
    let daily: Vec<(f64, f64)> = stats
        .daily
        .iter()
        .enumerate()
        .map(|(i, d)| (i as f64, d.mean))
        .collect();
    let trend: Vec<(f64, f64)> = stats
        .daily
        .iter()
        .enumerate()
        .filter_map(|(i, d)| Some((i as f64, d.trend?)))
        .collect();

    let mut series = vec![
        Series::new("Daily Complexity", daily),
        Series::new(format!("{}-day Trend", DashboardStats::TREND_WINDOW), trend),
    ];
    if let Some((lo, hi)) = min_max(stats.daily.iter().map(|d| d.mean)) {
        for phase in &stats.phases {
            series.push(marker(phase.label.to_string(), phase.index as f64, lo, hi));
        }
    }

    let dates: Vec<String> = stats.daily.iter().map(|d| d.date.format("%m-%d").to_string()).collect();

    LinePanel {
        title: format!("Learning Growth Trajectory ({})", AnalysisWindow::fixed().label()),
        x_title: "Date".to_string(),
        y_title: "Complexity".to_string(),
        x_labels: axis_labels(&dates),
        series,
    }
}

pub fn write_learning_dashboard(stats: &DashboardStats, output_dir: &Path) -> Result<PathBuf> {
    render_learning_dashboard(stats).write_to(output_dir, FILE_NAME)
}
