//! Off-screen 2×2 dashboard canvas and the panel widgets drawn on it.
//!
//! Panels are ordinary [`ratatui`] widgets rendered into a fixed-size
//! [`Buffer`]; the buffer is then flattened to UTF-8 text and written to
//! disk.

use std::path::{Path, PathBuf};

use insights_core::error::{InsightsError, Result};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    symbols::Marker,
    text::Line,
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget},
};
use tracing::debug;
use unicode_width::UnicodeWidthStr;

/// Text shown inside a panel whose series is empty.
pub const NO_DATA: &str = "No data available";

// ── DashboardCanvas ───────────────────────────────────────────────────────────

/// A titled canvas split into four equal panels.
#[derive(Debug, Clone)]
pub struct DashboardCanvas {
    buffer: Buffer,
    panels: [Rect; 4],
}

impl DashboardCanvas {
    pub const WIDTH: u16 = 160;
    pub const HEIGHT: u16 = 50;

    /// Blank canvas with `title` on the first line.
    pub fn new(title: &str) -> Self {
        let area = Rect::new(0, 0, Self::WIDTH, Self::HEIGHT);
        let mut buffer = Buffer::empty(area);

        let [title_area, grid] = Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).areas(area);
        Paragraph::new(Line::from(title.to_string()))
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .render(title_area, &mut buffer);

        let [top, bottom] = Layout::vertical([Constraint::Ratio(1, 2); 2]).areas(grid);
        let [top_left, top_right] = Layout::horizontal([Constraint::Ratio(1, 2); 2]).areas(top);
        let [bottom_left, bottom_right] = Layout::horizontal([Constraint::Ratio(1, 2); 2]).areas(bottom);

        Self {
            buffer,
            panels: [top_left, top_right, bottom_left, bottom_right],
        }
    }

    /// Panel areas: top-left, top-right, bottom-left, bottom-right.
    pub fn panels(&self) -> [Rect; 4] {
        self.panels
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    /// Flatten the buffer to text, one line per row, trailing blanks trimmed.
    pub fn to_text(&self) -> String {
        buffer_to_string(&self.buffer)
    }

    /// Write the canvas text to `dir/file_name`, creating `dir` if needed.
    pub fn write_to(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        let path = dir.join(file_name);
        std::fs::create_dir_all(dir).map_err(|source| InsightsError::FileWrite {
            path: dir.to_path_buf(),
            source,
        })?;
        std::fs::write(&path, self.to_text()).map_err(|source| InsightsError::FileWrite {
            path: path.clone(),
            source,
        })?;
        debug!("Wrote dashboard {}", path.display());
        Ok(path)
    }
}

/// Flatten `buffer` to text. Cells covered by a wide glyph are skipped.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut out = String::with_capacity((area.width as usize + 1) * area.height as usize);
    for y in area.top()..area.bottom() {
        let mut line = String::with_capacity(area.width as usize);
        let mut skip = 0usize;
        for x in area.left()..area.right() {
            let Some(cell) = buffer.cell((x, y)) else {
                continue;
            };
            if skip > 0 {
                skip -= 1;
                continue;
            }
            let symbol = cell.symbol();
            skip = symbol.width().saturating_sub(1);
            line.push_str(symbol);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

// ── Panels ────────────────────────────────────────────────────────────────────

fn panel_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
}

/// Bordered panel with the "no data" notice.
pub fn render_placeholder(title: &str, area: Rect, buf: &mut Buffer) {
    Paragraph::new(vec![Line::from(""), Line::from(NO_DATA)])
        .alignment(Alignment::Center)
        .block(panel_block(title))
        .render(area, buf);
}

/// One named line on a [`LinePanel`].
#[derive(Debug, Clone, Default)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// A line chart panel. Axis bounds are fitted to the data.
#[derive(Debug, Clone, Default)]
pub struct LinePanel {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    /// Labels spread evenly along the x axis; when empty, the bounds and
    /// midpoint are printed as integers.
    pub x_labels: Vec<String>,
    pub series: Vec<Series>,
}

impl LinePanel {
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let all: Vec<(f64, f64)> = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .collect();
        let (Some(x_bounds), Some(y_bounds)) = (
            fit_bounds(all.iter().map(|p| p.0), 0.0),
            fit_bounds(all.iter().map(|p| p.1), 0.1),
        ) else {
            render_placeholder(&self.title, area, buf);
            return;
        };

        let datasets: Vec<Dataset> = self
            .series
            .iter()
            .filter(|s| !s.points.is_empty())
            .map(|s| {
                Dataset::default()
                    .name(s.name.clone())
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .data(&s.points)
            })
            .collect();

        let y_labels = spread(y_bounds).map(|v| format!("{:.2}", v));
        let x_labels = if self.x_labels.is_empty() {
            spread(x_bounds).map(|v| format!("{:.0}", v)).to_vec()
        } else {
            self.x_labels.clone()
        };

        Chart::new(datasets)
            .block(panel_block(&self.title))
            .x_axis(
                Axis::default()
                    .title(self.x_title.clone())
                    .bounds(x_bounds)
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .title(self.y_title.clone())
                    .bounds(y_bounds)
                    .labels(y_labels),
            )
            .render(area, buf);
    }
}

/// `[min, max]` of `values` widened by `pad` of the range; a flat series is
/// widened by one unit. `None` when `values` is empty.
fn fit_bounds(values: impl Iterator<Item = f64>, pad: f64) -> Option<[f64; 2]> {
    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    if min == max {
        return Some([min - 1.0, max + 1.0]);
    }
    let margin = (max - min) * pad;
    Some([min - margin, max + margin])
}

fn spread([lo, hi]: [f64; 2]) -> [f64; 3] {
    [lo, (lo + hi) / 2.0, hi]
}

/// One bar: `value` sets the height, `text` is printed on it.
#[derive(Debug, Clone, Default)]
pub struct BarSpec {
    pub label: String,
    pub value: u64,
    pub text: String,
}

impl BarSpec {
    pub fn new(label: impl Into<String>, value: u64, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value,
            text: text.into(),
        }
    }

    fn to_bar(&self) -> Bar<'static> {
        Bar::default()
            .value(self.value)
            .label(Line::from(self.label.clone()))
            .text_value(self.text.clone())
    }
}

/// Bar chart panel. Each group is `(group label, bars)`; an empty label
/// draws a plain group.
pub fn render_bar_panel(title: &str, groups: &[(String, Vec<BarSpec>)], area: Rect, buf: &mut Buffer) {
    let bar_count: usize = groups.iter().map(|(_, bars)| bars.len()).sum();
    if bar_count == 0 {
        render_placeholder(title, area, buf);
        return;
    }

    // Fit bars and gaps inside the borders.
    let inner = area.width.saturating_sub(2) as usize;
    let slots = bar_count + groups.len();
    let bar_width = (inner / slots.max(1)).saturating_sub(1).clamp(3, 12) as u16;

    let mut chart = BarChart::default()
        .block(panel_block(title))
        .bar_width(bar_width)
        .bar_gap(1)
        .group_gap(2);
    for (label, bars) in groups {
        let bars: Vec<Bar> = bars.iter().map(BarSpec::to_bar).collect();
        let mut group = BarGroup::default().bars(&bars);
        if !label.is_empty() {
            group = group.label(Line::from(label.clone()));
        }
        chart = chart.data(group);
    }
    chart.render(area, buf);
}

/// `[first, middle, last]` of `labels`, or fewer when there are fewer.
pub fn axis_labels(labels: &[String]) -> Vec<String> {
    match labels.len() {
        0 => Vec::new(),
        1 | 2 => labels.to_vec(),
        n => vec![labels[0].clone(), labels[n / 2].clone(), labels[n - 1].clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_canvas_title_and_panels() {
        let canvas = DashboardCanvas::new("Test Dashboard");
        let text = canvas.to_text();
        assert!(text.lines().next().unwrap().contains("Test Dashboard"));
        assert_eq!(text.lines().count(), DashboardCanvas::HEIGHT as usize);

        let [tl, tr, bl, br] = canvas.panels();
        assert_eq!(tl.y, tr.y);
        assert_eq!(bl.y, br.y);
        assert!(bl.y > tl.y);
        assert!(tr.x > tl.x);
    }

    #[test]
    fn test_placeholder_text() {
        let mut canvas = DashboardCanvas::new("T");
        let area = canvas.panels()[0];
        render_placeholder("Empty Panel", area, canvas.buffer_mut());
        let text = canvas.to_text();
        assert!(text.contains("Empty Panel"));
        assert!(text.contains(NO_DATA));
    }

    #[test]
    fn test_line_panel_without_points_is_placeholder() {
        let mut canvas = DashboardCanvas::new("T");
        let area = canvas.panels()[1];
        LinePanel {
            title: "Series".to_string(),
            series: vec![Series::new("a", Vec::new())],
            ..Default::default()
        }
        .render(area, canvas.buffer_mut());
        assert!(canvas.to_text().contains(NO_DATA));
    }

    #[test]
    fn test_line_panel_renders_axes() {
        let mut canvas = DashboardCanvas::new("T");
        let area = canvas.panels()[0];
        LinePanel {
            title: "Trend".to_string(),
            x_title: "Hour".to_string(),
            y_title: "Value".to_string(),
            x_labels: vec!["0".to_string(), "23".to_string()],
            series: vec![Series::new("values", vec![(0.0, 1.0), (23.0, 3.0)])],
        }
        .render(area, canvas.buffer_mut());
        let text = canvas.to_text();
        assert!(text.contains("Trend"));
        assert!(text.contains("Hour"));
        assert!(!text.contains(NO_DATA));
    }

    #[test]
    fn test_bar_panel_shows_labels() {
        let mut canvas = DashboardCanvas::new("T");
        let area = canvas.panels()[2];
        let bars = vec![BarSpec::new("Weak", 3, "3"), BarSpec::new("Strong", 1, "1")];
        render_bar_panel("Counts", &[(String::new(), bars)], area, canvas.buffer_mut());
        let text = canvas.to_text();
        assert!(text.contains("Counts"));
        assert!(text.contains("Weak"));
    }

    #[test]
    fn test_bar_panel_empty_is_placeholder() {
        let mut canvas = DashboardCanvas::new("T");
        let area = canvas.panels()[3];
        render_bar_panel("Nothing", &[], area, canvas.buffer_mut());
        assert!(canvas.to_text().contains(NO_DATA));
    }

    #[test]
    fn test_buffer_to_string_wide_glyphs() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 6, 1));
        buf.set_string(0, 0, "데이터", Style::default());
        assert_eq!(buffer_to_string(&buf), "데이터\n");
    }

    #[test]
    fn test_write_to_creates_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("out");
        let path = DashboardCanvas::new("Saved").write_to(&dir, "x.txt").unwrap();
        assert_eq!(path, dir.join("x.txt"));
        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.contains("Saved"));
    }

    #[test]
    fn test_fit_bounds() {
        assert_eq!(fit_bounds(std::iter::empty(), 0.1), None);
        assert_eq!(fit_bounds([2.0].into_iter(), 0.1), Some([1.0, 3.0]));
        assert_eq!(fit_bounds([0.0, 10.0].into_iter(), 0.0), Some([0.0, 10.0]));
    }

    #[test]
    fn test_axis_labels() {
        let labels: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(axis_labels(&labels), vec!["a", "c", "d"]);
        assert!(axis_labels(&[]).is_empty());
    }
}
