//! Server-side HTML for the dashboard page.
//!
//! Charts are inline SVG built from the summaries; the page carries no
//! scripts. Filter widgets are plain multi-selects in a GET form.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use crate::aggregate::CountGrid;
use crate::calls::{CallSummary, CallsReport};
use crate::incidents::{IncidentSummary, Selection, FILTERED_MARKER};

// ---

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: u64 = 5;

const PALETTE: [&str; 10] = [
    "#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a", "#19d3f3", "#ff6692", "#b6e880",
    "#ff97ff", "#fecb52",
];

/// One named line or stack layer, a value per category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub name: String,
    pub values: Vec<u64>,
}

/// Escape text for HTML element and attribute content.
pub fn escape(s: &str) -> String {
    // ---
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn color(i: usize) -> &'static str {
    PALETTE[i % PALETTE.len()]
}

/// Plot area geometry shared by every chart.
struct Frame {
    max: u64,
    bands: usize,
}

impl Frame {
    // ---
    fn new(max: u64, bands: usize) -> Self {
        // Round the axis top up to a multiple of the tick count.
        let max = max.max(1).div_ceil(Y_TICKS) * Y_TICKS;
        Frame {
            max,
            bands: bands.max(1),
        }
    }

    fn y(&self, value: u64) -> f64 {
        let plot = HEIGHT - MARGIN_BOTTOM - MARGIN_TOP;
        HEIGHT - MARGIN_BOTTOM - (value as f64 / self.max as f64) * plot
    }

    fn band(&self) -> f64 {
        (WIDTH - MARGIN_LEFT - MARGIN_RIGHT) / self.bands as f64
    }

    fn center(&self, i: usize) -> f64 {
        MARGIN_LEFT + self.band() * (i as f64 + 0.5)
    }

    /// Open the SVG and draw title, gridlines, axes and labels.
    fn open(&self, title: &str, x_label: &str, y_label: &str, categories: &[String]) -> String {
        // ---
        let mut svg = format!(
            r#"<svg class="chart" viewBox="0 0 {WIDTH} {HEIGHT}" role="img" aria-label="{t}"><text class="title" x="{x}" y="24" text-anchor="middle">{t}</text>"#,
            t = escape(title),
            x = WIDTH / 2.0,
        );

        for tick in 0..=Y_TICKS {
            let value = self.max / Y_TICKS * tick;
            let y = self.y(value);
            svg.push_str(&format!(
                r#"<line class="grid" x1="{MARGIN_LEFT}" x2="{x2}" y1="{y:.1}" y2="{y:.1}"/><text class="tick" x="{tx}" y="{ty:.1}" text-anchor="end">{value}</text>"#,
                x2 = WIDTH - MARGIN_RIGHT,
                tx = MARGIN_LEFT - 6.0,
                ty = y + 4.0,
            ));
        }

        for (i, label) in categories.iter().enumerate() {
            svg.push_str(&format!(
                r#"<text class="tick" x="{x:.1}" y="{y}" text-anchor="middle">{l}</text>"#,
                x = self.center(i),
                y = HEIGHT - MARGIN_BOTTOM + 18.0,
                l = escape(label),
            ));
        }

        svg.push_str(&format!(
            r#"<text class="axis" x="{x}" y="{y}" text-anchor="middle">{l}</text>"#,
            x = MARGIN_LEFT + (WIDTH - MARGIN_LEFT - MARGIN_RIGHT) / 2.0,
            y = HEIGHT - 16.0,
            l = escape(x_label),
        ));
        svg.push_str(&format!(
            r#"<text class="axis" x="18" y="{y}" text-anchor="middle" transform="rotate(-90 18 {y})">{l}</text>"#,
            y = MARGIN_TOP + (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM) / 2.0,
            l = escape(y_label),
        ));
        svg
    }
}

fn legend(title: &str, names: impl Iterator<Item = impl AsRef<str>>) -> String {
    // ---
    let mut html = format!(r#"<ul class="legend"><li class="legend-title">{}</li>"#, escape(title));
    for (i, name) in names.enumerate() {
        html.push_str(&format!(
            r#"<li><span class="swatch" style="background:{}"></span>{}</li>"#,
            color(i),
            escape(name.as_ref())
        ));
    }
    html.push_str("</ul>");
    html
}

fn empty_chart(title: &str) -> String {
    format!(
        r#"<p class="empty">{}: no data for the current selection.</p>"#,
        escape(title)
    )
}

/// One bar per label, each in its own colour.
pub fn bar_chart(title: &str, x_label: &str, y_label: &str, bars: &[(String, u64)]) -> String {
    // ---
    if bars.is_empty() {
        return empty_chart(title);
    }

    let labels: Vec<String> = bars.iter().map(|(l, _)| l.clone()).collect();
    let frame = Frame::new(bars.iter().map(|(_, n)| *n).max().unwrap_or(0), bars.len());
    let mut svg = frame.open(title, x_label, y_label, &labels);

    let width = frame.band() * 0.7;
    for (i, (label, count)) in bars.iter().enumerate() {
        let top = frame.y(*count);
        svg.push_str(&format!(
            r#"<rect x="{x:.1}" y="{top:.1}" width="{width:.1}" height="{h:.1}" fill="{c}"><title>{l}: {count}</title></rect>"#,
            x = frame.center(i) - width / 2.0,
            h = frame.y(0) - top,
            c = color(i),
            l = escape(label),
        ));
    }
    svg.push_str("</svg>");
    svg
}

/// Bars split into one stacked segment per series.
pub fn stacked_bar_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    legend_title: &str,
    categories: &[String],
    series: &[Series],
    totals: &[u64],
) -> String {
    // ---
    if categories.is_empty() || series.is_empty() {
        return empty_chart(title);
    }

    let frame = Frame::new(totals.iter().copied().max().unwrap_or(0), categories.len());
    let mut svg = frame.open(title, x_label, y_label, categories);

    let width = frame.band() * 0.7;
    for (i, category) in categories.iter().enumerate() {
        let mut base = 0u64;
        for (s, layer) in series.iter().enumerate() {
            let value = layer.values.get(i).copied().unwrap_or(0);
            if value == 0 {
                continue;
            }
            let top = frame.y(base + value);
            svg.push_str(&format!(
                r#"<rect x="{x:.1}" y="{top:.1}" width="{width:.1}" height="{h:.1}" fill="{c}"><title>{cat} {n}: {value}</title></rect>"#,
                x = frame.center(i) - width / 2.0,
                h = frame.y(base) - top,
                c = color(s),
                cat = escape(category),
                n = escape(&layer.name),
            ));
            base += value;
        }
    }
    svg.push_str("</svg>");
    svg.push_str(&legend(legend_title, series.iter().map(|s| &s.name)));
    svg
}

/// One polyline with markers per series over categorical x positions.
pub fn line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    legend_title: Option<&str>,
    categories: &[String],
    series: &[Series],
) -> String {
    // ---
    if categories.is_empty() || series.is_empty() {
        return empty_chart(title);
    }

    let max = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .max()
        .unwrap_or(0);
    let frame = Frame::new(max, categories.len());
    let mut svg = frame.open(title, x_label, y_label, categories);

    for (s, line) in series.iter().enumerate() {
        let points: Vec<(f64, f64, u64)> = line
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| (frame.center(i), frame.y(*v), *v))
            .collect();
        let path = points
            .iter()
            .map(|(x, y, _)| format!("{x:.1},{y:.1}"))
            .collect::<Vec<_>>()
            .join(" ");
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{c}" stroke-width="2" points="{path}"/>"#,
            c = color(s)
        ));
        for (x, y, v) in points {
            svg.push_str(&format!(
                r#"<circle cx="{x:.1}" cy="{y:.1}" r="4" fill="{c}"><title>{n}: {v}</title></circle>"#,
                c = color(s),
                n = escape(&line.name),
            ));
        }
    }
    svg.push_str("</svg>");
    if let Some(title) = legend_title {
        svg.push_str(&legend(title, series.iter().map(|s| &s.name)));
    }
    svg
}

/// Categories from grid rows, one series per grid column.
fn grid_series<R: Display, C: Display>(grid: &CountGrid<R, C>) -> (Vec<String>, Vec<Series>)
where
    R: Ord + Clone,
    C: Ord + Clone,
{
    // ---
    let categories = grid.rows.iter().map(ToString::to_string).collect();
    let series = grid
        .columns
        .iter()
        .enumerate()
        .map(|(c, name)| Series {
            name: name.to_string(),
            values: grid.counts.iter().map(|row| row[c]).collect(),
        })
        .collect();
    (categories, series)
}

fn grid_totals<R: Ord + Clone, C: Ord + Clone>(grid: &CountGrid<R, C>) -> Vec<u64> {
    (0..grid.rows.len()).map(|r| grid.row_total(r)).collect()
}

/// Year on the x axis, one series per crime category, zero where a category
/// has no incidents that year.
fn category_series(summary: &IncidentSummary) -> (Vec<String>, Vec<Series>) {
    // ---
    let years: BTreeSet<i32> = summary.by_year_category.iter().map(|c| c.year).collect();
    let mut by_category: BTreeMap<&str, BTreeMap<i32, u64>> = BTreeMap::new();
    for c in &summary.by_year_category {
        by_category
            .entry(c.category.as_str())
            .or_default()
            .insert(c.year, c.count);
    }

    let series = by_category
        .into_iter()
        .map(|(name, counts)| Series {
            name: name.to_string(),
            values: years
                .iter()
                .map(|y| counts.get(y).copied().unwrap_or(0))
                .collect(),
        })
        .collect();
    (years.iter().map(ToString::to_string).collect(), series)
}

fn multiselect<T: Display + Ord>(
    label: &str,
    name: &str,
    options: &BTreeSet<T>,
    selected: &BTreeSet<T>,
) -> String {
    // ---
    let mut html = format!(
        r#"<label for="{name}">{label}</label><select id="{name}" name="{name}" multiple size="{size}">"#,
        label = escape(label),
        size = options.len().clamp(2, 8),
    );
    for option in options {
        let value = escape(&option.to_string());
        let mark = if selected.contains(option) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            r#"<option value="{value}"{mark}>{value}</option>"#
        ));
    }
    html.push_str("</select>");
    html
}

fn filter_form(options: &Selection, selection: &Selection) -> String {
    // ---
    format!(
        r#"<aside><h2>Filter Data</h2><form method="get" action="/"><input type="hidden" name="{FILTERED_MARKER}" value="1">{}{}{}<button type="submit">Apply</button></form></aside>"#,
        multiselect("Select Year(s):", "year", &options.years, &selection.years),
        multiselect(
            "Select Precinct(s):",
            "precinct",
            &options.precincts,
            &selection.precincts
        ),
        multiselect(
            "Select Crime Category:",
            "category",
            &options.categories,
            &selection.categories
        ),
    )
}

fn incident_section(summary: &IncidentSummary) -> String {
    // ---
    let bars: Vec<(String, u64)> = summary
        .by_precinct
        .iter()
        .map(|c| (c.precinct.clone(), c.count))
        .collect();
    let (years, series) = category_series(summary);

    format!(
        r#"<section><h2>Crime Count by Precinct</h2>{}<h2>Crime Categories Over Time</h2>{}<p>{} incidents match the current filters. The bar chart shows how they are distributed across police precincts; the line chart follows each crime category from year to year. Change the filters in the sidebar to narrow the view to particular years, precincts or categories.</p></section>"#,
        bar_chart("Crime Count by Precinct", "Police Precinct", "Crime Count", &bars),
        line_chart(
            "Crime Categories Over Time",
            "Year",
            "Crime Count",
            Some("Category"),
            &years,
            &series
        ),
        summary.row_count,
    )
}

fn calls_charts(summary: &CallSummary) -> String {
    // ---
    let (months, month_series) = grid_series(&summary.by_month_period);
    let (precincts, priority_series) = grid_series(&summary.by_precinct_priority);
    let years: Vec<String> = summary.by_year.iter().map(|y| y.year.to_string()).collect();
    let year_series = vec![Series {
        name: "Calls".to_string(),
        values: summary.by_year.iter().map(|y| y.count).collect(),
    }];

    format!(
        r#"{}<p>Calls are split into morning (AM) and afternoon or evening (PM) for each month, showing when demand for emergency services peaks.</p>{}<p>Annual call volume, for spotting long-term shifts in demand.</p>{}<p>Calls per precinct stacked by assigned priority, showing where the most urgent demand is concentrated.</p><p class="note">Based on {} calls, timed by <code>{}</code>.</p>"#,
        stacked_bar_chart(
            "Number of 911 Calls per Month by AM or PM",
            "Month",
            "Number of Calls",
            "AM or PM",
            &months,
            &month_series,
            &grid_totals(&summary.by_month_period),
        ),
        line_chart(
            "911 Calls by Year",
            "Year",
            "Number of Calls",
            None,
            &years,
            &year_series
        ),
        stacked_bar_chart(
            "911 Calls by Precinct and Priority",
            "Precinct",
            "Number of Calls",
            "Priority",
            &precincts,
            &priority_series,
            &grid_totals(&summary.by_precinct_priority),
        ),
        summary.record_count,
        escape(summary.timestamp_field),
    )
}

const NO_DATA: &str = "No data available.";

fn calls_section(report: &CallsReport) -> String {
    // ---
    let body = match report {
        CallsReport::Available(summary) => calls_charts(summary),
        CallsReport::Unavailable { error } if error == NO_DATA => {
            format!(r#"<p class="error">{NO_DATA}</p>"#)
        }
        CallsReport::Unavailable { error } => format!(
            r#"<p class="error">{}</p><p class="error">{NO_DATA}</p>"#,
            escape(error)
        ),
    };
    format!(
        r#"<section><h2>Contextual Visualizations of Seattle 911 Calls</h2>{body}<p>Emergency call patterns complement the crime trends above: precincts and months with heavy call volume, especially high-priority calls, are natural places to look for matching crime activity.</p></section>"#
    )
}

const SOURCES: &str = r#"<section class="sources"><h3>Data Sources</h3><p><strong>1. Primary Dataset:</strong> <a href="https://data.seattle.gov/Public-Safety/SPD-Crime-Data-2008-Present/tazs-3rd5/about_data">Seattle Crime Data</a>, obtained from <a href="https://data.seattle.gov/">data.seattle.gov</a>. License: Public Domain.</p><p><strong>2. Contextual Dataset:</strong> <a href="https://data.seattle.gov/Public-Safety/Call-Data/33kz-ixgy/data">Seattle Calls Data</a>, obtained from <a href="https://data.seattle.gov/">data.seattle.gov</a>. License: Public Domain.</p></section>"#;

const STYLE: &str = "body{margin:0;font-family:sans-serif;background:#0e1117;color:#fafafa;display:flex}\
aside{width:260px;padding:1rem;background:#262730;min-height:100vh}\
aside label{display:block;margin-top:1rem}aside select{width:100%}aside button{margin-top:1rem}\
main{flex:1;padding:1rem 2rem;max-width:1000px}\
.chart{width:100%;height:auto;background:#000}.chart text{fill:#fafafa;font-size:12px}\
.chart .title{font-size:16px}.chart .axis{font-size:14px}.chart .grid{stroke:#444}\
.legend{list-style:none;padding:0;display:flex;flex-wrap:wrap;gap:1rem}\
.swatch{display:inline-block;width:12px;height:12px;margin-right:4px}\
.error{color:#ff6b6b}.empty{color:#aaa}a{color:#8ab4f8}";

/// The full dashboard page.
pub fn dashboard_page(
    options: &Selection,
    selection: &Selection,
    incidents: &IncidentSummary,
    calls: &CallsReport,
) -> String {
    // ---
    format!(
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><title>Seattle Crime Data</title><style>{STYLE}</style></head><body>{}<main><h1>Seattle Crime Data Visualization</h1><p>Visualization by Bhavita Vijay Bhoir, Rekha Kandukuri, Shefali Saxena and Vikramjeet Singh Kundu</p>{}{}{SOURCES}</main></body></html>"#,
        filter_form(options, selection),
        incident_section(incidents),
        calls_section(calls),
    )
}
