//! Minimal SVG rendering for [`ChartDecision`]s
//!
//! Line charts for time series, bar charts for categories. Output is a
//! standalone SVG document sized 900x450.

use chrono::{NaiveDateTime, Timelike};
use std::fmt::Write;

use super::{ChartDecision, ChartSpec};

pub const WIDTH: f64 = 900.0;
pub const HEIGHT: f64 = 450.0;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 100.0;
const Y_TICKS: usize = 5;
const MAX_X_TICKS: usize = 6;

const LINE_COLOR: &str = "#1f77b4";
const AXIS_COLOR: &str = "#333333";
const GRID_COLOR: &str = "#e0e0e0";

/// Render `decision`, or `None` when there is nothing to draw
pub fn render(decision: &ChartDecision, spec: &ChartSpec) -> Option<String> {
    let body = match decision {
        ChartDecision::None => return None,
        ChartDecision::TimeSeries { x, y } if !y.is_empty() => line_chart(x, y),
        ChartDecision::Categorical { labels, y } if !y.is_empty() => bar_chart(labels, y),
        _ => return None,
    };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="24" font-size="15" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        escape(&spec.title)
    );
    let _ = writeln!(
        svg,
        r#"<text x="18" y="{y}" font-size="12" text-anchor="middle" transform="rotate(-90 18 {y})">{}</text>"#,
        escape(&spec.y_label),
        y = MARGIN_TOP + plot_height() / 2.0
    );
    if let Some(x_label) = &spec.x_label {
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="12" text-anchor="middle">{}</text>"#,
            MARGIN_LEFT + plot_width() / 2.0,
            HEIGHT - 12.0,
            escape(x_label)
        );
    }
    svg.push_str(&body);
    svg.push_str("</svg>\n");
    Some(svg)
}

fn plot_width() -> f64 {
    WIDTH - MARGIN_LEFT - MARGIN_RIGHT
}

fn plot_height() -> f64 {
    HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
}

/// Value range for the y axis; always includes zero for bar charts
#[derive(Debug, Clone, Copy, PartialEq)]
struct YScale {
    min: f64,
    max: f64,
}

impl YScale {
    /// Non-finite values are left out of the range
    fn fit(values: &[f64], include_zero: bool) -> Self {
        let finite = values.iter().cloned().filter(|v| v.is_finite());
        let mut min = finite.clone().fold(f64::INFINITY, f64::min);
        let mut max = finite.fold(f64::NEG_INFINITY, f64::max);
        if min > max {
            min = 0.0;
            max = 0.0;
        }
        if include_zero {
            min = min.min(0.0);
            max = max.max(0.0);
        }
        if (max - min).abs() < f64::EPSILON {
            min -= 1.0;
            max += 1.0;
        }
        Self { min, max }
    }

    fn to_px(self, value: f64) -> f64 {
        MARGIN_TOP + plot_height() * (1.0 - (value - self.min) / (self.max - self.min))
    }
}

fn y_axis(svg: &mut String, scale: YScale) {
    for i in 0..=Y_TICKS {
        let value = scale.min + (scale.max - scale.min) * i as f64 / Y_TICKS as f64;
        let y = scale.to_px(value);
        let _ = writeln!(
            svg,
            r#"<line x1="{x1}" y1="{y:.1}" x2="{x2}" y2="{y:.1}" stroke="{c}"/>"#,
            x1 = MARGIN_LEFT,
            x2 = WIDTH - MARGIN_RIGHT,
            c = GRID_COLOR
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" font-size="10" text-anchor="end">{}</text>"#,
            MARGIN_LEFT - 6.0,
            y + 3.0,
            format_tick(value)
        );
    }
    let _ = writeln!(
        svg,
        r#"<line x1="{x}" y1="{top}" x2="{x}" y2="{bottom}" stroke="{c}"/>"#,
        x = MARGIN_LEFT,
        top = MARGIN_TOP,
        bottom = MARGIN_TOP + plot_height(),
        c = AXIS_COLOR
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{x1}" y1="{y}" x2="{x2}" y2="{y}" stroke="{c}"/>"#,
        x1 = MARGIN_LEFT,
        x2 = WIDTH - MARGIN_RIGHT,
        y = MARGIN_TOP + plot_height(),
        c = AXIS_COLOR
    );
}

fn line_chart(x: &[NaiveDateTime], y: &[f64]) -> String {
    let mut svg = String::new();
    let scale = YScale::fit(y, false);
    y_axis(&mut svg, scale);

    let seconds: Vec<f64> = x.iter().map(|ts| ts.and_utc().timestamp() as f64).collect();
    let lo = seconds.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = seconds.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let x_px = |s: f64| {
        if hi > lo {
            MARGIN_LEFT + plot_width() * (s - lo) / (hi - lo)
        } else {
            MARGIN_LEFT + plot_width() / 2.0
        }
    };

    // Non-finite values break the line
    let mut segments: Vec<Vec<String>> = vec![Vec::new()];
    for (s, v) in seconds.iter().zip(y) {
        if v.is_finite() {
            if let Some(segment) = segments.last_mut() {
                segment.push(format!("{:.1},{:.1}", x_px(*s), scale.to_px(*v)));
            }
        } else if segments.last().is_some_and(|segment| !segment.is_empty()) {
            segments.push(Vec::new());
        }
    }
    for points in segments.iter().filter(|points| !points.is_empty()) {
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"#,
            LINE_COLOR,
            points.join(" ")
        );
    }

    let with_time = x.iter().any(|ts| ts.num_seconds_from_midnight() != 0);
    let step = x.len().div_ceil(MAX_X_TICKS).max(1);
    for (ts, s) in x.iter().zip(&seconds).step_by(step) {
        let label = if with_time {
            ts.format("%Y-%m-%d %H:%M").to_string()
        } else {
            ts.format("%Y-%m-%d").to_string()
        };
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="middle">{}</text>"#,
            x_px(*s),
            MARGIN_TOP + plot_height() + 16.0,
            label
        );
    }
    svg
}

fn bar_chart(labels: &[String], y: &[f64]) -> String {
    let mut svg = String::new();
    let scale = YScale::fit(y, true);
    y_axis(&mut svg, scale);

    let band = plot_width() / y.len() as f64;
    let bar = band * 0.8;
    let zero = scale.to_px(0.0);
    for (i, (label, value)) in labels.iter().zip(y).enumerate() {
        let left = MARGIN_LEFT + band * i as f64 + (band - bar) / 2.0;
        if value.is_finite() {
            let top = scale.to_px(*value).min(zero);
            let height = (scale.to_px(*value) - zero).abs();
            let _ = writeln!(
                svg,
                r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
                left, top, bar, height, LINE_COLOR
            );
        }

        let cx = left + bar / 2.0;
        let ly = MARGIN_TOP + plot_height() + 12.0;
        let _ = writeln!(
            svg,
            r#"<text x="{cx:.1}" y="{ly:.1}" font-size="8" text-anchor="end" transform="rotate(-45 {cx:.1} {ly:.1})">{}</text>"#,
            escape(label)
        );
    }
    svg
}

fn format_tick(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
