//! Chart selection
//!
//! Decides whether an extracted table can be plotted and how:
//!
//! - fewer than two columns, or no rows: no chart
//! - second column not numeric in every row: no chart
//! - first column a date in every row: time series, all rows in table order
//! - otherwise: bar chart over the first [`MAX_CATEGORIES`] rows
//!
//! Rendering lives in [`svg`].

pub mod svg;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::extract::ParsedTable;

/// Bar charts never show more than this many rows
pub const MAX_CATEGORIES: usize = 30;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// What to draw for a table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartDecision {
    None,
    TimeSeries { x: Vec<NaiveDateTime>, y: Vec<f64> },
    Categorical { labels: Vec<String>, y: Vec<f64> },
}

impl ChartDecision {
    pub fn is_none(&self) -> bool {
        matches!(self, ChartDecision::None)
    }

    /// Number of plotted points or bars
    pub fn len(&self) -> usize {
        match self {
            ChartDecision::None => 0,
            ChartDecision::TimeSeries { y, .. } | ChartDecision::Categorical { y, .. } => y.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Title and axis names that go with a decision
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    /// Bar charts have no x axis title
    pub x_label: Option<String>,
    pub y_label: String,
}

impl ChartSpec {
    pub fn for_table(title: &str, table: &ParsedTable, decision: &ChartDecision) -> Self {
        let header = table.header();
        let column = |idx: usize| header.get(idx).cloned().unwrap_or_default();
        Self {
            title: title.to_string(),
            x_label: match decision {
                ChartDecision::TimeSeries { .. } => Some(column(0)),
                _ => None,
            },
            y_label: column(1),
        }
    }
}

pub fn select_chart(table: &ParsedTable) -> ChartDecision {
    if table.column_count() < 2 || table.row_count() == 0 {
        return ChartDecision::None;
    }

    let mut y = Vec::with_capacity(table.row_count());
    for row in table.rows() {
        match parse_number(&row[1]) {
            Some(value) => y.push(value),
            None => return ChartDecision::None,
        }
    }

    let timestamps: Option<Vec<NaiveDateTime>> =
        table.rows().iter().map(|row| parse_timestamp(&row[0])).collect();
    if let Some(x) = timestamps {
        return ChartDecision::TimeSeries { x, y };
    }

    let labels = table
        .rows()
        .iter()
        .take(MAX_CATEGORIES)
        .map(|row| row[0].clone())
        .collect();
    y.truncate(MAX_CATEGORIES);
    ChartDecision::Categorical { labels, y }
}

/// Decimal number, surrounding whitespace allowed
///
/// `NaN`, `inf` and `-inf` are numbers too; the renderer leaves gaps for them.
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

/// ISO-8601 date or date-time
///
/// Offsets are dropped after converting to the offset's wall-clock time, so
/// `2024-01-01T10:00:00+02:00` reads as 10:00.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.len() < 10 {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }

    let with_offset = match value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        Some(rest) => format!("{}+00:00", rest),
        None => value.to_string(),
    };
    OFFSET_DATETIME_FORMATS.iter().find_map(|format| {
        DateTime::parse_from_str(&with_offset, format)
            .ok()
            .map(|dt| dt.naive_local())
    })
}
