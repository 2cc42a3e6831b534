//! Chart selection on extracted tables

use insight_graph::chart::{select_chart, svg, ChartDecision, ChartSpec, MAX_CATEGORIES};
use insight_graph::extract::TableExtractor;

fn decide(text: &str) -> ChartDecision {
    select_chart(&TableExtractor::default().extract(text).unwrap())
}

#[test]
fn test_non_numeric_values_are_not_charted() {
    assert_eq!(decide("City,Rating\nNYC,great"), ChartDecision::None);
}

#[test]
fn test_dates_give_time_series_of_every_row() {
    match decide("Date,Revenue\n2024-01-01,100.0\n2024-01-02,150.0") {
        ChartDecision::TimeSeries { x, y } => {
            assert_eq!(x.len(), 2);
            assert_eq!(y, vec![100.0, 150.0]);
            assert!(x[0] < x[1]);
        }
        other => panic!("expected time series, got {:?}", other),
    }
}

#[test]
fn test_fifty_categories_are_capped() {
    let mut text = String::from("Store,Revenue");
    for i in 1..=50 {
        text.push_str(&format!("\nStore {},{}.5", i, i));
    }
    let decision = decide(&text);
    assert_eq!(decision.len(), MAX_CATEGORIES);
    match decision {
        ChartDecision::Categorical { labels, .. } => {
            assert_eq!(labels.first().map(String::as_str), Some("Store 1"));
            assert_eq!(labels.last().map(String::as_str), Some("Store 30"));
        }
        other => panic!("expected categorical, got {:?}", other),
    }
}

#[test]
fn test_rendered_bar_chart_has_thirty_bars() {
    let mut text = String::from("Store,Revenue");
    for i in 1..=50 {
        text.push_str(&format!("\nS{},{}", i, i));
    }
    let table = TableExtractor::default().extract(&text).unwrap();
    let decision = select_chart(&table);
    let spec = ChartSpec::for_table("Store leaderboard", &table, &decision);

    let document = svg::render(&decision, &spec).unwrap();
    // background rect plus one per bar
    assert_eq!(document.matches("<rect").count(), MAX_CATEGORIES + 1);
    assert!(document.contains(">S30</text>"));
    assert!(!document.contains(">S31</text>"));
}
