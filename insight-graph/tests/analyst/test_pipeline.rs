//! End-to-end runs of the router and the agent-backed graph

use serde_json::json;
use std::fs;
use std::sync::Arc;

use insight_graph::agent::claude::{ApiContent, ClaudeSqlAgent};
use insight_graph::agent::tools::QUERY;
use insight_graph::agent::SqlToolbox;
use insight_graph::analyst::{agent_prompt, build_analyst_graph, PARSE_VISUALIZE_NODE};
use insight_graph::persist::{ResultPersister, CHART_FILE, NO_OUTPUT_MESSAGE, RESULT_FILE};
use insight_graph::router::{route_question, FALLBACK_ANSWER};
use insight_graph::state::{Intent, PipelineState};
use insight_graph::store::SqlStore;

use super::common::{
    cleanup_temp_dir, create_retail_db, create_temp_dir, retail_tables, tool_use, ScriptedAgent,
    ScriptedApi,
};

#[test]
fn test_router_questions() {
    let kpi = route_question("Show revenue trend for last 30 days").unwrap();
    assert_eq!(kpi.intent(), Some(Intent::Kpi));

    let mixed = route_question("Show revenue trend and sentiment feedback").unwrap();
    assert_eq!(mixed.intent(), Some(Intent::Sentiment));

    let other = route_question("Tell me something random").unwrap();
    assert_eq!(other.intent(), Some(Intent::Fallback));
    assert_eq!(other.message(), Some(FALLBACK_ANSWER));

    assert!(route_question("   ").is_err());
}

#[test]
fn test_time_series_answer_saves_table_and_chart() {
    let dir = create_temp_dir("pipeline_series");
    let agent = Arc::new(ScriptedAgent::answering(
        "```csv\nDate,Revenue\n2024-01-01,100.0\n2024-01-02,150.0\n```",
    ));
    let graph = build_analyst_graph(agent.clone(), ResultPersister::new(&dir)).unwrap();

    let state = graph
        .invoke(PipelineState::new("Show revenue trend for the last 30 days").unwrap())
        .unwrap();

    let table = dir.join(RESULT_FILE);
    let chart = dir.join(CHART_FILE);
    assert_eq!(state.result_table_path(), Some(table.as_path()));
    assert_eq!(state.chart_path(), Some(chart.as_path()));
    assert_eq!(
        state.message(),
        Some(format!("Saved {} and {}", table.display(), chart.display()).as_str())
    );
    assert_eq!(
        fs::read_to_string(&table).unwrap(),
        "Date,Revenue\n2024-01-01,100.0\n2024-01-02,150.0\n"
    );
    let svg = fs::read_to_string(&chart).unwrap();
    assert!(svg.contains("Show revenue trend for the last 30 days"));
    assert!(svg.contains("<polyline"));

    assert_eq!(
        agent.prompts.lock().unwrap().as_slice(),
        &[agent_prompt("Show revenue trend for the last 30 days")]
    );

    cleanup_temp_dir(&dir);
}

#[test]
fn test_unchartable_table_saves_csv_only() {
    let dir = create_temp_dir("pipeline_table_only");
    let graph = build_analyst_graph(
        ScriptedAgent::answering("City,Rating\nNYC,great\nLA,fine"),
        ResultPersister::new(&dir),
    )
    .unwrap();

    let state = graph
        .invoke(PipelineState::new("How do customers rate each city?").unwrap())
        .unwrap();

    assert_eq!(state.chart_path(), None);
    assert!(state.result_table_path().is_some());
    assert_eq!(
        state.message(),
        Some(format!("Saved {}", dir.join(RESULT_FILE).display()).as_str())
    );
    assert!(!dir.join(CHART_FILE).exists());

    cleanup_temp_dir(&dir);
}

#[test]
fn test_text_answer_and_empty_answer() {
    let dir = create_temp_dir("pipeline_text");
    let graph = build_analyst_graph(
        ScriptedAgent::new(vec![Ok("Revenue is flat this month."), Ok("")]),
        ResultPersister::new(&dir),
    )
    .unwrap();

    let text = graph.invoke(PipelineState::new("Revenue?").unwrap()).unwrap();
    assert_eq!(text.message(), Some("Revenue is flat this month."));
    assert_eq!(text.result_table_path(), None);

    let empty = graph.invoke(PipelineState::new("Revenue?").unwrap()).unwrap();
    assert_eq!(empty.message(), Some(NO_OUTPUT_MESSAGE));
    assert!(!dir.join(RESULT_FILE).exists());

    cleanup_temp_dir(&dir);
}

#[test]
fn test_agent_error_aborts_before_persisting() {
    let dir = create_temp_dir("pipeline_error");
    let graph = build_analyst_graph(
        ScriptedAgent::new(vec![Err("quota exceeded")]),
        ResultPersister::new(&dir),
    )
    .unwrap();

    let err = graph
        .invoke_with_trace(PipelineState::new("Top products").unwrap())
        .unwrap_err();
    assert!(format!("{:#}", err).contains("quota exceeded"));
    assert!(!dir.join(RESULT_FILE).exists());

    cleanup_temp_dir(&dir);
}

#[test]
fn test_trace_shows_raw_output_before_parsing() {
    let dir = create_temp_dir("pipeline_trace");
    let graph = build_analyst_graph(
        ScriptedAgent::answering("Store,Revenue\nS1,10\nS2,20"),
        ResultPersister::new(&dir),
    )
    .unwrap();

    let trace = graph
        .invoke_with_trace(PipelineState::new("Store leaderboard").unwrap())
        .unwrap();
    let before = trace.state_before(PARSE_VISUALIZE_NODE).unwrap();
    assert_eq!(before.raw_output(), Some("Store,Revenue\nS1,10\nS2,20"));
    assert_eq!(before.message(), None);
    assert!(trace.final_state().chart_path().is_some());

    cleanup_temp_dir(&dir);
}

#[test]
fn test_claude_agent_end_to_end() {
    let dir = create_temp_dir("pipeline_claude");
    let db = create_retail_db(&dir);
    let out = dir.join("outputs");

    let api = ScriptedApi::new(vec![
        vec![tool_use(
            "tu_1",
            QUERY,
            json!({ "query": "SELECT DATE(Date) AS Date, SUM(Revenue) AS Revenue FROM sales_data GROUP BY DATE(Date) ORDER BY Date" }),
        )],
        vec![ApiContent::text(
            "```csv\nDate,Revenue\n2024-01-01,9.5\n2024-01-02,9.75\n2024-01-03,14.0\n```",
        )],
    ]);
    let store = SqlStore::open(&db, Some(retail_tables())).unwrap();
    let agent = ClaudeSqlAgent::new(api, SqlToolbox::new(store));
    let graph = build_analyst_graph(agent, ResultPersister::new(&out)).unwrap();

    let state = graph
        .invoke(PipelineState::new("Show daily revenue").unwrap())
        .unwrap();

    assert!(state.message().unwrap().starts_with("Saved "));
    assert_eq!(
        fs::read_to_string(out.join(RESULT_FILE)).unwrap(),
        "Date,Revenue\n2024-01-01,9.5\n2024-01-02,9.75\n2024-01-03,14.0\n"
    );
    assert!(out.join(CHART_FILE).exists());

    cleanup_temp_dir(&dir);
}
