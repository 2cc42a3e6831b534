//! Claude tool loop driven by a scripted Messages API

use serde_json::json;
use std::sync::Arc;

use insight_graph::agent::claude::{ApiContent, ClaudeSqlAgent};
use insight_graph::agent::tools::{LIST_TABLES, QUERY, SCHEMA};
use insight_graph::agent::{ReasoningAgent, SqlToolbox};
use insight_graph::graph::RunContext;
use insight_graph::store::SqlStore;

use super::common::{
    cleanup_temp_dir, create_retail_db, create_temp_dir, retail_tables, tool_use, ScriptedApi,
};

fn toolbox(name: &str) -> (std::path::PathBuf, SqlToolbox) {
    let dir = create_temp_dir(name);
    let db = create_retail_db(&dir);
    let store = SqlStore::open(&db, Some(retail_tables())).unwrap();
    (dir, SqlToolbox::new(store))
}

/// Tool results sent back in the request at `idx`
fn tool_results(api: &ScriptedApi, idx: usize) -> Vec<(String, String, bool)> {
    let requests = api.requests.lock().unwrap();
    let last = requests[idx].messages.last().unwrap();
    assert_eq!(last.role, "user");
    last.content
        .iter()
        .filter_map(|block| match block {
            ApiContent::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some((tool_use_id.clone(), content.clone(), *is_error)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_tools_run_against_sqlite() {
    let (dir, tools) = toolbox("loop_tools");
    let api = ScriptedApi::new(vec![
        vec![
            ApiContent::text("Let me look at the tables."),
            tool_use("tu_1", LIST_TABLES, json!({})),
        ],
        vec![tool_use("tu_2", SCHEMA, json!({ "table_names": "stores" }))],
        vec![tool_use(
            "tu_3",
            QUERY,
            json!({ "query": "SELECT Store, City FROM stores ORDER BY Store" }),
        )],
        vec![ApiContent::text("Store,City\nS1,Austin\nS2,Dallas\nS3,Waco")],
    ]);
    let agent = ClaudeSqlAgent::new(api, tools);

    let answer = agent
        .answer(&RunContext::new("test"), "Which cities have stores?")
        .unwrap();
    assert_eq!(answer, "Store,City\nS1,Austin\nS2,Dallas\nS3,Waco");

    cleanup_temp_dir(&dir);
}

#[test]
fn test_conversation_carries_tool_results() {
    let (dir, tools) = toolbox("loop_history");
    let api = Arc::new(ScriptedApi::new(vec![
        vec![tool_use("tu_1", LIST_TABLES, json!({}))],
        vec![tool_use(
            "tu_2",
            QUERY,
            json!({ "query": "SELECT COUNT(*) AS n FROM sales_data" }),
        )],
        vec![ApiContent::text("There are 4 sales.")],
    ]));
    let agent = ClaudeSqlAgent::new(api.clone(), tools).with_top_k(7);

    let answer = agent
        .answer(&RunContext::new("test"), "How many sales?")
        .unwrap();
    assert_eq!(answer, "There are 4 sales.");

    {
        let requests = api.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[2].messages.len(), 5);
        assert_eq!(requests[0].tools.len(), 3);
        let system = requests[0].system.as_deref().unwrap();
        assert!(system.contains("at most 7 results"));
    }

    assert_eq!(
        tool_results(&api, 1),
        vec![(
            "tu_1".to_string(),
            "customer_feedback, sales_data, stores".to_string(),
            false
        )]
    );
    assert_eq!(
        tool_results(&api, 2),
        vec![("tu_2".to_string(), "n\n4".to_string(), false)]
    );

    cleanup_temp_dir(&dir);
}

#[test]
fn test_tool_errors_go_back_to_the_model() {
    let (dir, tools) = toolbox("loop_errors");
    let api = Arc::new(ScriptedApi::new(vec![
        vec![tool_use("tu_1", QUERY, json!({ "query": "DROP TABLE stores" }))],
        vec![ApiContent::text("I can only read data.")],
    ]));
    let agent = ClaudeSqlAgent::new(api.clone(), tools);

    let answer = agent
        .answer(&RunContext::new("test"), "Drop the stores table")
        .unwrap();
    assert_eq!(answer, "I can only read data.");

    let results = tool_results(&api, 1);
    assert_eq!(results.len(), 1);
    assert!(results[0].1.starts_with("Error:"));
    assert!(results[0].2);

    cleanup_temp_dir(&dir);
}

#[test]
fn test_iteration_bound() {
    let (dir, tools) = toolbox("loop_bound");
    let api = ScriptedApi::new(vec![
        vec![tool_use("tu_1", LIST_TABLES, json!({}))],
        vec![tool_use("tu_2", LIST_TABLES, json!({}))],
        vec![tool_use("tu_3", LIST_TABLES, json!({}))],
    ]);
    let agent = ClaudeSqlAgent::new(api, tools).with_max_iterations(2);

    let err = agent
        .answer(&RunContext::new("test"), "Keep going")
        .unwrap_err();
    assert!(err.to_string().contains("2 iterations"));

    cleanup_temp_dir(&dir);
}

#[test]
fn test_transport_failure_is_fatal() {
    let (dir, tools) = toolbox("loop_transport");
    let agent = ClaudeSqlAgent::new(ScriptedApi::new(vec![]), tools);

    let err = agent
        .answer(&RunContext::new("test"), "Anything")
        .unwrap_err();
    let chain = format!("{:#}", err);
    assert!(chain.contains("Messages API call 1 failed"));
    assert!(chain.contains("no responses left"));

    cleanup_temp_dir(&dir);
}
