//! Common utilities for pipeline tests

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use insight_graph::agent::claude::{ApiContent, MessagesApi, MessagesRequest, MessagesResponse};
use insight_graph::agent::ReasoningAgent;
use insight_graph::graph::RunContext;

/// Create a temporary directory for testing
pub fn create_temp_dir(name: &str) -> PathBuf {
    let temp_dir = std::env::temp_dir().join(format!("insight_graph_test_{}", name));
    if temp_dir.exists() {
        std::fs::remove_dir_all(&temp_dir).ok();
    }
    std::fs::create_dir_all(&temp_dir).unwrap();
    temp_dir
}

/// Clean up temporary directory
pub fn cleanup_temp_dir(path: &PathBuf) {
    if path.exists() {
        std::fs::remove_dir_all(path).ok();
    }
}

/// Small retail database plus one table outside the default include-list
pub fn create_retail_db(dir: &Path) -> PathBuf {
    let path = dir.join("retail.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE sales_data (Date TEXT, Store TEXT, Product TEXT, Units INTEGER, Revenue REAL);
         INSERT INTO sales_data VALUES ('2024-01-01 09:15:00', 'S1', 'Milk', 2, 7.0);
         INSERT INTO sales_data VALUES ('2024-01-01 12:40:00', 'S2', 'Bread', 1, 2.5);
         INSERT INTO sales_data VALUES ('2024-01-02 10:05:00', 'S1', 'Eggs', 3, 9.75);
         INSERT INTO sales_data VALUES ('2024-01-03 16:30:00', 'S3', 'Milk', 4, 14.0);
         CREATE TABLE stores (Store TEXT, City TEXT);
         INSERT INTO stores VALUES ('S1', 'Austin'), ('S2', 'Dallas'), ('S3', 'Waco');
         CREATE TABLE customer_feedback (Date TEXT, Store TEXT, Rating INTEGER, Comment TEXT);
         INSERT INTO customer_feedback VALUES ('2024-01-01', 'S1', 5, 'Great, fast checkout');
         CREATE TABLE audit_log (Entry TEXT);
         INSERT INTO audit_log VALUES ('internal');",
    )
    .unwrap();
    path
}

/// Tables the default include-list would show for [`create_retail_db`]
pub fn retail_tables() -> Vec<String> {
    vec![
        "sales_data".to_string(),
        "products".to_string(),
        "stores".to_string(),
        "inventory".to_string(),
        "customer_feedback".to_string(),
    ]
}

/// Agent that replays canned answers and records the prompts it got
pub struct ScriptedAgent {
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(reply: &str) -> Self {
        Self::new(vec![Ok(reply)])
    }
}

impl ReasoningAgent for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    fn answer(&self, _ctx: &RunContext, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(error)) => Err(anyhow!(error)),
            None => Err(anyhow!("scripted agent has no replies left")),
        }
    }
}

/// Messages API stand-in that replays responses and records requests
pub struct ScriptedApi {
    responses: Mutex<VecDeque<MessagesResponse>>,
    pub requests: Mutex<Vec<MessagesRequest>>,
}

impl ScriptedApi {
    pub fn new(responses: Vec<Vec<ApiContent>>) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|content| MessagesResponse {
                        content,
                        stop_reason: None,
                    })
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MessagesApi for ScriptedApi {
    fn create(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted API has no responses left"))
    }
}

pub fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ApiContent {
    ApiContent::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}
