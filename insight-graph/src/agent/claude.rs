//! Claude tool-use agent over the Anthropic Messages API
//!
//! [`ClaudeSqlAgent`] runs the usual tool loop: send the conversation, run
//! every `tool_use` block against the [`SqlToolbox`], append the results and
//! repeat until the model answers without calling a tool.
//!
//! # Configuration
//!
//! - API key: `ANTHROPIC_API_KEY`, see [`crate::config::PipelineConfig`]
//! - Model: defaults to [`DEFAULT_MODEL`]
//!
//! The transport sits behind [`MessagesApi`] so the loop can be driven by a
//! scripted fake in tests.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use insight_graph_sdk::{
    log_agent_complete, log_agent_failed, log_agent_message, log_agent_start, log_tool_invoked,
};

use super::tools::SqlToolbox;
use super::ReasoningAgent;
use crate::graph::RunContext;

/// Anthropic API base URL
pub const API_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Default model to use
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// API version header
const API_VERSION: &str = "2023-06-01";

pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_MAX_ITERATIONS: usize = 15;
pub const DEFAULT_TOP_K: usize = 10;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Request body for the Messages API
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ApiTool>,
}

/// Message format for the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: Vec<ApiContent>,
}

impl ApiMessage {
    pub fn user(content: Vec<ApiContent>) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }

    pub fn assistant(content: Vec<ApiContent>) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
        }
    }
}

/// Content block for API messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
    /// Block types the agent does not act on
    #[serde(other)]
    Other,
}

impl ApiContent {
    pub fn text(text: impl Into<String>) -> Self {
        ApiContent::Text { text: text.into() }
    }
}

/// Tool definition for the API
#[derive(Debug, Clone, Serialize)]
pub struct ApiTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Response body of the Messages API
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ApiContent>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

// =============================================================================
// Transport
// =============================================================================

/// One Messages API round trip
pub trait MessagesApi: Send + Sync {
    fn create(&self, request: &MessagesRequest) -> Result<MessagesResponse>;
}

impl<T: MessagesApi + ?Sized> MessagesApi for Arc<T> {
    fn create(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        (**self).create(request)
    }
}

/// Blocking HTTP transport
///
/// Owns a current-thread tokio runtime so callers stay synchronous. Must not
/// be called from inside another tokio runtime.
pub struct HttpMessagesApi {
    client: Client,
    api_key: String,
    base_url: String,
    runtime: tokio::runtime::Runtime,
}

impl HttpMessagesApi {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start HTTP runtime")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: API_BASE_URL.to_string(),
            runtime,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl MessagesApi for HttpMessagesApi {
    fn create(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url.trim_end_matches('/'));
        self.runtime.block_on(async {
            let response = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .header("content-type", "application/json")
                .json(request)
                .send()
                .await
                .with_context(|| format!("Failed to reach {}", url))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                bail!("Messages API returned {}: {}", status, body);
            }

            response
                .json::<MessagesResponse>()
                .await
                .context("Failed to decode Messages API response")
        })
    }
}

// =============================================================================
// SQL Agent
// =============================================================================

/// Tool-calling SQL agent
pub struct ClaudeSqlAgent<A: MessagesApi> {
    name: String,
    api: A,
    tools: SqlToolbox,
    model: String,
    max_tokens: u32,
    max_iterations: usize,
    top_k: usize,
}

impl<A: MessagesApi> ClaudeSqlAgent<A> {
    pub fn new(api: A, tools: SqlToolbox) -> Self {
        Self {
            name: "sql_agent".to_string(),
            api,
            tools,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are an agent that answers questions about a SQLite database.\n\
             Given a question, write a syntactically correct SQLite query, run it, \
             look at the results and answer the question.\n\
             Unless the question asks for a specific number of rows, limit your query to at most {top_k} results.\n\
             Order the results by a relevant column to return the most interesting rows.\n\
             Only select the columns relevant to the question, never all columns of a table.\n\
             Only use information returned by the tools to build the final answer.\n\
             If a query fails, rewrite it and try again.\n\n\
             Do NOT issue INSERT, UPDATE, DELETE, DROP or any other statement that changes data.\n\n\
             Always start by calling {list} to see what you can query, \
             then call {schema} for the most relevant tables.",
            top_k = self.top_k,
            list = super::tools::LIST_TABLES,
            schema = super::tools::SCHEMA,
        )
    }

    fn request(&self, messages: &[ApiMessage]) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(self.system_prompt()),
            messages: messages.to_vec(),
            tools: self.tools.definitions(),
        }
    }

    fn run_loop(&self, ctx: &RunContext, prompt: &str) -> Result<String> {
        let mut messages = vec![ApiMessage::user(vec![ApiContent::text(prompt)])];

        for iteration in 1..=self.max_iterations {
            let response = self
                .api
                .create(&self.request(&messages))
                .with_context(|| format!("Messages API call {} failed", iteration))?;

            let mut text = Vec::new();
            let mut results = Vec::new();
            for block in &response.content {
                match block {
                    ApiContent::Text { text: t } => {
                        log_agent_message!(ctx.run_id, &self.name, t);
                        text.push(t.as_str());
                    }
                    ApiContent::ToolUse { id, name, input } => {
                        log_tool_invoked!(ctx.run_id, &self.name, name, input);
                        let (content, is_error) = match self.tools.call(name, input) {
                            Ok(output) => (output, false),
                            Err(e) => (format!("Error: {:#}", e), true),
                        };
                        results.push(ApiContent::ToolResult {
                            tool_use_id: id.clone(),
                            content,
                            is_error,
                        });
                    }
                    ApiContent::ToolResult { .. } | ApiContent::Other => {}
                }
            }

            if results.is_empty() {
                return Ok(text.join("\n"));
            }

            let assistant: Vec<ApiContent> = response
                .content
                .iter()
                .filter(|block| !matches!(block, ApiContent::Other))
                .cloned()
                .collect();
            messages.push(ApiMessage::assistant(assistant));
            messages.push(ApiMessage::user(results));
        }

        bail!(
            "Agent did not finish within {} iterations",
            self.max_iterations
        )
    }
}

impl<A: MessagesApi> ReasoningAgent for ClaudeSqlAgent<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn answer(&self, ctx: &RunContext, prompt: &str) -> Result<String> {
        log_agent_start!(ctx.run_id, &self.name, format!("Answering with {}", self.model));
        match self.run_loop(ctx, prompt) {
            Ok(answer) => {
                log_agent_complete!(ctx.run_id, &self.name, &answer);
                Ok(answer)
            }
            Err(e) => {
                log_agent_failed!(ctx.run_id, &self.name, format!("{:#}", e));
                Err(e)
            }
        }
    }
}
