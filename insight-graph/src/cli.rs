//! Command-line arguments and entry points for the binaries

use anyhow::Result;
use clap::Parser;

use insight_graph_sdk::log_info;

use crate::agent::{ClaudeSqlAgent, HttpMessagesApi, SqlToolbox};
use crate::analyst::build_analyst_graph;
use crate::config::PipelineConfig;
use crate::persist::ResultPersister;
use crate::router::intent_router;
use crate::state::PipelineState;
use crate::store::SqlStore;

pub const DEFAULT_QUESTION: &str = "Show revenue trend for the last 30 days";

pub const DEMO_QUESTIONS: &[&str] = &[
    "Show revenue trend for last 30 days",
    "What’s the daily customer sentiment?",
    "Tell me something random",
];

/// Answer an analytics question with a SQL agent and save the results
///
/// Writes `result.csv` (and `chart.svg` when the result is chartable) to the
/// output directory and prints the agent's reply. Everything else is read
/// from the environment, see [`PipelineConfig`].
#[derive(Parser, Debug, Clone)]
#[command(name = "insight-graph")]
#[command(about = "Answer analytics questions over the retail database")]
#[command(version)]
pub struct Args {
    /// Question to answer
    #[arg(value_name = "QUESTION", default_value = DEFAULT_QUESTION)]
    pub question: String,
}

/// Route questions through the keyword router
#[derive(Parser, Debug, Clone)]
#[command(name = "intent-router")]
#[command(about = "Classify questions and show which branch would answer them")]
#[command(version)]
pub struct RouterArgs {
    /// Questions to route; a few demo questions when omitted
    #[arg(value_name = "QUESTION")]
    pub questions: Vec<String>,
}

impl RouterArgs {
    pub fn questions(&self) -> Vec<String> {
        if self.questions.is_empty() {
            DEMO_QUESTIONS.iter().map(|q| q.to_string()).collect()
        } else {
            self.questions.clone()
        }
    }
}

/// Run the agent-backed pipeline once and return the final message
pub fn run_analyst(config: &PipelineConfig, question: &str) -> Result<String> {
    let initial = PipelineState::new(question)?;
    let api_key = config.require_api_key()?;

    log_info!("Opening {}", config.db_path.display());
    let store = SqlStore::open(&config.db_path, Some(config.include_tables.clone()))?;
    let agent = ClaudeSqlAgent::new(HttpMessagesApi::new(api_key)?, SqlToolbox::new(store))
        .with_model(&config.model)
        .with_max_iterations(config.max_iterations)
        .with_top_k(config.top_k);

    let graph = build_analyst_graph(agent, ResultPersister::new(&config.output_dir))?;
    let state = graph.invoke(initial)?;
    Ok(state.message().unwrap_or_default().to_string())
}

/// Route each question and return `(question, answer)` pairs
pub fn run_router(questions: &[String]) -> Result<Vec<(String, String)>> {
    let graph = intent_router()?;
    let mut answers = Vec::with_capacity(questions.len());
    for question in questions {
        let state = graph.invoke(PipelineState::new(question.as_str())?)?;
        answers.push((
            question.clone(),
            state.message().unwrap_or_default().to_string(),
        ));
    }
    Ok(answers)
}
