//! Agent-backed analytics pipeline
//!
//! ```text
//! START ─> plan ─> agent ─> parse_visualize ─> END
//! ```
//!
//! `plan` always routes to `agent`, which asks the [`ReasoningAgent`] and keeps
//! its answer as `raw_output`. `parse_visualize` turns that answer into
//! artifacts through the [`ResultPersister`] and sets the final message.

use anyhow::Result;
use std::sync::Arc;

use crate::agent::ReasoningAgent;
use crate::graph::{CompiledGraph, RunContext, StateGraph, END};
use crate::persist::ResultPersister;
use crate::router::{self, HandlerRegistry, IntentClassifier};
use crate::state::{Intent, PipelineState};

pub const AGENT_NODE: &str = "agent";
pub const PARSE_VISUALIZE_NODE: &str = "parse_visualize";

/// Prepended to every question sent to the agent
pub const SAFETY_PREAMBLE: &str = "Use only SELECT. Never modify data. \
If grouping by day, use DATE(Date) AS Date. \
When feasible, return results as CSV (first line headers, comma-separated).";

pub fn agent_prompt(question: &str) -> String {
    format!("{}\n\nQuestion: {}", SAFETY_PREAMBLE, question)
}

/// Build the compiled analyst graph around `agent`
pub fn build_analyst_graph<A>(agent: A, persister: ResultPersister) -> Result<CompiledGraph<PipelineState>>
where
    A: ReasoningAgent + 'static,
{
    let agent = Arc::new(agent);
    let mut registry = HandlerRegistry::new(Intent::DispatchToAgent);
    registry.register(Intent::DispatchToAgent, AGENT_NODE, move |state, ctx| {
        agent_step(agent.as_ref(), state, ctx)
    });

    let mut graph = StateGraph::new("analyst");
    router::add_dispatch(&mut graph, IntentClassifier::agent_only(), &registry)?;
    graph.add_node(PARSE_VISUALIZE_NODE, move |state, ctx| {
        parse_visualize_step(&persister, state, ctx)
    })?;
    graph.add_edge(AGENT_NODE, PARSE_VISUALIZE_NODE)?;
    graph.add_edge(PARSE_VISUALIZE_NODE, END)?;
    graph.compile()
}

/// Ask the agent; its failure fails the run
pub fn agent_step<A: ReasoningAgent + ?Sized>(
    agent: &A,
    state: &PipelineState,
    ctx: &RunContext,
) -> Result<PipelineState> {
    let answer = agent.answer(ctx, &agent_prompt(state.question()))?;
    Ok(state.with_raw_output(answer))
}

/// Persist whatever the agent's answer supports and set the message
pub fn parse_visualize_step(
    persister: &ResultPersister,
    state: &PipelineState,
    ctx: &RunContext,
) -> Result<PipelineState> {
    let outcome = persister.persist(ctx, state.question(), state.raw_output())?;

    let mut next = state.with_message(outcome.message);
    if let Some(path) = outcome.table_path {
        next = next.with_result_table(path);
    }
    if let Some(path) = outcome.chart_path {
        next = next.with_chart(path);
    }
    Ok(next)
}
