//! Intent router
//!
//! Classifies a question and dispatches it to the handler registered for its
//! intent:
//!
//! ```text
//! START ─> plan ─┬─> kpi ───────┐
//!                ├─> sentiment ─┼─> END
//!                └─> fallback ──┘
//! ```
//!
//! The stock handlers only describe what they would compute. They are kept as
//! explicit stubs until real KPI and sentiment computations exist.

pub mod intent;
pub mod registry;

pub use intent::{IntentClassifier, KeywordRule, KPI_KEYWORDS, SENTIMENT_KEYWORDS};
pub use registry::{Handler, HandlerRegistry};

use anyhow::Result;
use std::collections::BTreeMap;

use crate::graph::{CompiledGraph, RunContext, StateGraph, END, START};
use crate::state::{Intent, PipelineState};

pub const PLAN_NODE: &str = "plan";

pub const KPI_ANSWER: &str =
    "KPI branch: I would compute metrics (revenue/units) and return a chart.";
pub const SENTIMENT_ANSWER: &str =
    "Sentiment branch: I would aggregate daily sentiment from feedback data and plot a trend.";
pub const FALLBACK_ANSWER: &str =
    "Sorry, I didn’t understand. Try asking about revenue trend, top products, store leaderboard, or sentiment.";

/// Classification node: sets the intent and nothing else
pub fn plan_node(
    classifier: IntentClassifier,
) -> impl Fn(&PipelineState, &RunContext) -> Result<PipelineState> + Send + Sync + 'static {
    move |state, _ctx| state.with_intent(classifier.classify(state.question()))
}

/// Registry with the stub KPI, sentiment and fallback handlers
pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new(Intent::Fallback);
    registry
        .register(Intent::Kpi, "kpi", |state, _ctx| {
            Ok(state.with_message(KPI_ANSWER))
        })
        .register(Intent::Sentiment, "sentiment", |state, _ctx| {
            Ok(state.with_message(SENTIMENT_ANSWER))
        })
        .register(Intent::Fallback, "fallback", |state, _ctx| {
            Ok(state.with_message(FALLBACK_ANSWER))
        });
    registry
}

/// Wire `plan` and one node per registered handler
///
/// Every handler is terminal. Use [`add_dispatch`] directly when handlers need
/// follow-up nodes.
pub fn build_router_graph(
    name: &str,
    classifier: IntentClassifier,
    registry: &HandlerRegistry,
) -> Result<CompiledGraph<PipelineState>> {
    let mut graph = StateGraph::new(name);
    add_dispatch(&mut graph, classifier, registry)?;
    for handler in registry.handlers() {
        graph.add_edge(&handler.node, END)?;
    }
    graph.compile()
}

/// Add the `plan` node, the handler nodes and the conditional fan-out
/// between them. Outgoing edges of the handler nodes are left to the caller.
pub fn add_dispatch(
    graph: &mut StateGraph<PipelineState>,
    classifier: IntentClassifier,
    registry: &HandlerRegistry,
) -> Result<()> {
    registry.validate()?;

    graph.add_node(PLAN_NODE, plan_node(classifier))?;
    graph.add_edge(START, PLAN_NODE)?;

    for handler in registry.handlers() {
        let run = handler.run.clone();
        graph.add_node(&handler.node, move |state, ctx| run(state, ctx))?;
    }

    let fallback = registry.fallback();
    graph.add_conditional_edges(
        PLAN_NODE,
        move |state: &PipelineState| state.intent().unwrap_or(fallback).as_str().to_string(),
        dispatch_routes(registry)?,
    )?;
    Ok(())
}

/// Route table for the fan-out after `plan`: intent name to handler node
///
/// Every intent gets an entry; intents without a handler of their own map to
/// the fallback handler's node.
pub fn dispatch_routes(registry: &HandlerRegistry) -> Result<BTreeMap<String, String>> {
    Intent::ALL
        .iter()
        .map(|intent| -> Result<(String, String)> {
            let node = registry.resolve(Some(*intent))?.node.clone();
            Ok((intent.as_str().to_string(), node))
        })
        .collect()
}

/// Compiled router with the stock classifier and handlers
pub fn intent_router() -> Result<CompiledGraph<PipelineState>> {
    build_router_graph("intent_router", IntentClassifier::default(), &default_registry())
}

/// Route a single question through the stock router
pub fn route_question(question: &str) -> Result<PipelineState> {
    intent_router()?.invoke(PipelineState::new(question)?)
}
