//! Execution of a validated graph

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use uuid::Uuid;

use insight_graph_sdk::{
    log_intent_routed, log_node_complete, log_node_failed, log_node_start, log_run_complete,
    log_run_start,
};

use super::{GraphState, NodeFn, RunContext, Transition, END};

/// A graph that passed [`StateGraph::compile`](super::StateGraph::compile)
pub struct CompiledGraph<S> {
    name: String,
    nodes: HashMap<String, NodeFn<S>>,
    entry: String,
    transitions: HashMap<String, Transition<S>>,
}

/// State produced by one node
#[derive(Debug, Clone)]
pub struct TraceStep<S> {
    pub node: String,
    pub state: S,
}

/// Every state a run went through, in order
#[derive(Debug, Clone)]
pub struct RunTrace<S> {
    pub run_id: Uuid,
    pub initial: S,
    pub steps: Vec<TraceStep<S>>,
}

impl<S> RunTrace<S> {
    /// State after the last executed node
    pub fn final_state(&self) -> &S {
        self.steps
            .last()
            .map(|step| &step.state)
            .unwrap_or(&self.initial)
    }

    pub fn into_final_state(self) -> S {
        match self.steps.into_iter().last() {
            Some(step) => step.state,
            None => self.initial,
        }
    }

    /// State as it was handed to `node`
    pub fn state_before(&self, node: &str) -> Option<&S> {
        let idx = self.steps.iter().position(|step| step.node == node)?;
        Some(match idx {
            0 => &self.initial,
            _ => &self.steps[idx - 1].state,
        })
    }

    /// Names of the executed nodes
    pub fn path(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.node.as_str()).collect()
    }
}

impl<S: GraphState> CompiledGraph<S> {
    pub(super) fn new(
        name: String,
        nodes: HashMap<String, NodeFn<S>>,
        entry: String,
        transitions: HashMap<String, Transition<S>>,
    ) -> Self {
        Self {
            name,
            nodes,
            entry,
            transitions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the graph to the end marker and return the final state
    pub fn invoke(&self, initial: S) -> Result<S> {
        Ok(self.invoke_with_trace(initial)?.into_final_state())
    }

    /// Run the graph and keep every intermediate state
    ///
    /// Nodes run one after another on the caller's thread. A node error stops
    /// the run; nothing is retried here.
    pub fn invoke_with_trace(&self, initial: S) -> Result<RunTrace<S>> {
        let ctx = RunContext::new(&self.name);
        log_run_start!(ctx.run_id, &self.name, initial.run_label());

        let mut trace = RunTrace {
            run_id: ctx.run_id,
            initial: initial.clone(),
            steps: Vec::new(),
        };
        let mut state = initial;
        let mut current = self.entry.clone();

        loop {
            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| anyhow!("Graph '{}' has no node '{}'", self.name, current))?;

            log_node_start!(ctx.run_id, &current);
            let next = match node(&state, &ctx) {
                Ok(next) => next,
                Err(e) => {
                    log_node_failed!(ctx.run_id, &current, format!("{:#}", e));
                    return Err(e.context(format!("Node '{}' failed", current)));
                }
            };
            log_node_complete!(ctx.run_id, &current);

            trace.steps.push(TraceStep {
                node: current.clone(),
                state: next.clone(),
            });
            state = next;

            let target = self.next_target(&current, &state, &ctx)?;
            if target == END {
                state.check_terminal().with_context(|| {
                    format!("Graph '{}' reached the end after '{}'", self.name, current)
                })?;
                log_run_complete!(ctx.run_id, &self.name);
                return Ok(trace);
            }
            current = target;
        }
    }

    fn next_target(&self, current: &str, state: &S, ctx: &RunContext) -> Result<String> {
        let transition = self
            .transitions
            .get(current)
            .ok_or_else(|| anyhow!("Node '{}' has no outgoing transition", current))?;

        match transition {
            Transition::Static(target) => Ok(target.clone()),
            Transition::Conditional { router, routes } => {
                let key = router(state);
                let target = routes.get(&key).ok_or_else(|| {
                    anyhow!(
                        "Router after '{}' returned '{}', which has no route",
                        current,
                        key
                    )
                })?;
                log_intent_routed!(ctx.run_id, &key, target);
                Ok(target.clone())
            }
        }
    }
}
