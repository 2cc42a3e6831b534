//! Intent → handler mapping

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::graph::RunContext;
use crate::state::{Intent, PipelineState};

/// Handler body: same shape as a graph node
pub type HandlerFn = Arc<dyn Fn(&PipelineState, &RunContext) -> Result<PipelineState> + Send + Sync>;

/// A handler registered for one intent
#[derive(Clone)]
pub struct Handler {
    pub intent: Intent,
    /// Graph node name the handler runs under
    pub node: String,
    pub run: HandlerFn,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("intent", &self.intent)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// Maps each intent to exactly one handler
///
/// Intents without a handler of their own resolve to the fallback intent's
/// handler.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    handlers: Vec<Handler>,
    fallback: Intent,
}

impl HandlerRegistry {
    pub fn new(fallback: Intent) -> Self {
        Self {
            handlers: Vec::new(),
            fallback,
        }
    }

    /// Register `run` for `intent`, replacing any earlier handler for it
    pub fn register<F>(&mut self, intent: Intent, node: &str, run: F) -> &mut Self
    where
        F: Fn(&PipelineState, &RunContext) -> Result<PipelineState> + Send + Sync + 'static,
    {
        self.handlers.retain(|h| h.intent != intent);
        self.handlers.push(Handler {
            intent,
            node: node.to_string(),
            run: Arc::new(run),
        });
        self
    }

    pub fn fallback(&self) -> Intent {
        self.fallback
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub fn get(&self, intent: Intent) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.intent == intent)
    }

    /// Handler for `intent`, or the fallback handler
    pub fn resolve(&self, intent: Option<Intent>) -> Result<&Handler> {
        if let Some(handler) = intent.and_then(|i| self.get(i)) {
            return Ok(handler);
        }
        match self.get(self.fallback) {
            Some(handler) => Ok(handler),
            None => bail!("No handler registered for fallback intent '{}'", self.fallback),
        }
    }

    /// Checks that the registry can route every intent
    pub fn validate(&self) -> Result<()> {
        if self.get(self.fallback).is_none() {
            bail!("No handler registered for fallback intent '{}'", self.fallback);
        }
        let mut nodes: Vec<&str> = self.handlers.iter().map(|h| h.node.as_str()).collect();
        nodes.sort_unstable();
        if let Some(pair) = nodes.windows(2).find(|pair| pair[0] == pair[1]) {
            bail!("Node '{}' is used by more than one handler", pair[0]);
        }
        Ok(())
    }
}
