//! Reasoning agents
//!
//! The agent-backed pipeline only needs something that turns a prompt into
//! an answer. [`ReasoningAgent`] is that seam; [`ClaudeSqlAgent`] is the
//! implementation that ships with the binaries.

pub mod claude;
pub mod tools;

pub use claude::{ClaudeSqlAgent, HttpMessagesApi, MessagesApi};
pub use tools::SqlToolbox;

use anyhow::Result;

use crate::graph::RunContext;

/// Prompt in, free text out
///
/// A failed answer fails the run. Implementations must not retry on the
/// pipeline's behalf.
pub trait ReasoningAgent: Send + Sync {
    fn name(&self) -> &str;

    fn answer(&self, ctx: &RunContext, prompt: &str) -> Result<String>;
}

impl<T: ReasoningAgent + ?Sized> ReasoningAgent for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn answer(&self, ctx: &RunContext, prompt: &str) -> Result<String> {
        (**self).answer(ctx, prompt)
    }
}
