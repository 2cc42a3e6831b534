//! Pipeline state threaded through the decision graph
//!
//! [`PipelineState`] is a plain value. Stages never mutate a shared instance:
//! each one borrows the prior state and returns a new one built with the
//! `with_*` methods, which only ever layer the caller's field on top.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::graph::GraphState;

/// Closed set of intents a question can be routed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    Kpi,
    Sentiment,
    Fallback,
    DispatchToAgent,
}

impl Intent {
    pub const ALL: [Intent; 4] = [
        Intent::Kpi,
        Intent::Sentiment,
        Intent::Fallback,
        Intent::DispatchToAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Kpi => "kpi",
            Intent::Sentiment => "sentiment",
            Intent::Fallback => "fallback",
            Intent::DispatchToAgent => "dispatch-to-agent",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown intent: '{}'", s))
    }
}

/// State record carried between graph nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineState {
    question: String,
    intent: Option<Intent>,
    raw_output: Option<String>,
    result_table_path: Option<PathBuf>,
    chart_path: Option<PathBuf>,
    message: Option<String>,
}

impl PipelineState {
    /// Fresh state for a new run; the question must not be blank
    pub fn new(question: impl Into<String>) -> Result<Self> {
        let question = question.into();
        if question.trim().is_empty() {
            bail!("Question must not be empty");
        }

        Ok(Self {
            question,
            intent: None,
            raw_output: None,
            result_table_path: None,
            chart_path: None,
            message: None,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent
    }

    pub fn raw_output(&self) -> Option<&str> {
        self.raw_output.as_deref()
    }

    pub fn result_table_path(&self) -> Option<&Path> {
        self.result_table_path.as_deref()
    }

    pub fn chart_path(&self) -> Option<&Path> {
        self.chart_path.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Set the intent; it can only be set once per run
    pub fn with_intent(&self, intent: Intent) -> Result<Self> {
        if let Some(existing) = self.intent {
            bail!(
                "Intent already set to '{}', refusing to overwrite with '{}'",
                existing,
                intent
            );
        }
        Ok(Self {
            intent: Some(intent),
            ..self.clone()
        })
    }

    pub fn with_raw_output(&self, raw_output: impl Into<String>) -> Self {
        Self {
            raw_output: Some(raw_output.into()),
            ..self.clone()
        }
    }

    pub fn with_result_table(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            result_table_path: Some(path.into()),
            ..self.clone()
        }
    }

    pub fn with_chart(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            chart_path: Some(path.into()),
            ..self.clone()
        }
    }

    pub fn with_message(&self, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..self.clone()
        }
    }
}

impl GraphState for PipelineState {
    fn run_label(&self) -> String {
        self.question.clone()
    }

    fn check_terminal(&self) -> Result<()> {
        if self.message.is_none() {
            bail!("Run ended without a message for question '{}'", self.question);
        }
        Ok(())
    }
}
