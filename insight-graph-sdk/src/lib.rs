use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix that marks a structured event line on stderr
pub const EVENT_PREFIX: &str = "__IG_EVENT__:";

/// Structured logging events emitted while a pipeline runs
///
/// Every event carries the `run_id` of the pipeline run that produced it, so
/// concurrent runs writing to the same stderr can be told apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineLog {
    /// Graph execution started
    RunStarted {
        run_id: Uuid,
        graph: String,
        question: String,
    },
    /// Graph node started
    NodeStarted { run_id: Uuid, node: String },
    /// Graph node returned a new state
    NodeCompleted { run_id: Uuid, node: String },
    /// Graph node returned an error; the run stops here
    NodeFailed {
        run_id: Uuid,
        node: String,
        error: String,
    },
    /// Conditional edge resolved
    IntentRouted {
        run_id: Uuid,
        intent: String,
        target: String,
    },
    /// Reasoning agent started working on a prompt
    AgentStarted {
        run_id: Uuid,
        agent_name: String,
        description: String,
    },
    /// Text produced by the agent
    AgentMessage {
        run_id: Uuid,
        agent_name: String,
        message: String,
    },
    /// Agent called one of its tools
    ToolInvoked {
        run_id: Uuid,
        agent_name: String,
        tool: String,
        detail: String,
    },
    /// Agent finished
    AgentCompleted {
        run_id: Uuid,
        agent_name: String,
        result: Option<String>,
    },
    /// Agent failed
    AgentFailed {
        run_id: Uuid,
        agent_name: String,
        error: String,
    },
    /// Artifact written to disk
    ArtifactSaved {
        run_id: Uuid,
        kind: String,
        file_path: String,
    },
    /// Graph execution reached the end marker
    RunCompleted { run_id: Uuid, graph: String },
}

impl PipelineLog {
    /// Emit this event to stderr as a single prefixed JSON line
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            use std::io::Write;
            eprintln!("{}{}", EVENT_PREFIX, json);
            let _ = std::io::stderr().flush();
        }
    }

    /// Parse a stderr line back into an event
    ///
    /// Returns `None` for lines that are not structured events.
    pub fn parse_line(line: &str) -> Option<Self> {
        let json = line.trim_end().strip_prefix(EVENT_PREFIX)?;
        serde_json::from_str(json).ok()
    }

    /// Run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            PipelineLog::RunStarted { run_id, .. }
            | PipelineLog::NodeStarted { run_id, .. }
            | PipelineLog::NodeCompleted { run_id, .. }
            | PipelineLog::NodeFailed { run_id, .. }
            | PipelineLog::IntentRouted { run_id, .. }
            | PipelineLog::AgentStarted { run_id, .. }
            | PipelineLog::AgentMessage { run_id, .. }
            | PipelineLog::ToolInvoked { run_id, .. }
            | PipelineLog::AgentCompleted { run_id, .. }
            | PipelineLog::AgentFailed { run_id, .. }
            | PipelineLog::ArtifactSaved { run_id, .. }
            | PipelineLog::RunCompleted { run_id, .. } => *run_id,
        }
    }
}

/// Helper macros for pipeline logging
#[macro_export]
macro_rules! log_run_start {
    ($run_id:expr, $graph:expr, $question:expr) => {
        $crate::PipelineLog::RunStarted {
            run_id: $run_id,
            graph: $graph.to_string(),
            question: $question.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_run_complete {
    ($run_id:expr, $graph:expr) => {
        $crate::PipelineLog::RunCompleted {
            run_id: $run_id,
            graph: $graph.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_node_start {
    ($run_id:expr, $node:expr) => {
        $crate::PipelineLog::NodeStarted {
            run_id: $run_id,
            node: $node.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_node_complete {
    ($run_id:expr, $node:expr) => {
        $crate::PipelineLog::NodeCompleted {
            run_id: $run_id,
            node: $node.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_node_failed {
    ($run_id:expr, $node:expr, $error:expr) => {
        $crate::PipelineLog::NodeFailed {
            run_id: $run_id,
            node: $node.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_intent_routed {
    ($run_id:expr, $intent:expr, $target:expr) => {
        $crate::PipelineLog::IntentRouted {
            run_id: $run_id,
            intent: $intent.to_string(),
            target: $target.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_start {
    ($run_id:expr, $agent:expr, $desc:expr) => {
        $crate::PipelineLog::AgentStarted {
            run_id: $run_id,
            agent_name: $agent.to_string(),
            description: $desc.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_message {
    ($run_id:expr, $agent:expr, $msg:expr) => {
        $crate::PipelineLog::AgentMessage {
            run_id: $run_id,
            agent_name: $agent.to_string(),
            message: $msg.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_tool_invoked {
    ($run_id:expr, $agent:expr, $tool:expr, $detail:expr) => {
        $crate::PipelineLog::ToolInvoked {
            run_id: $run_id,
            agent_name: $agent.to_string(),
            tool: $tool.to_string(),
            detail: $detail.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_complete {
    ($run_id:expr, $agent:expr) => {
        $crate::PipelineLog::AgentCompleted {
            run_id: $run_id,
            agent_name: $agent.to_string(),
            result: None,
        }
        .emit();
    };
    ($run_id:expr, $agent:expr, $result:expr) => {
        $crate::PipelineLog::AgentCompleted {
            run_id: $run_id,
            agent_name: $agent.to_string(),
            result: Some($result.to_string()),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_agent_failed {
    ($run_id:expr, $agent:expr, $error:expr) => {
        $crate::PipelineLog::AgentFailed {
            run_id: $run_id,
            agent_name: $agent.to_string(),
            error: $error.to_string(),
        }
        .emit();
    };
}

#[macro_export]
macro_rules! log_artifact_saved {
    ($run_id:expr, $kind:expr, $path:expr) => {
        $crate::PipelineLog::ArtifactSaved {
            run_id: $run_id,
            kind: $kind.to_string(),
            file_path: $path.to_string(),
        }
        .emit();
    };
}

// ============================================================================
// Console Logging Macros
// ============================================================================
// Human-readable progress lines for the CLI binaries. They go to stderr next
// to the structured events, so stdout carries only the final reply.
// ============================================================================

/// Progress note on stderr.
///
/// # Example
/// ```
/// use insight_graph_sdk::log_info;
/// log_info!("Opening {}", "data/lt_walmart_data.db");
/// ```
#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        eprintln!("\x1b[36m[info] {}\x1b[0m", $message)
    };
    ($fmt:expr, $($arg:tt)*) => {
        eprintln!("\x1b[36m[info] {}\x1b[0m", format!($fmt, $($arg)*))
    };
}

/// Something worth flagging that does not stop the run.
///
/// # Example
/// ```
/// use insight_graph_sdk::log_warning;
/// log_warning!("Table {} not found", "inventory");
/// ```
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        eprintln!("\x1b[33m[warn] {}\x1b[0m", $message)
    };
    ($fmt:expr, $($arg:tt)*) => {
        eprintln!("\x1b[33m[warn] {}\x1b[0m", format!($fmt, $($arg)*))
    };
}

/// An artifact written to disk.
///
/// # Example
/// ```
/// use insight_graph_sdk::log_file_saved;
/// log_file_saved!("table", "./outputs/result.csv");
/// ```
#[macro_export]
macro_rules! log_file_saved {
    ($kind:expr, $path:expr) => {
        eprintln!("\x1b[32m[saved] {} -> {}\x1b[0m", $kind, $path)
    };
}
