// Decision graph orchestrator
pub mod graph;

// Pipeline state and intents
pub mod state;

// Intent classification and handler dispatch
pub mod router;

// Reasoning agents
pub mod agent;

// Read-only SQLite access
pub mod store;

// Table extraction from agent answers
pub mod extract;

// Chart selection and rendering
pub mod chart;

// Artifact persistence
pub mod persist;

// Agent-backed pipeline
pub mod analyst;

// Configuration and command line
pub mod config;
pub mod cli;
