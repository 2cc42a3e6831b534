//! Artifact persistence
//!
//! Turns an agent answer into files in the output directory:
//!
//! - `result.csv`: the extracted table, header first
//! - `chart.svg`: only when the table is chartable
//!
//! Both names are fixed, so each run overwrites the previous artifacts.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use insight_graph_sdk::{log_artifact_saved, log_file_saved};

use crate::chart::{self, svg, ChartDecision, ChartSpec};
use crate::extract::{ParsedTable, TableExtractor};
use crate::graph::RunContext;

pub const RESULT_FILE: &str = "result.csv";
pub const CHART_FILE: &str = "chart.svg";
pub const NO_OUTPUT_MESSAGE: &str = "No output from agent.";

/// What a persist call produced
#[derive(Debug, Clone, PartialEq)]
pub struct PersistOutcome {
    pub table_path: Option<PathBuf>,
    pub chart_path: Option<PathBuf>,
    pub decision: ChartDecision,
    pub message: String,
}

/// Writes tables and charts into one output directory
#[derive(Debug, Clone)]
pub struct ResultPersister {
    out_dir: PathBuf,
    extractor: TableExtractor,
}

impl ResultPersister {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            extractor: TableExtractor::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: TableExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Extract, chart and write whatever `raw_output` supports
    ///
    /// No output gives [`NO_OUTPUT_MESSAGE`]; output that is not a table is
    /// passed through as the message. Write failures are errors.
    pub fn persist(
        &self,
        ctx: &RunContext,
        title: &str,
        raw_output: Option<&str>,
    ) -> Result<PersistOutcome> {
        let raw = match raw_output {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                return Ok(PersistOutcome {
                    table_path: None,
                    chart_path: None,
                    decision: ChartDecision::None,
                    message: NO_OUTPUT_MESSAGE.to_string(),
                })
            }
        };

        let table = match self.extractor.extract(raw) {
            Some(table) => table,
            None => {
                return Ok(PersistOutcome {
                    table_path: None,
                    chart_path: None,
                    decision: ChartDecision::None,
                    message: raw.to_string(),
                })
            }
        };

        let table_path = self.write_table(ctx, &table)?;
        let decision = chart::select_chart(&table);
        let spec = ChartSpec::for_table(title, &table, &decision);
        let chart_path = match svg::render(&decision, &spec) {
            Some(document) => Some(self.write_chart(ctx, &document)?),
            None => None,
        };

        Ok(PersistOutcome {
            message: compose_message(&table_path, chart_path.as_deref()),
            table_path: Some(table_path),
            chart_path,
            decision,
        })
    }

    fn ensure_out_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.out_dir).with_context(|| {
            format!("Failed to create output directory {}", self.out_dir.display())
        })
    }

    /// Write `table` to `<out_dir>/result.csv`
    pub fn write_table(&self, ctx: &RunContext, table: &ParsedTable) -> Result<PathBuf> {
        self.ensure_out_dir()?;
        let path = self.out_dir.join(RESULT_FILE);

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.extractor.delimiter())
            .from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        writer.write_record(table.header())?;
        for row in table.rows() {
            writer.write_record(row)?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        log_artifact_saved!(ctx.run_id, "table", path.display());
        log_file_saved!("table", path.display());
        Ok(path)
    }

    /// Write a rendered chart to `<out_dir>/chart.svg`
    pub fn write_chart(&self, ctx: &RunContext, document: &str) -> Result<PathBuf> {
        self.ensure_out_dir()?;
        let path = self.out_dir.join(CHART_FILE);
        fs::write(&path, document).with_context(|| format!("Failed to write {}", path.display()))?;

        log_artifact_saved!(ctx.run_id, "chart", path.display());
        log_file_saved!("chart", path.display());
        Ok(path)
    }
}

pub fn compose_message(table_path: &Path, chart_path: Option<&Path>) -> String {
    match chart_path {
        Some(chart) => format!("Saved {} and {}", table_path.display(), chart.display()),
        None => format!("Saved {}", table_path.display()),
    }
}
