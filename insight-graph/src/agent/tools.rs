//! SQL tools exposed to the model

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::claude::ApiTool;
use crate::store::SqlStore;

pub const LIST_TABLES: &str = "sql_db_list_tables";
pub const SCHEMA: &str = "sql_db_schema";
pub const QUERY: &str = "sql_db_query";

/// Rows returned by one `sql_db_query` call
pub const DEFAULT_MAX_ROWS: usize = 200;

#[derive(Debug, Deserialize)]
struct SchemaInput {
    table_names: String,
}

#[derive(Debug, Deserialize)]
struct QueryInput {
    query: String,
}

/// List, describe and query tables of one [`SqlStore`]
pub struct SqlToolbox {
    store: SqlStore,
    max_rows: usize,
}

impl SqlToolbox {
    pub fn new(store: SqlStore) -> Self {
        Self {
            store,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn store(&self) -> &SqlStore {
        &self.store
    }

    pub fn definitions(&self) -> Vec<ApiTool> {
        vec![
            ApiTool {
                name: LIST_TABLES.to_string(),
                description: "Input is an empty object, output is a comma-separated list of tables in the database.".to_string(),
                input_schema: json!({ "type": "object", "properties": {} }),
            },
            ApiTool {
                name: SCHEMA.to_string(),
                description: format!(
                    "Input is a comma-separated list of tables, output is the schema and sample rows for those tables. \
                     Be sure that the tables actually exist by calling {} first!",
                    LIST_TABLES
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "table_names": {
                            "type": "string",
                            "description": "Comma-separated list of tables, e.g. 'sales_data, stores'"
                        }
                    },
                    "required": ["table_names"]
                }),
            },
            ApiTool {
                name: QUERY.to_string(),
                description: format!(
                    "Input is a detailed and correct SQLite SELECT query, output is the result as CSV. \
                     If the query is not correct, an error message is returned; rewrite the query and try again. \
                     If you get an unknown column error, use {} to see the correct columns.",
                    SCHEMA
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "A single SELECT statement" }
                    },
                    "required": ["query"]
                }),
            },
        ]
    }

    /// Run one tool call; the error text is what the model gets back
    pub fn call(&self, name: &str, input: &Value) -> Result<String> {
        match name {
            LIST_TABLES => Ok(self.store.list_tables()?.join(", ")),
            SCHEMA => {
                let input: SchemaInput = serde_json::from_value(input.clone())
                    .context("Expected {\"table_names\": \"...\"}")?;
                let mut sections = Vec::new();
                for table in input.table_names.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                    sections.push(self.store.table_info(table)?);
                }
                if sections.is_empty() {
                    bail!("No table names given");
                }
                Ok(sections.join("\n\n"))
            }
            QUERY => {
                let input: QueryInput = serde_json::from_value(input.clone())
                    .context("Expected {\"query\": \"...\"}")?;
                let result = self.store.query(&input.query, self.max_rows)?;
                let mut text = result.to_csv()?;
                if result.truncated {
                    text.push_str(&format!(
                        "\n(results truncated to the first {} rows)",
                        self.max_rows
                    ));
                }
                Ok(text)
            }
            other => bail!("Unknown tool '{}'", other),
        }
    }
}
