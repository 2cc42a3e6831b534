//! Read-only access to the analytics SQLite database
//!
//! The store is what the SQL agent's tools see. It is opened read-only and
//! with `query_only` set, and every query additionally passes
//! [`check_read_only`] before it runs.
//!
//! An include-list limits which tables are listed and described. Queries are
//! not restricted to it.

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use insight_graph_sdk::log_warning;

/// Tables the retail dataset ships with
pub const DEFAULT_TABLES: &[&str] = &[
    "sales_data",
    "products",
    "stores",
    "inventory",
    "customer_feedback",
];

/// Rows shown per table by [`SqlStore::table_info`]
pub const SAMPLE_ROWS: usize = 2;

/// Rows and column names of one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// More rows existed than were fetched
    pub truncated: bool,
}

impl QueryResult {
    /// Header plus rows as comma-separated text
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to finish CSV output: {}", e))?;
        Ok(String::from_utf8(bytes)?.trim_end().to_string())
    }
}

pub struct SqlStore {
    path: PathBuf,
    conn: Mutex<Connection>,
    include_tables: Option<Vec<String>>,
}

impl SqlStore {
    /// Open `path` read-only; `include_tables` of `None` exposes every table
    pub fn open(path: impl AsRef<Path>, include_tables: Option<Vec<String>>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("Database not found: {}", path.display());
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.execute_batch("PRAGMA query_only = ON;")
            .context("Failed to enable query_only")?;

        let store = Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
            include_tables,
        };
        let missing = store.missing_tables()?;
        if !missing.is_empty() {
            log_warning!(
                "{} has no table named {}",
                path.display(),
                missing.join(", ")
            );
        }
        Ok(store)
    }

    /// Include-list entries the database does not have
    pub fn missing_tables(&self) -> Result<Vec<String>> {
        let include = match &self.include_tables {
            Some(include) => include,
            None => return Ok(Vec::new()),
        };
        let present = self.list_tables()?;
        Ok(include
            .iter()
            .filter(|t| !present.contains(t))
            .cloned()
            .collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    /// Tables (and views) visible through the include-list, sorted by name
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(match &self.include_tables {
            Some(include) => names.into_iter().filter(|n| include.contains(n)).collect(),
            None => names,
        })
    }

    /// `CREATE` statement followed by a few sample rows
    pub fn table_info(&self, table: &str) -> Result<String> {
        if !self.list_tables()?.iter().any(|t| t == table) {
            bail!("Unknown table '{}'", table);
        }

        let create: String = self.conn()?.query_row(
            "SELECT sql FROM sqlite_master WHERE name = ?1",
            [table],
            |row| row.get(0),
        )?;
        let sample = self.run_query(
            &format!("SELECT * FROM {} LIMIT {}", quote_ident(table), SAMPLE_ROWS),
            SAMPLE_ROWS,
        )?;

        let mut info = format!(
            "{}\n\n/*\n{} rows from {} table:\n{}",
            create.trim(),
            SAMPLE_ROWS,
            table,
            sample.columns.join("\t")
        );
        for row in &sample.rows {
            info.push('\n');
            info.push_str(&row.join("\t"));
        }
        info.push_str("\n*/");
        Ok(info)
    }

    /// Run one read-only query, fetching at most `max_rows` rows
    pub fn query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let sql = check_read_only(sql)?;
        self.run_query(sql, max_rows)
    }

    fn run_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        if !stmt.readonly() {
            bail!("Only read-only statements are allowed");
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = Vec::new();
        let mut truncated = false;
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            if rows.len() == max_rows {
                truncated = true;
                break;
            }
            let mut cells = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                cells.push(render_cell(row.get_ref(idx)?));
            }
            rows.push(cells);
        }

        Ok(QueryResult {
            columns,
            rows,
            truncated,
        })
    }
}

/// Accept a single `SELECT`/`WITH` statement; returns it without a trailing `;`
pub fn check_read_only(sql: &str) -> Result<&str> {
    let statement = sql.trim().trim_end_matches(';').trim_end();
    if statement.is_empty() {
        bail!("Empty query");
    }
    if statement.contains(';') {
        bail!("Only a single statement is allowed");
    }

    let keyword = statement
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !(keyword.starts_with("select") || keyword == "with") {
        bail!("Only SELECT queries are allowed, got '{}'", keyword);
    }
    Ok(statement)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn render_cell(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.1}", f),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => format!("<blob {} bytes>", bytes.len()),
    }
}
