use crate::db::db_pool::DbPool;
use crate::db::executor::fetch_result_set;
use crate::error::{PipelineError, Result};
use duckdb::Connection;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error};

const SAMPLE_ROWS: usize = 3;

/// Table and column metadata rendered as text for prompt injection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SchemaDescription(String);

impl SchemaDescription {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads the live catalog. Nothing is cached; each call reflects the
/// database as it is now.
#[derive(Clone)]
pub struct SchemaProvider {
    pool: DbPool,
}

impl SchemaProvider {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn describe_schema(&self) -> Result<SchemaDescription> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || -> Result<SchemaDescription> {
            let conn = pool.get().map_err(|e| {
                error!("Failed to get DB connection: {}", e);
                PipelineError::Unavailable(e.to_string())
            })?;

            let text = describe_tables(&conn).map_err(|e| {
                error!("Failed to read catalog metadata: {}", e);
                PipelineError::Unavailable(e.to_string())
            })?;
            Ok(SchemaDescription(text))
        })
        .await
        .map_err(|e| PipelineError::Unavailable(format!("Schema task failed: {}", e)))?
    }
}

fn describe_tables(conn: &Connection) -> duckdb::Result<String> {
    let mut tables_stmt = conn.prepare(
        "SELECT table_name FROM information_schema.tables
         WHERE table_catalog = current_database()
           AND table_schema = current_schema()
           AND table_type = 'BASE TABLE'
         ORDER BY table_name",
    )?;
    let tables: Vec<String> = tables_stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<duckdb::Result<_>>()?;

    debug!("Describing {} tables", tables.len());

    let mut blocks = Vec::with_capacity(tables.len());
    for table_name in &tables {
        let mut block = create_table_ddl(conn, table_name)?;
        block.push_str("\n\n");
        block.push_str(&sample_rows(conn, table_name)?);
        blocks.push(block);
    }

    Ok(blocks.join("\n\n"))
}

fn create_table_ddl(conn: &Connection, table_name: &str) -> duckdb::Result<String> {
    let mut columns_stmt = conn.prepare(
        "SELECT column_name, data_type, is_nullable
         FROM information_schema.columns
         WHERE table_catalog = current_database()
           AND table_schema = current_schema()
           AND table_name = ?
         ORDER BY ordinal_position",
    )?;
    let columns: Vec<(String, String, bool)> = columns_stmt
        .query_map([table_name], |row| {
            Ok((
                row.get::<_, String>(0)?,           // column_name
                row.get::<_, String>(1)?,           // data_type
                row.get::<_, String>(2)? == "YES", // is_nullable
            ))
        })?
        .collect::<duckdb::Result<_>>()?;

    let definitions: Vec<String> = columns
        .iter()
        .map(|(name, data_type, nullable)| {
            let null_str = if *nullable { "" } else { " NOT NULL" };
            format!("\t\"{}\" {}{}", name, data_type, null_str)
        })
        .collect();

    Ok(format!(
        "CREATE TABLE \"{}\" (\n{}\n)",
        table_name,
        definitions.join(", \n")
    ))
}

fn sample_rows(conn: &Connection, table_name: &str) -> duckdb::Result<String> {
    let sample = fetch_result_set(
        conn,
        &format!(
            "SELECT * FROM \"{}\" LIMIT {}",
            table_name.replace('"', "\"\""),
            SAMPLE_ROWS
        ),
    )?;

    let mut lines = vec![
        format!("{} rows from {} table:", SAMPLE_ROWS, table_name),
        sample.columns.join("\t"),
    ];
    for row in &sample.rows {
        let values: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
        lines.push(values.join("\t"));
    }

    Ok(format!("/*\n{}\n*/", lines.join("\n")))
}
