use crate::config::{DatabaseConfig, MysqlConfig};
use duckdb::Connection;
use r2d2::{ManageConnection, Pool};
use std::sync::Mutex;
use tracing::info;

pub type DbPool = Pool<DuckDBConnectionManager>;

/// Hands out connections cloned from one shared DuckDB instance, so every
/// pooled connection sees the same catalog (including an attached MySQL
/// database and in-memory tables).
pub struct DuckDBConnectionManager {
    base: Mutex<Connection>,
    default_catalog: Option<String>,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: &str) -> Result<Self, duckdb::Error> {
        Ok(Self {
            base: Mutex::new(Connection::open(connection_string)?),
            default_catalog: None,
        })
    }

    /// Attaches a MySQL database through DuckDB's `mysql` extension and makes
    /// it the default catalog of every connection handed out afterwards.
    pub fn with_mysql(mut self, mysql: &MysqlConfig) -> Result<Self, duckdb::Error> {
        let alias = catalog_alias(mysql);
        {
            let conn = self.base.lock().unwrap_or_else(|e| e.into_inner());
            conn.execute_batch("INSTALL mysql; LOAD mysql;")?;
            conn.execute_batch(&attach_statement(mysql, &alias))?;
        }
        info!("Attached MySQL database {}@{}:{} as \"{}\"", mysql.name, mysql.host, mysql.port, alias);
        self.default_catalog = Some(alias);
        Ok(self)
    }
}

fn catalog_alias(mysql: &MysqlConfig) -> String {
    if mysql.name.is_empty() {
        "mysql_db".to_string()
    } else {
        mysql.name.replace('"', "")
    }
}

fn attach_statement(mysql: &MysqlConfig, alias: &str) -> String {
    let dsn = format!(
        "host={} port={} user={} password={} database={}",
        mysql.host, mysql.port, mysql.user, mysql.password, mysql.name
    );
    format!(
        "ATTACH '{}' AS \"{}\" (TYPE mysql, READ_ONLY)",
        dsn.replace('\'', "''"),
        alias
    )
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let conn = self.base.lock().unwrap_or_else(|e| e.into_inner()).try_clone()?;
        if let Some(catalog) = &self.default_catalog {
            conn.execute_batch(&format!("USE \"{}\"", catalog))?;
        }
        Ok(conn)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Builds the shared pool described by `config`.
///
/// Waiting for a free connection is bounded by the query timeout, so a
/// request never blocks on the pool longer than it may run.
pub fn build_pool(config: &DatabaseConfig) -> Result<DbPool, Box<dyn std::error::Error>> {
    let mut manager = DuckDBConnectionManager::new(&config.connection_string)?;
    if let Some(mysql) = &config.mysql {
        manager = manager.with_mysql(mysql)?;
    }

    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(config.query_timeout())
        .build(manager)?;
    Ok(pool)
}
