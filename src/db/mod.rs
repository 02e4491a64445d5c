pub mod db_pool;
pub mod executor;
pub mod result;
pub mod schema;

pub use db_pool::{DbPool, DuckDBConnectionManager};
pub use executor::QueryExecutor;
pub use result::{Cell, ResultSet};
pub use schema::{SchemaDescription, SchemaProvider};
