use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod error;
mod known_answers;
mod llm;
mod pipeline;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::db::{QueryExecutor, SchemaProvider};
use crate::llm::LlmManager;
use crate::pipeline::Pipeline;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Pick up a local .env before anything reads the environment
    dotenvy::dotenv().ok();

    init_tracing();

    let args = CliArgs::parse();

    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Initializing DuckDB connection pool for {} (size {})",
        config.database.connection_string, config.database.pool_size
    );
    if let Some(mysql) = &config.database.mysql {
        info!("Attaching MySQL database {} on {}:{}", mysql.name, mysql.host, mysql.port);
    }
    let pool = db::db_pool::build_pool(&config.database)?;

    info!(
        "Initializing LLM manager with backend: {} (model {})",
        config.llm.backend, config.llm.model
    );
    let llm_manager = LlmManager::new(&config.llm)?;

    let pipeline = Pipeline::new(
        SchemaProvider::new(pool.clone()),
        QueryExecutor::new(pool, config.database.query_timeout()),
        llm_manager,
    )?;

    let web_config = config.web.clone();
    let app_state = Arc::new(AppState::new(config, pipeline));

    info!("Starting NL Insight server on {}:{}", web_config.host, web_config.port);
    match web::run_server(web_config, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
