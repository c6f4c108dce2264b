use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod error;
mod llm;
mod util;
mod web;

#[cfg(test)]
mod tests;

use crate::config::{AppConfig, CliArgs};
use crate::db::db_pool::{build_pool, DuckDBConnectionManager};
use crate::llm::LlmManager;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
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

    info!("Starting NL-SQL service...");
    info!("Database: {}", config.database.connection_string);
    info!("LLM: {} ({})", config.llm.provider, config.llm.model);

    let db_manager = DuckDBConnectionManager::new(
        config.database.connection_string.clone(),
        config.database.read_only,
    );
    let pool = build_pool(db_manager.clone(), &config.database);

    let llm_manager = LlmManager::new(&config.llm)?;

    let app_state = Arc::new(AppState::new(config.clone(), pool, db_manager, llm_manager));
    app_state.initialize().await;

    info!("Starting NL-SQL service on http://{}:{}", config.web.host, config.web.port);
    let result = web::run_server(config.web, Arc::clone(&app_state)).await;

    // Last reference to the state closes the pool
    drop(app_state);

    match result {
        Ok(_) => {
            info!("Service shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Server error: {}", e);
            Err(e.into())
        }
    }
}
