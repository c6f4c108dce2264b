use crate::config::AppConfig;
use crate::db::db_pool::DuckDBConnectionManager;
use crate::db::schema_manager::SchemaManager;
use crate::llm::LlmManager;
use r2d2::Pool;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Initializing,
    Ready,
}

/// Shared application state for the web server
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: Pool<DuckDBConnectionManager>,
    /// Used for throwaway health-check connections outside the pool
    pub db_manager: DuckDBConnectionManager,
    pub llm_manager: LlmManager,
    pub schema_manager: SchemaManager,
    pub startup_time: chrono::DateTime<chrono::Utc>,
    lifecycle: RwLock<Lifecycle>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db_pool: Pool<DuckDBConnectionManager>,
        db_manager: DuckDBConnectionManager,
        llm_manager: LlmManager,
    ) -> Self {
        let schema_manager = SchemaManager::new(config.database.schema.clone());

        Self {
            config,
            db_pool,
            db_manager,
            llm_manager,
            schema_manager,
            startup_time: chrono::Utc::now(),
            lifecycle: RwLock::new(Lifecycle::Initializing),
        }
    }

    /// Loads the schema description and moves the service to `Ready`.
    ///
    /// A failed load is not fatal: the service comes up with an empty schema.
    pub async fn initialize(&self) {
        if let Ok(count) = self.schema_manager.reload(&self.db_pool).await {
            info!("Database schema successfully loaded ({} tables)", count);
        }

        *self.lifecycle.write().await = Lifecycle::Ready;
        info!("Service ready");
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read().await
    }
}
