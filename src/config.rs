use clap::Parser;
use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::db_pool::IN_MEMORY;

pub const MAX_POOL_SIZE: u32 = 10;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// DuckDB file path, or `:memory:`
    pub connection_string: String,
    pub pool_size: u32,
    /// Catalog schema introspected for the LLM context
    pub schema: String,
    /// Opens the database in DuckDB's read-only access mode so writes are
    /// rejected by the engine. Needs an existing file; `:memory:` cannot be
    /// opened read-only.
    pub read_only: bool,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Comma separated list of allowed CORS origins
    pub cors_origins: String,
}

impl WebConfig {
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub provider: String, // display name only, e.g. "Groq"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Database connection string (DuckDB file path or :memory:)
    #[arg(long)]
    pub database: Option<String>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        Self::from_sources(args, |key| std::env::var(key).ok())
    }

    /// Layers defaults, an optional TOML file, environment variables and
    /// command line arguments, in that order.
    pub fn from_sources<F>(args: &CliArgs, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config_builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = ["config.toml", "config/config.toml", "/etc/nl-sql/config.toml"];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        let first = |keys: &[&str]| keys.iter().find_map(|key| env(*key).filter(|v| !v.trim().is_empty()));

        config_builder = config_builder
            .set_override_option("database.connection_string", first(&["DATABASE_URL"]))?
            .set_override_option("database.pool_size", first(&["DATABASE_POOL_SIZE"]))?
            .set_override_option("llm.api_key", first(&["LLM_API_KEY", "GROQ_API_KEY"]))?
            .set_override_option("llm.model", first(&["LLM_MODEL", "GROQ_MODEL"]))?
            .set_override_option("llm.api_url", first(&["LLM_API_URL"]))?
            .set_override_option("web.cors_origins", first(&["CORS_ORIGINS"]))?
            .set_override_option("web.host", first(&["HOST"]))?
            .set_override_option("web.port", first(&["PORT"]))?;

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Command line wins over everything else
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(database) = &args.database {
            config.database.connection_string = database.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
            return Err(ConfigError::Message(
                "LLM API key is required (set LLM_API_KEY or GROQ_API_KEY)".to_string(),
            ));
        }

        if !(1..=MAX_POOL_SIZE).contains(&self.database.pool_size) {
            return Err(ConfigError::Message(format!(
                "database.pool_size must be between 1 and {}, got {}",
                MAX_POOL_SIZE, self.database.pool_size
            )));
        }

        if self.database.read_only && self.database.connection_string == IN_MEMORY {
            return Err(ConfigError::Message(
                "database.read_only requires a database file, not :memory:".to_string(),
            ));
        }

        Ok(())
    }
}

// Default implementation
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                connection_string: "nl-sql.duckdb".to_string(),
                pool_size: 5,
                schema: "main".to_string(),
                read_only: false,
                connection_timeout_secs: 30,
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_origins: "http://localhost:3000,http://localhost:5000".to_string(),
            },
            llm: LlmConfig {
                provider: "Groq".to_string(),
                model: "mixtral-8x7b-32768".to_string(),
                api_key: None,
                api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                temperature: 0.1,
                max_tokens: 500,
                timeout_secs: 60,
            },
        }
    }
}
