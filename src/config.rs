use clap::Parser;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for structured environment overrides, e.g. `NL_INSIGHT__LLM__MODEL`.
const ENV_PREFIX: &str = "NL_INSIGHT";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MysqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub pool_size: u32,
    pub query_timeout_secs: u64,
    pub mysql: Option<MysqlConfig>,
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "ollama" or "remote"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub temperature: f32,
    pub context_window: Option<u32>,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
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

    /// Model identifier passed to the completion backend
    #[arg(short, long)]
    pub model: Option<String>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config_builder = Self::defaults()?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = [
                "config.toml",
                "config/config.toml",
                "/etc/nl-insight/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        config_builder = config_builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        config_builder = apply_legacy_db_env(config_builder, |key| std::env::var(key).ok())?;

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(model) = &args.model {
            config.llm.model = model.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the pool cannot be built with.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.pool_size == 0 {
            return Err(ConfigError::Message(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        if self.database.query_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "database.query_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("database.connection_string", "nl-insight.duckdb")?
            .set_default("database.pool_size", 5)?
            .set_default("database.query_timeout_secs", 30)?
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 8000)?
            .set_default("llm.backend", "ollama")?
            .set_default("llm.model", "llama3")?
            .set_default("llm.temperature", 0.1)?
            .set_default("llm.timeout_secs", 120)
    }
}

/// Maps the `DB_HOST`/`DB_PORT`/`DB_USER`/`DB_PASSWORD`/`DB_NAME` variables
/// onto `database.mysql`. Nothing is set unless `DB_HOST` is present.
fn apply_legacy_db_env(
    builder: ConfigBuilder<DefaultState>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(host) = lookup("DB_HOST") else {
        return Ok(builder);
    };

    builder
        .set_override("database.mysql.host", host)?
        .set_override("database.mysql.port", lookup("DB_PORT").unwrap_or_else(|| "3306".to_string()))?
        .set_override("database.mysql.user", lookup("DB_USER").unwrap_or_default())?
        .set_override("database.mysql.password", lookup("DB_PASSWORD").unwrap_or_default())?
        .set_override("database.mysql.name", lookup("DB_NAME").unwrap_or_default())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                connection_string: "nl-insight.duckdb".to_string(),
                pool_size: 5,
                query_timeout_secs: 30,
                mysql: None,
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            llm: LlmConfig {
                backend: "ollama".to_string(),
                model: "llama3".to_string(),
                api_key: None,
                api_url: None,
                temperature: 0.1,
                context_window: None,
                timeout_secs: 120,
            },
        }
    }
}
