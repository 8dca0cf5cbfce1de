//! Server configuration

use serde::{Deserialize, Serialize};
use unigate_repository::ConcurrencyMode;
use unigate_store::StoreConfig;

fn default_cors_allowed_origins() -> Vec<String> {
    [
        "http://localhost:5174",
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:3002",
        "http://localhost:5000",
        "https://bachelors-web.vercel.app",
        "https://bachelors-preview.vercel.app",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port (HTTP)
    pub port: u16,

    /// Deployment environment; error details are hidden in `production`
    pub environment: String,

    /// Origins allowed by CORS
    pub cors_allowed_origins: Vec<String>,

    /// Backing document store
    pub store: StoreConfig,

    /// Guard applied to read-merge-write updates
    pub update_concurrency: ConcurrencyMode,

    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,

    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            cors_allowed_origins: default_cors_allowed_origins(),
            store: StoreConfig::default(),
            update_concurrency: ConcurrencyMode::default(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, `config/server.*` and `UNIGATE_*`
    /// environment variables, later sources winning.
    ///
    /// Nested keys use `__`, e.g. `UNIGATE_STORE__TYPE=postgres`.
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if exists
        dotenvy::dotenv().ok();

        let config_result = config::Config::builder()
            .add_source(config::File::with_name("config/server").required(false))
            .add_source(
                config::Environment::with_prefix("UNIGATE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins")
                    .try_parsing(true),
            )
            .build();

        match config_result {
            Ok(cfg) => cfg
                .try_deserialize()
                .map_err(|e| anyhow::anyhow!("Failed to deserialize config: {}", e)),
            Err(e) => {
                tracing::info!("No usable config sources ({}), using default configuration", e);
                Ok(Self::default())
            }
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// `host:port` to bind
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();

        assert_eq!(config.address(), "0.0.0.0:3000");
        assert_eq!(config.environment, "development");
        assert!(!config.is_production());
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.update_concurrency, ConcurrencyMode::LastWriteWins);
        assert_eq!(config.cors_allowed_origins.len(), 7);
    }

    #[test]
    fn test_is_production_ignores_case() {
        let config = ServerConfig {
            environment: "Production".to_string(),
            ..Default::default()
        };
        assert!(config.is_production());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ServerConfig = serde_json::from_str(
            r#"{
                "port": 8080,
                "store": {"type": "postgres", "url": "postgresql://localhost/unigate"},
                "update_concurrency": "optimistic"
            }"#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.store, StoreConfig::postgres("postgresql://localhost/unigate"));
        assert_eq!(config.update_concurrency, ConcurrencyMode::Optimistic);
    }
}
