//! Configuration management for MedQA services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Knowledge graph store configuration
    #[serde(default)]
    pub graph: GraphConfig,

    /// Upstream semantic analysis service
    #[serde(default)]
    pub semantic: SemanticConfig,

    /// QA engine tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Answer presentation
    #[serde(default)]
    pub answer: AnswerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

/// Which graph store implementation backs the engine
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    /// In-process graph seeded from a JSON file
    Memory,
    /// Neo4j over Bolt
    Neo4j,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_backend")]
    pub backend: GraphBackend,

    /// Bolt URI, e.g. 127.0.0.1:7687
    #[serde(default = "default_graph_uri")]
    pub uri: String,

    #[serde(default = "default_graph_user")]
    pub user: String,

    pub password: Option<String>,

    #[serde(default = "default_graph_database")]
    pub database: String,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Per-query deadline; expiry surfaces as a transient failure
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// JSON seed for the memory backend
    pub seed_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SemanticConfig {
    /// Base URL of the intent/entity analysis service
    #[serde(default = "default_semantic_url")]
    pub base_url: String,

    #[serde(default = "default_semantic_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Maximum follow-up questions per answer
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnswerConfig {
    /// Appended to every HTTP answer body
    #[serde(default = "default_disclaimer")]
    pub disclaimer: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_graph_backend() -> GraphBackend { GraphBackend::Memory }
fn default_graph_uri() -> String { "127.0.0.1:7687".to_string() }
fn default_graph_user() -> String { "neo4j".to_string() }
fn default_graph_database() -> String { "neo4j".to_string() }
fn default_fetch_size() -> usize { 200 }
fn default_max_connections() -> usize { 16 }
fn default_query_timeout_ms() -> u64 { 3000 }
fn default_semantic_url() -> String { "http://127.0.0.1:5000".to_string() }
fn default_semantic_timeout() -> u64 { 10 }
fn default_recommendation_limit() -> usize { 3 }
fn default_disclaimer() -> String {
    "以上信息仅供参考，不能替代专业医生的诊断和治疗建议。".to_string()
}
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "medqa".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: default_graph_backend(),
            uri: default_graph_uri(),
            user: default_graph_user(),
            password: None,
            database: default_graph_database(),
            fetch_size: default_fetch_size(),
            max_connections: default_max_connections(),
            query_timeout_ms: default_query_timeout_ms(),
            seed_path: None,
        }
    }
}

impl SemanticConfig {
    /// Timeout for calls to the semantic analysis service
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            base_url: default_semantic_url(),
            timeout_secs: default_semantic_timeout(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recommendation_limit: default_recommendation_limit(),
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            disclaimer: default_disclaimer(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__GRAPH__BACKEND=neo4j
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject combinations that would only fail later at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.recommendation_limit == 0 {
            return Err(ConfigError::Message(
                "engine.recommendation_limit must be at least 1".to_string(),
            ));
        }
        if self.graph.query_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "graph.query_timeout_ms must be positive".to_string(),
            ));
        }
        if self.graph.backend == GraphBackend::Neo4j {
            if self.graph.uri.trim().is_empty() {
                return Err(ConfigError::Message(
                    "graph.uri is required for the neo4j backend".to_string(),
                ));
            }
            if self.graph.password.is_none() {
                return Err(ConfigError::Message(
                    "graph.password is required for the neo4j backend".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Deadline applied to each graph store call
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.graph.query_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            graph: GraphConfig::default(),
            semantic: SemanticConfig::default(),
            engine: EngineConfig::default(),
            answer: AnswerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.graph.backend, GraphBackend::Memory);
        assert_eq!(config.engine.recommendation_limit, 3);
        assert_eq!(config.query_timeout(), Duration::from_millis(3000));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.semantic.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_recommendation_limit_rejected() {
        let mut config = AppConfig::default();
        config.engine.recommendation_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_neo4j_requires_password() {
        let mut config = AppConfig::default();
        config.graph.backend = GraphBackend::Neo4j;
        assert!(config.validate().is_err());

        config.graph.password = Some("secret".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_parses_lowercase() {
        let backend: GraphBackend = serde_json::from_str("\"neo4j\"").unwrap();
        assert_eq!(backend, GraphBackend::Neo4j);
    }
}
