/// Configuration management for the catalog service
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub classifier: ClassifierConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub catalog_db: PathBuf,
    /// Time budget for a single store operation, in seconds
    pub query_timeout_secs: u64,
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub refresh_ttl_days: i64,
}

/// Review classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    /// Prompt template; `{rankings}` is replaced with the label list
    pub prompt_template: String,
}

/// Catalog behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub recommendation_limit: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

const DEFAULT_PROMPT_TEMPLATE: &str = "Classify the sentiment of the following movie review as exactly one of: {rankings}. Reply with the label only and nothing else.\n\nReview: ";

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let host = env::var("REELBASE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("REELBASE_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ApiError::Validation {
                message: "Invalid port number".to_string(),
                details: None,
            })?;

        let data_directory: PathBuf = env::var("REELBASE_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let catalog_db = env::var("REELBASE_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("catalog.sqlite"));
        let query_timeout_secs = env::var("REELBASE_QUERY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);

        let access_secret = env::var("REELBASE_ACCESS_SECRET")
            .map_err(|_| config_missing("REELBASE_ACCESS_SECRET"))?;
        let refresh_secret = env::var("REELBASE_REFRESH_SECRET")
            .map_err(|_| config_missing("REELBASE_REFRESH_SECRET"))?;
        let issuer = env::var("REELBASE_TOKEN_ISSUER").unwrap_or_else(|_| "reelbase".to_string());
        let refresh_ttl_days = env::var("REELBASE_REFRESH_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let api_key = env::var("OPENAI_API_KEY").map_err(|_| config_missing("OPENAI_API_KEY"))?;
        let api_base = env::var("REELBASE_COMPLETION_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model =
            env::var("REELBASE_COMPLETION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let prompt_template = env::var("REELBASE_PROMPT_TEMPLATE")
            .unwrap_or_else(|_| DEFAULT_PROMPT_TEMPLATE.to_string());

        let recommendation_limit = env::var("REELBASE_RECOMMENDATION_LIMIT")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig { host, port },
            storage: StorageConfig {
                data_directory,
                catalog_db,
                query_timeout_secs,
            },
            auth: AuthConfig {
                access_secret,
                refresh_secret,
                issuer,
                refresh_ttl_days,
            },
            classifier: ClassifierConfig {
                api_key,
                api_base,
                model,
                prompt_template,
            },
            catalog: CatalogConfig {
                recommendation_limit,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration; runs at startup before any request is served
    pub fn validate(&self) -> ApiResult<()> {
        if self.auth.access_secret.len() < 32 {
            return Err(invalid_config(
                "access signing secret must be at least 32 characters",
            ));
        }

        if self.auth.refresh_secret.len() < 32 {
            return Err(invalid_config(
                "refresh signing secret must be at least 32 characters",
            ));
        }

        if self.classifier.api_key.is_empty() {
            return Err(invalid_config("completion API key cannot be empty"));
        }

        if !self.classifier.prompt_template.contains("{rankings}") {
            return Err(invalid_config(
                "prompt template must contain the {rankings} placeholder",
            ));
        }

        if self.catalog.recommendation_limit <= 0 {
            return Err(invalid_config("recommendation limit must be positive"));
        }

        Ok(())
    }
}

fn config_missing(name: &str) -> ApiError {
    ApiError::Validation {
        message: format!("{} is not set", name),
        details: None,
    }
}

fn invalid_config(message: &str) -> ApiError {
    ApiError::Validation {
        message: message.to_string(),
        details: None,
    }
}
