//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "spend.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://spend.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Authentication configuration (external auth service)
///
/// Points at a GoTrue-compatible auth service. The service owns all
/// session-cookie and OAuth mechanics; this application only needs its
/// endpoint, the publishable API key, and the SSO provider to offer.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the auth service (e.g., "https://abc.supabase.co")
    pub service_url: String,
    /// Publishable (anon) API key for the auth service
    pub anon_key: String,
    /// SSO provider offered on the login page (default: "google")
    #[serde(default = "default_auth_provider")]
    pub provider: String,
}

fn default_auth_provider() -> String {
    "google".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (POCKETLEDGER_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("auth.provider", "google")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (POCKETLEDGER_*)
            .add_source(
                Environment::with_prefix("POCKETLEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validate configuration values that are fatal when wrong.
    ///
    /// The auth service endpoint and key have no workable defaults;
    /// refusing to start is the only sane behavior when they are absent.
    fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.auth.service_url.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.service_url is required".to_string(),
            ));
        }

        if url::Url::parse(&self.auth.service_url).is_err() {
            return Err(crate::error::AppError::Config(format!(
                "auth.service_url is not a valid URL: {}",
                self.auth.service_url
            )));
        }

        if self.auth.anon_key.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.anon_key is required".to_string(),
            ));
        }

        if self.auth.provider.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.provider must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
