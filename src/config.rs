use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_DATABASE_URL: &str = "sqlite://forecast.db?mode=rwc";
const CONFIG_DIR: &str = "config";
const DEFAULT_HORIZON_DAYS: u32 = 30;
const DEFAULT_LOOKBACK_DAYS: u32 = 90;
const DEFAULT_ALERT_HORIZON_DAYS: u32 = 7;
const DEFAULT_BATCH_CONCURRENCY: usize = 1;
pub const MAX_HORIZON_DAYS: u32 = 365;

/// Tuning for the forecast pipeline
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ForecastConfig {
    /// Days projected by a generation run
    #[serde(default = "default_horizon_days")]
    #[validate(range(min = 1, max = 365))]
    pub horizon_days: u32,

    /// Days of order history fed into the calculator
    #[serde(default = "default_lookback_days")]
    #[validate(range(min = 1, max = 3650))]
    pub lookback_days: u32,

    /// Days summed when deriving low-stock alerts
    #[serde(default = "default_alert_horizon_days")]
    #[validate(range(min = 1, max = 365))]
    pub alert_horizon_days: u32,

    /// Items in flight during a batch run; 1 keeps the batch sequential
    #[serde(default = "default_batch_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub batch_concurrency: usize,

    /// Order statuses that count as demand
    #[serde(default = "default_active_order_statuses")]
    #[validate(length(min = 1))]
    pub active_order_statuses: Vec<String>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            lookback_days: default_lookback_days(),
            alert_horizon_days: default_alert_horizon_days(),
            batch_concurrency: default_batch_concurrency(),
            active_order_statuses: default_active_order_statuses(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Forecast pipeline settings
    #[serde(default)]
    #[validate]
    pub forecast: ForecastConfig,
}

impl AppConfig {
    /// Creates a new configuration with default tuning
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            forecast: ForecastConfig::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks cross-field constraints that derive macros cannot express
    fn validate_additional_constraints(&self) -> Result<(), AppConfigError> {
        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            let mut errors = validator::ValidationErrors::new();
            errors.add("db_min_connections", err);
            return Err(AppConfigError::Validation(errors));
        }
        // Each in-flight batch item holds a connection for its replace transaction.
        if self.forecast.batch_concurrency as u32 > self.db_max_connections {
            let mut err = ValidationError::new("batch_concurrency");
            err.message =
                Some("forecast.batch_concurrency cannot exceed db_max_connections".into());
            let mut errors = validator::ValidationErrors::new();
            errors.add("forecast", err);
            return Err(AppConfigError::Validation(errors));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}
fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}
fn default_alert_horizon_days() -> u32 {
    DEFAULT_ALERT_HORIZON_DAYS
}
fn default_batch_concurrency() -> usize {
    DEFAULT_BATCH_CONCURRENCY
}
fn default_active_order_statuses() -> Vec<String> {
    ["pending", "processing", "completed"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("inventory_forecast={},sea_orm=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*, e.g. APP__FORECAST__HORIZON_DAYS)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] with an explicit config directory.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let dir = config_dir.display();
    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", dir, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint check failed: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
