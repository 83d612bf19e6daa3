use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::client::ControllerSettings;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Dashboard behaviour shared by the server (list sizes) and the client (timers, endpoint).
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    #[serde(default = "default_poll_interval_secs")]
    #[validate(range(min = 5, max = 3600))]
    pub poll_interval_secs: u64,

    #[serde(default = "default_alert_exit_delay_ms")]
    #[validate(range(max = 10_000))]
    pub alert_exit_delay_ms: u64,

    #[serde(default = "default_true_bool")]
    pub auto_refresh: bool,

    /// Size of the top customers / top employees lists
    #[serde(default = "default_top_n")]
    #[validate(range(min = 1, max = 50))]
    pub top_n: u64,

    #[serde(default = "default_recent_orders")]
    #[validate(range(min = 1, max = 100))]
    pub recent_orders: u64,

    /// Server the CLI talks to
    #[serde(default = "default_client_base_url")]
    #[validate(url)]
    pub client_base_url: String,

    #[serde(default = "default_client_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub client_timeout_secs: u64,

    /// Longest custom date range the dashboard endpoint accepts
    #[serde(default = "default_max_range_days")]
    #[validate(range(min = 1, max = 36_600))]
    pub max_range_days: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            alert_exit_delay_ms: default_alert_exit_delay_ms(),
            auto_refresh: true,
            top_n: default_top_n(),
            recent_orders: default_recent_orders(),
            client_base_url: default_client_base_url(),
            client_timeout_secs: default_client_timeout_secs(),
            max_range_days: default_max_range_days(),
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn alert_exit_delay(&self) -> Duration {
        Duration::from_millis(self.alert_exit_delay_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            poll_interval: self.poll_interval(),
            alert_exit_delay: self.alert_exit_delay(),
            auto_refresh: self.auto_refresh,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[validate(custom = "validate_database_url")]
    pub database_url: String,

    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    #[validate(length(min = 1))]
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated list of allowed CORS origins; permissive when unset in development
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    #[serde(default = "default_api_page_size")]
    #[validate(range(min = 1, max = 500))]
    pub api_default_page_size: u64,

    #[serde(default = "default_api_max_page_size")]
    #[validate(range(min = 1, max = 500))]
    pub api_max_page_size: u64,

    #[serde(default)]
    #[validate]
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            dashboard: DashboardConfig::default(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && self.cors_origins().is_empty() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message =
                Some("Set APP__CORS_ALLOWED_ORIGINS for non-development environments".into());
            errors.add("cors_allowed_origins", err);
        }

        if self.api_default_page_size > self.api_max_page_size {
            let mut err = ValidationError::new("page_size_above_max");
            err.message = Some("api_default_page_size must not exceed api_max_page_size".into());
            errors.add("api_default_page_size", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
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

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_true_bool() -> bool {
    true
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
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_api_page_size() -> u64 {
    20
}
fn default_api_max_page_size() -> u64 {
    100
}
fn default_poll_interval_secs() -> u64 {
    60
}
fn default_alert_exit_delay_ms() -> u64 {
    300
}
fn default_top_n() -> u64 {
    5
}
fn default_recent_orders() -> u64 {
    10
}
fn default_client_base_url() -> String {
    format!("http://127.0.0.1:{}", DEFAULT_PORT)
}
fn default_client_timeout_secs() -> u64 {
    15
}

fn default_max_range_days() -> i64 {
    crate::dashboard::filters::DEFAULT_MAX_RANGE_DAYS
}

fn validate_database_url(url: &str) -> Result<(), ValidationError> {
    let supported = ["sqlite:", "postgres://", "postgresql://"];
    if supported.iter().any(|scheme| url.starts_with(scheme)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("database_url");
        err.message = Some("Must be a sqlite: or postgres:// URL".into());
        Err(err)
    }
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

    let default_directive = format!("packops_api={},tower_http=debug", level);
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(default_directive));

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. `config/default.toml`
/// 3. `config/{RUN_ENV}.toml`
/// 4. Environment variables (`APP__*`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Same layering as [`load_config`] with an explicit config directory and profile.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    let default_file = config_dir.join("default");
    let profile_file = config_dir.join(run_env);
    let config = Config::builder()
        .set_default("database_url", "sqlite://packops.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
        .add_source(File::with_name(&profile_file.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
