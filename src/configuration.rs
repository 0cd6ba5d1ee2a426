use crate::health::{DEFAULT_ALERT_THRESHOLD, DEFAULT_CHECK_TIMEOUT, DEFAULT_HISTORY_WINDOW};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app_port: u16,
    pub app_host: String,
    #[serde(default)]
    pub engine: EngineSettings,
    pub registry: RegistrySettings,
    pub collaborators: CollaboratorSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub healthy_threshold: u8,
    pub warning_threshold: u8,
    /// Critical-priority checks alert below this score
    pub alert_threshold: u8,
    pub trend_delta: u8,
    pub history_window: usize,
    pub run_interval_secs: u64,
    pub check_timeout_secs: u64,
    pub max_concurrent_checks: usize,
    pub remediation_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            healthy_threshold: 90,
            warning_threshold: 75,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            trend_delta: 2,
            history_window: DEFAULT_HISTORY_WINDOW,
            run_interval_secs: 30,
            check_timeout_secs: DEFAULT_CHECK_TIMEOUT.as_secs(),
            max_concurrent_checks: 8,
            remediation_timeout_secs: 120,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let invalid = |msg: &str| Err(config::ConfigError::Message(msg.to_string()));

        if self.healthy_threshold > 100 {
            return invalid("engine.healthy_threshold must be at most 100");
        }
        if self.warning_threshold >= self.healthy_threshold {
            return invalid("engine.warning_threshold must be below engine.healthy_threshold");
        }
        if self.alert_threshold > 100 {
            return invalid("engine.alert_threshold must be at most 100");
        }
        if self.history_window == 0 {
            return invalid("engine.history_window must be at least 1");
        }
        if self.max_concurrent_checks == 0 {
            return invalid("engine.max_concurrent_checks must be at least 1");
        }
        if self.run_interval_secs == 0 || self.check_timeout_secs == 0 {
            return invalid("engine intervals and timeouts must be positive");
        }
        if self.remediation_timeout_secs == 0 {
            return invalid("engine.remediation_timeout_secs must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    /// YAML catalog, re-read at the start of every run
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorSettings {
    /// Base URL of the inspection service (e.g., http://localhost:4500)
    pub check_url: String,
    /// Base URL of the remediation service
    pub remediation_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,
}

fn default_request_timeout() -> u64 {
    10
}

fn default_retry_attempts() -> usize {
    2
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // `configuration.yaml` in the working directory, overridden by
    // APP__ENGINE__HEALTHY_THRESHOLD style variables.
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration"))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let config: Settings = settings.try_deserialize()?;
    config.engine.validate()?;

    Ok(config)
}
