use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub database_min_connections: u32,
    #[serde(default = "default_connection_timeout")]
    pub database_connection_timeout: u64,

    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    pub mattermost_url: Option<String>,
    pub mattermost_token: Option<String>,
    #[serde(default = "default_notifier_timeout")]
    pub notifier_timeout_secs: u64,

    #[serde(default)]
    pub cascade_mode: CascadeMode,

    #[serde(default = "default_true")]
    pub scheduler_enabled: bool,
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_secs: u64,
    #[serde(default = "default_completion_sweep_interval")]
    pub completion_sweep_interval_secs: u64,
    #[serde(default = "default_reminder_send_delay")]
    pub reminder_send_delay_ms: u64,
    #[serde(default = "default_true")]
    pub reminder_include_in_progress: bool,
}

/// Where the completion cascade runs after a respondent finishes.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CascadeMode {
    /// In the request task, before the response is returned.
    Inline,
    /// On a background worker fed through a channel.
    #[default]
    Queued,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub mattermost_url: Option<String>,
    pub mattermost_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub reminder_interval: Duration,
    pub completion_sweep_interval: Duration,
    pub reminder_send_delay: Duration,
    pub reminder_include_in_progress: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reminder_interval: Duration::from_secs(default_reminder_interval()),
            completion_sweep_interval: Duration::from_secs(default_completion_sweep_interval()),
            reminder_send_delay: Duration::from_millis(default_reminder_send_delay()),
            reminder_include_in_progress: true,
        }
    }
}

// Default value functions
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connection_timeout() -> u64 {
    30
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_jwt_secret() -> String {
    "your-secret-key".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_notifier_timeout() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_reminder_interval() -> u64 {
    86_400
} // daily
fn default_completion_sweep_interval() -> u64 {
    3_600
} // hourly
fn default_reminder_send_delay() -> u64 {
    200
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()
            .map_err(|e| AppError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be > 0".to_string(),
            ));
        }

        if self.database_min_connections > self.database_max_connections {
            return Err(AppError::Config(
                "DATABASE_MIN_CONNECTIONS cannot be greater than DATABASE_MAX_CONNECTIONS"
                    .to_string(),
            ));
        }

        if self.jwt_secret == "your-secret-key" {
            return Err(AppError::Config(
                "JWT_SECRET must be set to a secure value".to_string(),
            ));
        }

        if url::Url::parse(&self.frontend_url).is_err() {
            return Err(AppError::Config(
                "FRONTEND_URL must be an absolute URL".to_string(),
            ));
        }

        if self.mattermost_url.is_some() != self.mattermost_token.is_some() {
            return Err(AppError::Config(
                "MATTERMOST_URL and MATTERMOST_TOKEN must be set together".to_string(),
            ));
        }

        if self.notifier_timeout_secs == 0 {
            return Err(AppError::Config(
                "NOTIFIER_TIMEOUT_SECS must be > 0".to_string(),
            ));
        }

        if self.reminder_interval_secs == 0 || self.completion_sweep_interval_secs == 0 {
            return Err(AppError::Config(
                "Scheduler intervals must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            min_connections: self.database_min_connections,
            connection_timeout: self.database_connection_timeout,
        }
    }

    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            host: self.server_host.clone(),
            port: self.server_port,
            cors_origins: self.cors_origins.clone(),
        }
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
        }
    }

    pub fn notifier(&self) -> NotifierConfig {
        NotifierConfig {
            mattermost_url: self.mattermost_url.clone(),
            mattermost_token: self.mattermost_token.clone(),
            timeout_secs: self.notifier_timeout_secs,
        }
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            enabled: self.scheduler_enabled,
            reminder_interval: Duration::from_secs(self.reminder_interval_secs),
            completion_sweep_interval: Duration::from_secs(self.completion_sweep_interval_secs),
            reminder_send_delay: Duration::from_millis(self.reminder_send_delay_ms),
            reminder_include_in_progress: self.reminder_include_in_progress,
        }
    }
}
