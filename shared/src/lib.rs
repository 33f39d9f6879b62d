pub mod calendar;
pub mod duties;
pub mod grouping;

use crate::error::{ConfigError, InitializationError};
use chrono::{Locale, Weekday};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const ENV_VAR_PREFIX: &str = "DUTY_ROSTER__";
pub const SETTINGS_FILE: &str = "Settings.toml";
pub const DEFAULT_DUTY_SERVICE_URL: &str = "https://api.revellx-engine.pl/v1";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub duty_service: DutyServiceConfig,
    pub server: ServerConfig,
    pub roster: RosterConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DutyServiceConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen_addr: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RosterConfig {
    pub rest_weekday: Weekday,
    pub paging_cooldown_ms: u64,
    pub locale: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duty_service: DutyServiceConfig {
                base_url: DEFAULT_DUTY_SERVICE_URL.to_string(),
            },
            server: ServerConfig {
                listen_addr: "0.0.0.0:8080".to_string(),
            },
            roster: RosterConfig {
                rest_weekday: Weekday::Sun,
                paging_cooldown_ms: 100,
                locale: "pl_PL".to_string(),
            },
        }
    }
}

impl RosterConfig {
    pub const fn paging_cooldown(&self) -> Duration {
        Duration::from_millis(self.paging_cooldown_ms)
    }

    /// Locale used for display strings only; grouping keys never depend on it.
    pub fn display_locale(&self) -> Result<Locale, ConfigError> {
        Locale::try_from(self.locale.as_str())
            .map_err(|_| ConfigError::UnknownLocale(self.locale.clone()))
    }
}

/// Defaults, then `Settings.toml`, then `DUTY_ROSTER__`-prefixed environment variables.
pub fn config_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(SETTINGS_FILE))
        .merge(Env::prefixed(ENV_VAR_PREFIX).split("__"))
}

pub fn load_config() -> Result<Config, ConfigError> {
    Ok(config_figment().extract::<Config>()?)
}

pub mod error {
    use thiserror::Error;
    use tracing::dispatcher::SetGlobalDefaultError;

    #[derive(Debug, Error)]
    pub enum ConfigError {
        #[error("failed to load configuration: {0}")]
        Figment(#[from] figment::Error),
        #[error("unknown display locale {0}")]
        UnknownLocale(String),
    }

    #[derive(Debug, Error)]
    pub enum InitializationError {
        #[error(transparent)]
        Tracing(#[from] SetGlobalDefaultError),
        #[error(transparent)]
        Config(#[from] ConfigError),
        #[error("failed to build http client: {0}")]
        HttpClient(#[from] reqwest::Error),
    }
}

pub fn init_tracing() -> Result<(), InitializationError> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(EnvFilter::from_default_env())
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

pub async fn shutdown_listener(token: Option<CancellationToken>) {
    let ctrl_c = signal::ctrl_c();
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C signal, shutting down"),
        _ = terminate => info!("received SIGTERM signal, shutting down"),
    }

    if let Some(token) = token {
        token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_extract_without_settings_file() {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .extract()
            .unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.roster.rest_weekday, Weekday::Sun);
        assert_eq!(config.roster.paging_cooldown(), Duration::from_millis(100));
    }

    #[test]
    fn toml_overrides_defaults() {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [duty_service]
                base_url = "http://localhost:9000/v1"

                [roster]
                rest_weekday = "Sat"
                paging_cooldown_ms = 250
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.duty_service.base_url, "http://localhost:9000/v1");
        assert_eq!(config.roster.rest_weekday, Weekday::Sat);
        assert_eq!(config.roster.paging_cooldown_ms, 250);
        assert_eq!(config.roster.locale, "pl_PL");
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn display_locale_resolves_known_and_rejects_unknown() {
        let mut roster = Config::default().roster;
        assert!(roster.display_locale().is_ok());

        roster.locale = "xx_NOPE".to_string();
        assert!(matches!(
            roster.display_locale(),
            Err(ConfigError::UnknownLocale(l)) if l == "xx_NOPE"
        ));
    }
}
