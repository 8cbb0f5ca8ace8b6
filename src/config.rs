use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Runtime settings, read from the environment after loading `.env`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub catalog_path: Option<PathBuf>,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let max_connections = match env::var("MINDSCREEN_DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidMaxConnections(raw))?,
            Err(_) => 5,
        };

        let catalog_path = env::var("MINDSCREEN_CATALOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let log_level = env::var("MINDSCREEN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            max_connections,
            catalog_path,
            telemetry: TelemetryConfig { log_level },
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("DATABASE_URL");
        env::remove_var("MINDSCREEN_DB_MAX_CONNECTIONS");
        env::remove_var("MINDSCREEN_CATALOG");
        env::remove_var("MINDSCREEN_LOG_LEVEL");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.max_connections, 5);
        assert!(config.catalog_path.is_none());
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn rejects_zero_max_connections() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MINDSCREEN_DB_MAX_CONNECTIONS", "0");
        let err = AppConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxConnections(_)));
        reset_env();
    }

    #[test]
    fn reads_catalog_override() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MINDSCREEN_CATALOG", "/etc/mindscreen/questions.json");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/etc/mindscreen/questions.json"))
        );
        reset_env();
    }
}
