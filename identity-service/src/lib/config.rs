use std::env;

use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Durable storage. An empty `url` selects the file-backed store.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub users_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    pub ttl_hours: i64,
    pub sweep_interval_seconds: u64,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, DATABASE__URL, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::default().separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        ConfigBuilder::builder()
            .set_default("server.http_port", 8081)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 5)?
            .set_default("database.run_migrations", true)?
            .set_default("storage.users_file", "data/identity.users")?
            .set_default("jwt.secret", "")?
            .set_default("jwt.expiration_hours", 24)?
            .set_default("refresh.ttl_hours", 720)?
            .set_default("refresh.sweep_interval_seconds", 300)
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Message("jwt.secret must be set".to_string()));
        }
        if self.jwt.expiration_hours <= 0 {
            return Err(ConfigError::Message(
                "jwt.expiration_hours must be positive".to_string(),
            ));
        }
        if self.refresh.ttl_hours <= 0 {
            return Err(ConfigError::Message(
                "refresh.ttl_hours must be positive".to_string(),
            ));
        }
        if self.refresh.sweep_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "refresh.sweep_interval_seconds must be positive".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "database.max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn uses_database(&self) -> bool {
        !self.database.url.trim().is_empty()
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::hours(self.jwt.expiration_hours)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::hours(self.refresh.ttl_hours)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh.sweep_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server: ServerConfig { http_port: 8081 },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 5,
                run_migrations: true,
            },
            storage: StorageConfig {
                users_file: "data/identity.users".to_string(),
            },
            jwt: JwtConfig {
                secret: "test-secret-key-for-jwt-signing-at-least-32-bytes".to_string(),
                expiration_hours: 24,
            },
            refresh: RefreshConfig {
                ttl_hours: 720,
                sweep_interval_seconds: 300,
            },
        }
    }

    #[test]
    fn test_defaults_deserialize() {
        let configuration = Config::defaults()
            .unwrap()
            .set_override("jwt.secret", "secret")
            .unwrap()
            .build()
            .unwrap();
        let config: Config = configuration.try_deserialize().unwrap();

        assert_eq!(config.server.http_port, 8081);
        assert!(!config.uses_database());
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.refresh_token_ttl(), Duration::hours(720));
        assert_eq!(config.access_token_ttl(), Duration::hours(24));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = config();
        config.jwt.secret = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_ttls() {
        let mut config = config();
        config.jwt.expiration_hours = 0;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.refresh.ttl_hours = -1;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.refresh.sweep_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_uses_database() {
        let mut config = config();
        assert!(!config.uses_database());

        config.database.url = "postgresql://localhost/identity".to_string();
        assert!(config.uses_database());
    }
}
