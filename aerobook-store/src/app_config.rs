use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub booking: BookingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Sizing and timing of the asynchronous search pipeline
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchSettings {
    pub queue_capacity: usize,
    pub cache_ttl_seconds: u64,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub result_capacity: usize,
    pub result_ttl_seconds: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            cache_ttl_seconds: 15 * 60,
            poll_attempts: 5,
            poll_interval_ms: 1000,
            result_capacity: 10_000,
            result_ttl_seconds: 10 * 60,
        }
    }
}

impl SearchSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_seconds)
    }
}

/// Retry behaviour for the booking saga steps
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BookingSettings {
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_backoff_ms: 50,
        }
    }
}

fn default_max_connections() -> u32 { 5 }
fn default_true() -> bool { true }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `AEROBOOK__SEARCH__QUEUE_CAPACITY=500`
            .add_source(config::Environment::with_prefix("AEROBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let s = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 8080
                [database]
                url = "postgres://localhost/aerobook"
                [redis]
                url = "redis://localhost:6379"
                [search]
                queue_capacity = 7
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let cfg: Config = s.try_deserialize().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.search.queue_capacity, 7);
        assert_eq!(cfg.search.poll_attempts, 5);
        assert_eq!(cfg.search.cache_ttl(), Duration::from_secs(900));
        assert_eq!(cfg.booking.retry_attempts, 3);
    }
}
