//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use fxgate_fx::{ConversionServiceConfig, HttpProviderConfig, RateCacheConfig};

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Upstream rate provider.
    pub provider: HttpProviderConfig,
    /// How long fetched rate tables are reused.
    pub cache_ttl: Duration,
    /// Directory of static files served at `/`.
    pub static_dir: Option<PathBuf>,
    /// Emit logs as JSON lines.
    pub json_logs: bool,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 3000,
            provider: HttpProviderConfig::default(),
            cache_ttl: Duration::from_secs(60 * 60),
            static_dir: None,
            json_logs: false,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("FXGATE_BIND_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = lookup("FXGATE_PORT").or_else(|| lookup("PORT")) {
            if let Ok(port) = port.parse() {
                config.listen_port = port;
            }
        }

        if let Some(url) = lookup("FXGATE_PROVIDER_URL") {
            config.provider.base_url = url;
        }

        if let Some(secs) = lookup("FXGATE_PROVIDER_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.provider.timeout = Duration::from_secs(secs);
            }
        }

        if let Some(secs) = lookup("FXGATE_CACHE_TTL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.cache_ttl = Duration::from_secs(secs);
            }
        }

        if let Some(dir) = lookup("FXGATE_STATIC_DIR") {
            if !dir.trim().is_empty() {
                config.static_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(json) = lookup("FXGATE_JSON_LOGS") {
            config.json_logs = matches!(json.as_str(), "1" | "true" | "yes");
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.cache_ttl.is_zero() {
            return Err("Cache TTL cannot be zero".to_string());
        }

        if chrono::Duration::from_std(self.cache_ttl).is_err() {
            return Err("Cache TTL is out of range".to_string());
        }

        self.provider.validate()
    }

    /// Socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }

    /// Service configuration derived from this server configuration.
    pub fn service_config(&self) -> ConversionServiceConfig {
        let ttl = chrono::Duration::from_std(self.cache_ttl)
            .unwrap_or_else(|_| RateCacheConfig::default().ttl);

        ConversionServiceConfig {
            cache: RateCacheConfig { ttl },
            ..Default::default()
        }
    }
}
