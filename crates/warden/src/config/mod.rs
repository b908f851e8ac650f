use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
    pub monitor: MonitorConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").ok();

        let static_threshold = parse_env("ADMISSION_STATIC_THRESHOLD", 500.0)?;
        let ratio_threshold: u32 = parse_env("CAPACITY_RATIO_THRESHOLD", 10)?;
        if ratio_threshold == 0 {
            return Err(ConfigError::ZeroRatioThreshold);
        }

        let monitor = MonitorConfig {
            warmup: Duration::from_secs(parse_env("MONITOR_WARMUP_SECS", 10)?),
            capacity_poll: Duration::from_secs(parse_env("MONITOR_CAPACITY_POLL_SECS", 5)?),
            evaluation_interval: Duration::from_secs(parse_env(
                "MONITOR_EVALUATION_INTERVAL_SECS",
                180,
            )?),
            ratio_threshold,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig { static_threshold },
            monitor,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls. An unset level defers to the per-environment default
/// chosen by [`crate::telemetry`].
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: Option<String>,
}

/// Admission-engine tunables.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Admission cut-off used while at least one facility has free capacity.
    pub static_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            static_threshold: 500.0,
        }
    }
}

/// Cadence and threshold for the capacity-monitor background task.
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// Delay before the first evaluation, letting initial state load.
    pub warmup: Duration,
    /// Short poll interval used while aggregate capacity is zero.
    pub capacity_poll: Duration,
    /// Steady-state interval between ratio evaluations.
    pub evaluation_interval: Duration,
    /// Subjects tolerated per facility slot before a deficit is signalled.
    pub ratio_threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(10),
            capacity_poll: Duration::from_secs(5),
            evaluation_interval: Duration::from_secs(180),
            ratio_threshold: 10,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str },
    ZeroRatioThreshold,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a valid number")
            }
            ConfigError::ZeroRatioThreshold => {
                write!(f, "CAPACITY_RATIO_THRESHOLD must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "ADMISSION_STATIC_THRESHOLD",
            "CAPACITY_RATIO_THRESHOLD",
            "MONITOR_WARMUP_SECS",
            "MONITOR_CAPACITY_POLL_SECS",
            "MONITOR_EVALUATION_INTERVAL_SECS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_is_empty() {
        let _guard = env_guard().lock().expect("env mutex poisoned");
        reset_env();

        let config = AppConfig::load().expect("default config loads");

        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert!(config.telemetry.log_level.is_none());
        assert_eq!(config.engine.static_threshold, 500.0);
        assert_eq!(config.monitor.ratio_threshold, 10);
        assert_eq!(config.monitor.warmup, Duration::from_secs(10));
        assert_eq!(config.monitor.evaluation_interval, Duration::from_secs(180));
    }

    #[test]
    fn load_reads_overrides_from_env() {
        let _guard = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("APP_PORT", "8080");
        env::set_var("APP_LOG_LEVEL", "warden=trace");
        env::set_var("ADMISSION_STATIC_THRESHOLD", "650.5");
        env::set_var("CAPACITY_RATIO_THRESHOLD", "4");
        env::set_var("MONITOR_WARMUP_SECS", "1");

        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.telemetry.log_level.as_deref(), Some("warden=trace"));
        assert_eq!(config.engine.static_threshold, 650.5);
        assert_eq!(config.monitor.ratio_threshold, 4);
        assert_eq!(config.monitor.warmup, Duration::from_secs(1));
    }

    #[test]
    fn load_rejects_invalid_port_and_threshold() {
        let _guard = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PORT", "not-a-port");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidPort)));

        reset_env();
        env::set_var("ADMISSION_STATIC_THRESHOLD", "high");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber { .. })
        ));

        reset_env();
        env::set_var("CAPACITY_RATIO_THRESHOLD", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::ZeroRatioThreshold)
        ));
        reset_env();
    }

    #[test]
    fn socket_addr_accepts_localhost_alias() {
        let server = ServerConfig {
            host: "localhost".to_string(),
            port: 4100,
        };
        let addr = server.socket_addr().expect("localhost resolves");
        assert_eq!(addr.to_string(), "127.0.0.1:4100");
    }

    #[test]
    fn socket_addr_rejects_hostnames() {
        let server = ServerConfig {
            host: "warden.internal".to_string(),
            port: 4100,
        };
        assert!(server.socket_addr().is_err());
    }
}
