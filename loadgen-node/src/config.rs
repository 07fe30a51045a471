use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the load generator node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadgenConfig {
    /// System under test
    pub target: TargetConfig,
    /// Virtual user injection profile
    pub injection: InjectionConfig,
    /// Scenario data and pacing
    pub scenario: ScenarioConfig,
    /// End-of-run pass/fail thresholds
    pub assertions: AssertionsConfig,
    /// Metrics and monitoring
    pub metrics: MetricsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Target system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Base URL of the system under test
    pub base_url: String,
    /// Value sent in the Origin header (browser-style CORS requests)
    pub origin: String,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Open-model injection profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionConfig {
    /// Total virtual users to inject
    pub users: u32,
    /// Ramp-up window in seconds (users arrive linearly across it)
    pub ramp_up_seconds: u64,
}

/// Scenario data generation and pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Username prefix; records are prefix + index
    pub username_prefix: String,
    /// Password prefix; records are prefix + index
    pub password_prefix: String,
    /// Size of the circular credential pool
    pub pool_size: u32,
    /// Pause between the register and login phases in seconds
    pub inter_phase_pause_seconds: u64,
}

/// Global assertions evaluated after the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionsConfig {
    /// Maximum acceptable response time in milliseconds
    pub max_response_time_ms: u64,
    /// Minimum acceptable successful-request percentage
    pub min_success_rate_percent: f64,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter
    pub enabled: bool,
    /// Metrics server address
    pub listen_addr: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, text)
    pub format: Option<String>,
}

impl LoadgenConfig {
    /// Get ramp-up window as Duration
    pub fn ramp_up(&self) -> Duration {
        Duration::from_secs(self.injection.ramp_up_seconds)
    }

    /// Get inter-phase pause as Duration
    pub fn inter_phase_pause(&self) -> Duration {
        Duration::from_secs(self.scenario.inter_phase_pause_seconds)
    }

    /// Get per-request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.target.request_timeout_seconds)
    }
}

impl Default for LoadgenConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig {
                base_url: "http://localhost:8000".to_string(),
                origin: "http://localhost:3000".to_string(),
                request_timeout_seconds: 10,
            },
            injection: InjectionConfig {
                users: 1000,
                ramp_up_seconds: 60,
            },
            scenario: ScenarioConfig {
                username_prefix: "testus".to_string(),
                password_prefix: "testpa".to_string(),
                pool_size: 1000,
                inter_phase_pause_seconds: 2,
            },
            assertions: AssertionsConfig {
                max_response_time_ms: 5000,
                min_success_rate_percent: 95.0,
            },
            metrics: MetricsConfig {
                enabled: false,
                listen_addr: "127.0.0.1:9090".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: Some("text".to_string()),
            },
        }
    }
}

impl LoadgenConfig {
    /// Load configuration from file with LOADGEN_* environment overrides
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LOADGEN").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.target.base_url.is_empty() {
            return Err("Target base URL cannot be empty".to_string());
        }

        if reqwest::Url::parse(&self.target.base_url).is_err() {
            return Err(format!("Invalid target base URL: {}", self.target.base_url));
        }

        if self.injection.users == 0 {
            return Err("User injection count cannot be 0".to_string());
        }

        if self.scenario.pool_size == 0 {
            return Err("Credential pool size cannot be 0".to_string());
        }

        if self.assertions.min_success_rate_percent < 0.0
            || self.assertions.min_success_rate_percent > 100.0
        {
            return Err("Success rate threshold must be between 0 and 100".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_scenario_constants() {
        let config = LoadgenConfig::default();
        assert_eq!(config.target.base_url, "http://localhost:8000");
        assert_eq!(config.injection.users, 1000);
        assert_eq!(config.injection.ramp_up_seconds, 60);
        assert_eq!(config.scenario.pool_size, 1000);
        assert_eq!(config.scenario.inter_phase_pause_seconds, 2);
        assert_eq!(config.assertions.max_response_time_ms, 5000);
        assert_eq!(config.assertions.min_success_rate_percent, 95.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LoadgenConfig::default();
        assert!(config.validate().is_ok());

        config.injection.users = 0;
        assert!(config.validate().is_err());

        config.injection.users = 10;
        config.target.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.target.base_url = "http://localhost:8000".to_string();
        config.assertions.min_success_rate_percent = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_helpers() {
        let config = LoadgenConfig::default();
        assert_eq!(config.ramp_up(), Duration::from_secs(60));
        assert_eq!(config.inter_phase_pause(), Duration::from_secs(2));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let config = LoadgenConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: LoadgenConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.injection.users, config.injection.users);
        assert_eq!(
            parsed.assertions.min_success_rate_percent,
            config.assertions.min_success_rate_percent
        );
    }
}
