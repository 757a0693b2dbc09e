use common::Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root of the YAML run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplerConfig {
    pub exchange: ExchangeConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub network: Network,
    /// Underlying currency whose options are listed
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Overrides the network's default WebSocket endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Exchange heartbeat interval; 0 disables heartbeats
    #[serde(default = "default_heartbeat_interval_seconds")]
    pub heartbeat_interval_seconds: u64,
    /// Ticker channel interval (`100ms`, `agg2` or `raw`)
    #[serde(default = "default_ticker_interval")]
    pub ticker_interval: String,
}

impl ExchangeConfig {
    pub fn endpoint_url(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.network.default_endpoint())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            currency: default_currency(),
            endpoint: None,
            request_timeout_seconds: default_request_timeout_seconds(),
            heartbeat_interval_seconds: default_heartbeat_interval_seconds(),
            ticker_interval: default_ticker_interval(),
        }
    }
}

/// Which estimator produces the computed mark for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    FallbackChain,
    Black76,
}

impl EstimatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorKind::FallbackChain => "fallback_chain",
            EstimatorKind::Black76 => "black76",
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstimatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fallback_chain" | "fallback" | "chain" => Ok(EstimatorKind::FallbackChain),
            "black76" | "black_76" => Ok(EstimatorKind::Black76),
            other => Err(format!("unknown estimator: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Exchange expiry code, e.g. `27JUN25`
    pub expiry: String,
    /// Total run duration (T1)
    pub duration_seconds: u64,
    /// Sampling interval (T2)
    pub interval_seconds: u64,
    pub strikes: Vec<f64>,
    #[serde(default)]
    pub estimator: EstimatorKind,
}

impl RunConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    /// Decimals kept in reported marks; `null` keeps full precision
    #[serde(default = "default_round_decimals")]
    pub round_decimals: Option<u32>,
    #[serde(default = "default_min_time_to_expiry_years")]
    pub min_time_to_expiry_years: f64,
    /// Report Black-76 prices in units of the underlying
    #[serde(default = "default_enabled")]
    pub quote_in_underlying: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            round_decimals: default_round_decimals(),
            min_time_to_expiry_years: default_min_time_to_expiry_years(),
            quote_in_underlying: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    /// Write `prices_<ts>.json` after every tick
    #[serde(default = "default_enabled")]
    pub per_tick_files: bool,
    /// Write `run_<ts>.json` with every tick at the end
    #[serde(default = "default_enabled")]
    pub run_file: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            per_tick_files: true,
            run_file: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_yaml_gets_defaults() {
        let yaml = r#"
exchange:
  network: test
run:
  expiry: 27JUN25
  duration_seconds: 20
  interval_seconds: 5
  strikes: [95000, 96000]
"#;
        let config: SamplerConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.exchange.network, Network::Test);
        assert_eq!(config.exchange.currency, "BTC");
        assert_eq!(config.exchange.endpoint_url(), "wss://test.deribit.com/ws/api/v2");
        assert_eq!(config.run.estimator, EstimatorKind::FallbackChain);
        assert_eq!(config.run.strikes, vec![95000.0, 96000.0]);
        assert_eq!(config.run.duration(), Duration::from_secs(20));
        assert_eq!(config.pricing.round_decimals, Some(4));
        assert!(config.pricing.quote_in_underlying);
        assert_eq!(config.output.directory, PathBuf::from("output"));
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_estimator_and_endpoint_override() {
        let yaml = r#"
exchange:
  endpoint: wss://localhost:9000/ws/api/v2
run:
  expiry: 27JUN25
  duration_seconds: 60
  interval_seconds: 10
  strikes: [100000]
  estimator: black76
pricing:
  round_decimals: null
"#;
        let config: SamplerConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.exchange.network, Network::Main);
        assert_eq!(config.exchange.endpoint_url(), "wss://localhost:9000/ws/api/v2");
        assert_eq!(config.run.estimator, EstimatorKind::Black76);
        assert_eq!(config.pricing.round_decimals, None);
    }

    #[test]
    fn test_estimator_from_str() {
        assert_eq!("black76".parse::<EstimatorKind>(), Ok(EstimatorKind::Black76));
        assert_eq!("fallback-chain".parse::<EstimatorKind>(), Ok(EstimatorKind::FallbackChain));
        assert!("heston".parse::<EstimatorKind>().is_err());
    }
}
