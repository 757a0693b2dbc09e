use crate::*;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

const EXPIRY_CODE_PATTERN: &str = r"^\d{1,2}[A-Z]{3}\d{2}$";
const TICKER_INTERVALS: [&str; 3] = ["100ms", "agg2", "raw"];
const LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const MAX_ROUND_DECIMALS: u32 = 8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid expiry code: '{0}'. Must look like 27JUN25")]
    InvalidExpiry(String),

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("At least one strike must be configured")]
    NoStrikes,

    #[error("Strike must be a positive number, got: {0}")]
    InvalidStrike(f64),

    #[error("Currency is required")]
    MissingCurrency,

    #[error("Invalid endpoint URL '{url}': {message}")]
    InvalidEndpoint { url: String, message: String },

    #[error("Invalid ticker interval: {0}. Must be one of: 100ms, agg2, raw")]
    InvalidTickerInterval(String),

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("{field} must be a positive float")]
    InvalidPositiveFloat { field: String },

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &SamplerConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_exchange(&config.exchange, &mut report);
    validate_run(&config.run, &mut report);
    validate_pricing(&config.pricing, config.run.estimator, &mut report);
    validate_logging(&config.logging, &mut report);

    report
}

fn validate_exchange(exchange: &ExchangeConfig, report: &mut ValidationReport) {
    if exchange.currency.trim().is_empty() {
        report.add_error(ValidationError::MissingCurrency);
    }

    match &exchange.endpoint {
        Some(endpoint) => {
            if let Some(var) = unresolved_var(endpoint) {
                report.add_error(ValidationError::InvalidEnvVar {
                    var,
                    message: "not set when the config was loaded".to_string(),
                });
            } else {
                validate_endpoint(endpoint, report);
            }
        }
        None => report.add_default("exchange.endpoint", exchange.network.default_endpoint()),
    }

    if exchange.request_timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "exchange.request_timeout_seconds".to_string(),
        });
    }

    if !TICKER_INTERVALS.contains(&exchange.ticker_interval.as_str()) {
        report.add_error(ValidationError::InvalidTickerInterval(
            exchange.ticker_interval.clone(),
        ));
    }

    if exchange.heartbeat_interval_seconds == 0 {
        report.add_warning(
            "exchange.heartbeat_interval_seconds",
            "Heartbeats disabled; a silent connection drop will go unnoticed",
        );
    } else if exchange.heartbeat_interval_seconds < 10 {
        report.add_warning(
            "exchange.heartbeat_interval_seconds",
            "The exchange rejects heartbeat intervals below 10 seconds",
        );
    }
}

fn validate_endpoint(endpoint: &str, report: &mut ValidationReport) {
    match Url::parse(endpoint) {
        Ok(url) => match url.scheme() {
            "wss" => {}
            "ws" => report.add_warning("exchange.endpoint", "Endpoint is not using TLS (ws://)"),
            other => report.add_error(ValidationError::InvalidEndpoint {
                url: endpoint.to_string(),
                message: format!("unsupported scheme '{}', expected wss or ws", other),
            }),
        },
        Err(e) => report.add_error(ValidationError::InvalidEndpoint {
            url: endpoint.to_string(),
            message: e.to_string(),
        }),
    }
}

fn validate_run(run: &RunConfig, report: &mut ValidationReport) {
    if !is_expiry_code(&run.expiry) {
        report.add_error(ValidationError::InvalidExpiry(run.expiry.clone()));
    }

    if run.duration_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "run.duration_seconds".to_string(),
        });
    }

    if run.interval_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "run.interval_seconds".to_string(),
        });
    }

    if run.duration_seconds > 0 && run.interval_seconds > 0 {
        if run.interval_seconds > run.duration_seconds {
            report.add_warning(
                "run.interval_seconds",
                "Interval exceeds the duration; only one tick is sampled",
            );
        } else if run.duration_seconds % run.interval_seconds != 0 {
            report.add_warning(
                "run.interval_seconds",
                "Interval does not divide the duration evenly; the last tick is cut short",
            );
        }
    }

    if run.strikes.is_empty() {
        report.add_error(ValidationError::NoStrikes);
    }

    let mut seen = HashSet::new();
    for &strike in &run.strikes {
        if !strike.is_finite() || strike <= 0.0 {
            report.add_error(ValidationError::InvalidStrike(strike));
            continue;
        }
        if !seen.insert(strike.to_bits()) {
            report.add_warning(
                "run.strikes",
                &format!("Duplicate strike {} is sampled once", strike),
            );
        }
    }
}

fn validate_pricing(
    pricing: &PricingConfig,
    estimator: EstimatorKind,
    report: &mut ValidationReport,
) {
    if let Some(decimals) = pricing.round_decimals {
        if decimals > MAX_ROUND_DECIMALS {
            report.add_warning(
                "pricing.round_decimals",
                "More than 8 decimals exceeds the exchange's price precision",
            );
        }
    }

    let min_time = pricing.min_time_to_expiry_years;
    if min_time.is_nan() || min_time <= 0.0 {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: "pricing.min_time_to_expiry_years".to_string(),
        });
    }

    if estimator == EstimatorKind::Black76 && !pricing.quote_in_underlying {
        report.add_warning(
            "pricing.quote_in_underlying",
            "Black-76 marks will be in quote currency while exchange marks are in BTC",
        );
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    if !LOG_FORMATS.contains(&logging.format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }

    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogLevel(logging.level.clone()));
    }
}

/// Whether `code` has the exchange's expiry shape (`DMMMYY` or `DDMMMYY`).
pub fn is_expiry_code(code: &str) -> bool {
    Regex::new(EXPIRY_CODE_PATTERN)
        .map(|re| re.is_match(code))
        .unwrap_or(false)
}

fn unresolved_var(value: &str) -> Option<String> {
    if !has_unresolved_env_vars(value) {
        return None;
    }
    let name = value
        .split('$')
        .nth(1)
        .unwrap_or_default()
        .trim_start_matches('{')
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default();
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid_config() -> SamplerConfig {
        generate_default_config()
    }

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&valid_config());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert_eq!(report.defaults_applied.len(), 1);
        assert_eq!(report.defaults_applied[0].field, "exchange.endpoint");
    }

    #[test]
    fn test_expiry_code_shapes() {
        assert!(is_expiry_code("27JUN25"));
        assert!(is_expiry_code("3JAN25"));
        assert!(!is_expiry_code("27jun25"));
        assert!(!is_expiry_code("2025-06-27"));
        assert!(!is_expiry_code(""));

        let mut config = valid_config();
        config.run.expiry = "JUNE".to_string();
        let report = validate_config(&config);
        assert_matches!(
            report.errors.as_slice(),
            [ValidationError::InvalidExpiry(code)] if code == "JUNE"
        );
    }

    #[test]
    fn test_zero_duration_and_interval() {
        let mut config = valid_config();
        config.run.duration_seconds = 0;
        config.run.interval_seconds = 0;

        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 2);
        assert!(report
            .errors
            .iter()
            .all(|e| matches!(e, ValidationError::InvalidPositiveInteger { .. })));
    }

    #[test]
    fn test_interval_longer_than_duration() {
        let mut config = valid_config();
        config.run.duration_seconds = 5;
        config.run.interval_seconds = 20;

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.field == "run.interval_seconds" && w.message.contains("one tick")));
    }

    #[test]
    fn test_uneven_interval_warns() {
        let mut config = valid_config();
        config.run.duration_seconds = 21;
        config.run.interval_seconds = 5;

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "run.interval_seconds"));
    }

    #[test]
    fn test_strikes() {
        let mut config = valid_config();
        config.run.strikes.clear();
        assert_matches!(validate_config(&config).errors.as_slice(), [ValidationError::NoStrikes]);

        config.run.strikes = vec![95000.0, -1.0, f64::NAN, 95000.0];
        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 2);
        assert!(report.warnings.iter().any(|w| w.field == "run.strikes"));
    }

    #[test]
    fn test_endpoint_checks() {
        let mut config = valid_config();
        config.exchange.endpoint = Some("not a url".to_string());
        assert_matches!(
            validate_config(&config).errors.as_slice(),
            [ValidationError::InvalidEndpoint { .. }]
        );

        config.exchange.endpoint = Some("https://www.deribit.com/api/v2".to_string());
        assert_matches!(
            validate_config(&config).errors.as_slice(),
            [ValidationError::InvalidEndpoint { .. }]
        );

        config.exchange.endpoint = Some("ws://localhost:8080/ws/api/v2".to_string());
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "exchange.endpoint"));
    }

    #[test]
    fn test_unresolved_env_var_in_endpoint() {
        let mut config = valid_config();
        config.exchange.endpoint = Some("${MARKX_UNSET_ENDPOINT}".to_string());

        let report = validate_config(&config);
        assert_matches!(
            report.errors.as_slice(),
            [ValidationError::InvalidEnvVar { var, .. }] if var == "MARKX_UNSET_ENDPOINT"
        );
    }

    #[test]
    fn test_ticker_interval_and_logging() {
        let mut config = valid_config();
        config.exchange.ticker_interval = "1s".to_string();
        config.logging.format = "xml".to_string();
        config.logging.level = "loud".to_string();

        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn test_pricing_warnings() {
        let mut config = valid_config();
        config.run.estimator = EstimatorKind::Black76;
        config.pricing.quote_in_underlying = false;
        config.pricing.round_decimals = Some(12);

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
    }
}
