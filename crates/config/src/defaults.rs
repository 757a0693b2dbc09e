use std::path::PathBuf;

pub fn default_enabled() -> bool {
    true
}

pub fn default_currency() -> String {
    "BTC".to_string()
}

pub fn default_request_timeout_seconds() -> u64 {
    10
}

pub fn default_heartbeat_interval_seconds() -> u64 {
    30
}

pub fn default_ticker_interval() -> String {
    "100ms".to_string()
}

pub fn default_round_decimals() -> Option<u32> {
    Some(4)
}

pub fn default_min_time_to_expiry_years() -> f64 {
    1e-8
}

pub fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}
