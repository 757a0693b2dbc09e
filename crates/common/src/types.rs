//! Common types used across the workspace
//!
//! These are the few domain values every crate agrees on: which exchange
//! network a run talks to and the expiry code
//! that selects one option series.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Exchange network a run is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production exchange
    #[default]
    Main,
    /// Exchange test environment
    Test,
}

impl Network {
    /// Returns true if this is the test network
    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Test)
    }

    /// Default JSON-RPC WebSocket endpoint for this network
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Network::Main => "wss://www.deribit.com/ws/api/v2",
            Network::Test => "wss://test.deribit.com/ws/api/v2",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" | "mainnet" | "prod" | "production" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            other => Err(Error::invalid_input(format!("unknown network: {}", other))),
        }
    }
}

/// Exchange expiry code such as `27JUN25`.
///
/// Instrument names embed it as their second dash-separated segment
/// (`BTC-27JUN25-95000-C`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpiryCode(String);

impl ExpiryCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `instrument_name` belongs to this expiry.
    pub fn matches_instrument(&self, instrument_name: &str) -> bool {
        instrument_name
            .split('-')
            .nth(1)
            .map(|segment| segment.eq_ignore_ascii_case(&self.0))
            .unwrap_or(false)
    }
}

impl fmt::Display for ExpiryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExpiryCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse() {
        assert_eq!("main".parse::<Network>().unwrap(), Network::Main);
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Test);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_network_endpoints() {
        assert!(Network::Test.default_endpoint().contains("test.deribit.com"));
        assert!(Network::Main.default_endpoint().contains("www.deribit.com"));
        assert!(Network::Test.is_testnet());
        assert!(!Network::Main.is_testnet());
    }

    #[test]
    fn test_expiry_code_matching() {
        let expiry = ExpiryCode::new("27jun25");
        assert_eq!(expiry.as_str(), "27JUN25");
        assert!(expiry.matches_instrument("BTC-27JUN25-95000-C"));
        assert!(!expiry.matches_instrument("BTC-27JUN26-95000-C"));
        // Substring matches in other segments do not count
        assert!(!expiry.matches_instrument("BTC-4JUL25-27JUN25-C"));
        assert!(!expiry.matches_instrument("BTC"));
    }
}
