//! Command-line values layered over the file configuration.

use cli::EstimatorArg;
use common::Network;
use config::{EstimatorKind, SamplerConfig};
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct RunOverrides {
    pub expiry: Option<String>,
    pub duration: Option<u64>,
    pub interval: Option<u64>,
    pub strikes: Option<Vec<f64>>,
    pub testnet: bool,
    pub estimator: Option<EstimatorArg>,
    pub output: Option<PathBuf>,
}

impl RunOverrides {
    pub fn apply(self, config: &mut SamplerConfig) {
        if let Some(expiry) = self.expiry {
            config.run.expiry = expiry.to_uppercase();
        }
        if let Some(duration) = self.duration {
            config.run.duration_seconds = duration;
        }
        if let Some(interval) = self.interval {
            config.run.interval_seconds = interval;
        }
        if let Some(strikes) = self.strikes {
            config.run.strikes = strikes;
        }
        if self.testnet {
            config.exchange.network = Network::Test;
        }
        if let Some(estimator) = self.estimator {
            config.run.estimator = match estimator {
                EstimatorArg::FallbackChain => EstimatorKind::FallbackChain,
                EstimatorArg::Black76 => EstimatorKind::Black76,
            };
        }
        if let Some(output) = self.output {
            config.output.directory = output;
        }
    }
}
