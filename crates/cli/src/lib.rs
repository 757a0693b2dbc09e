use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "markx")]
#[command(about = "markx - samples computed BTC option mark prices against Deribit's")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample mark prices for the configured strikes until the run duration elapses
    Run {
        /// Path to the configuration file; built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the expiry code (e.g. 27JUN25)
        #[arg(short, long)]
        expiry: Option<String>,

        /// Override the run duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Override the sampling interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// Override the strikes to sample
        #[arg(short, long, num_args = 1.., value_delimiter = ',')]
        strikes: Option<Vec<f64>>,

        /// Use the Deribit testnet
        #[arg(long)]
        testnet: bool,

        /// Override the estimator
        #[arg(long, value_enum)]
        estimator: Option<EstimatorArg>,

        /// Override the report output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration without connecting to the exchange
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "markx.yaml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "markx.yaml")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EstimatorArg {
    /// Quote-driven fallback chain (mid, one-sided, last, settlement, min/max)
    FallbackChain,

    /// Black-76 theoretical price from the ticker's mark volatility
    Black76,
}

impl EstimatorArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorArg::FallbackChain => "fallback_chain",
            EstimatorArg::Black76 => "black76",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
