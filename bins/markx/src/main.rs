//! markx binary
//!
//! Entry point for sampling Deribit option marks: `run` samples, `validate`
//! checks a configuration file and `init` writes a default one.

mod overrides;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{
    generate_default_config, load_config, save_config, validate_config, SamplerConfig,
    ValidationReport,
};
use observability::{init_logging, init_metrics, LogFormat};
use overrides::RunOverrides;
use sampler::{JsonFileSink, RunStatus, SamplerSession, ShutdownController};
use std::path::Path;
use tracing::{debug, error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Run {
            config,
            expiry,
            duration,
            interval,
            strikes,
            testnet,
            estimator,
            output,
        } => {
            let overrides = RunOverrides {
                expiry,
                duration,
                interval,
                strikes,
                testnet,
                estimator,
                output,
            };
            run_command(config.as_deref(), overrides).await
        }
        Commands::Validate { config } => {
            init_logging("markx", LogFormat::Pretty, "info")?;
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Init { output } => {
            init_logging("markx", LogFormat::Pretty, "info")?;
            info!("Executing 'init' command");
            init_command(output).await
        }
    }
}

async fn run_command(config_path: Option<&Path>, overrides: RunOverrides) -> Result<()> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => generate_default_config(),
    };
    overrides.apply(&mut config);

    let format = LogFormat::parse(&config.logging.format).unwrap_or_default();
    init_logging("markx", format, &config.logging.level)?;
    debug!(?config, "Effective configuration");

    let report = validate_config(&config);
    log_warnings(&report);
    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start sampling due to configuration errors");
    }

    if config.metrics.enabled {
        init_metrics(config.metrics.port).context("Failed to start metrics exporter")?;
    }

    info!(
        expiry = %config.run.expiry,
        network = %config.exchange.network,
        estimator = %config.run.estimator,
        strikes = ?config.run.strikes,
        duration_secs = config.run.duration_seconds,
        interval_secs = config.run.interval_seconds,
        "Starting sampler"
    );

    let shutdown = ShutdownController::with_ctrl_c();
    let mut sink = JsonFileSink::new(&config.output);
    let run = SamplerSession::new(config)
        .run(&mut sink, &shutdown)
        .await
        .context("Sampling run failed")?;

    match run.status {
        RunStatus::Interrupted => warn!(ticks = run.ticks.len(), "Sampling interrupted"),
        _ => info!(ticks = run.ticks.len(), "Sampling complete"),
    }
    Ok(())
}

fn log_warnings(report: &ValidationReport) {
    if !report.warnings.is_empty() {
        warn!("Configuration warnings:");
        for warning in &report.warnings {
            warn!(field = %warning.field, message = %warning.message);
        }
    }
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    print_summary(&config);
    Ok(())
}

fn print_summary(config: &SamplerConfig) {
    println!("[ok] Configuration is valid!");
    println!();
    println!("Network: {}", config.exchange.network);
    println!("Endpoint: {}", config.exchange.endpoint_url());
    println!("Expiry: {}", config.run.expiry);
    println!("Strikes: {:?}", config.run.strikes);
    println!(
        "Schedule: every {}s for {}s",
        config.run.interval_seconds, config.run.duration_seconds
    );
    println!("Estimator: {}", config.run.estimator);
    println!("Output: {:?}", config.output.directory);
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Set run.expiry to a listed expiry code and run.strikes to sample");
    println!(
        "  2. Run 'markx validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'markx run --config {:?}' to start sampling",
        output_path
    );

    Ok(())
}
