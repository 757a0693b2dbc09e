//! Observability for the sampler
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus metrics
//! - Sampler-specific metric helpers
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("markx", LogFormat::Pretty, "info")?;
//!
//! // Optional
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, SamplerMetrics};
