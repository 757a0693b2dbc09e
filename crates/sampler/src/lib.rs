//! Mark price sampler
//!
//! Samples computed option marks for a fixed set of strikes at a fixed
//! interval and pairs them with the exchange's own marks.
//!
//! # Core Components
//!
//! - [`session`] - Connects, resolves targets, runs the feed and the loop
//! - [`sampling`] - Timed loop over a bounded schedule
//! - [`reporter`] - Estimate -> record, with the standard/closest split
//! - [`sink`] - Where tick and run reports go
//!
//! # Key Invariants
//!
//! - Targets are resolved once, before the first tick, and never change
//! - Every tick reads all targets under one store lock
//! - An in-flight tick always completes; cancellation is seen between ticks

pub mod error;
pub mod record;
pub mod reporter;
pub mod sampling;
pub mod session;
pub mod shutdown;
pub mod sink;

pub use error::{Result, SamplerError};
pub use record::{
    Comparison, RunReport, RunStatus, SampleRecord, StrikeKey, StrikeRecords, TickReport,
};
pub use reporter::{round_price, ComparisonReporter};
pub use sampling::{SamplingLoop, Schedule};
pub use session::{estimator_for, resolve_targets, ticker_channels, SamplerSession};
pub use shutdown::ShutdownController;
pub use sink::{JsonFileSink, MemorySink, ReportSink};
