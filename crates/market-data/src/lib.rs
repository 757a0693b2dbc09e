//! Market data and mark price estimation
//!
//! This crate holds the latest market fields per instrument and turns them
//! into mark price estimates.
//!
//! # Core Components
//!
//! - [`store`] - Shared snapshot table fed by the exchange ticker stream
//! - [`estimator`] - Ordered fallback chain over market fields
//! - [`black76`] - Black-76 theoretical pricing on the forward
//!
//! # Key Invariants
//!
//! - A snapshot field is only ever overwritten by a newer value, never cleared
//! - Estimation is pure: same snapshot and clock give the same estimate
//! - An estimate is either a price with the tier that produced it, or an
//!   explicit "unavailable" with its reason; never a defaulted zero

pub mod black76;
pub mod error;
pub mod estimator;
pub mod store;
pub mod types;

pub use error::MarketDataError;
pub use estimator::{Black76Settings, MarkPriceEstimator, FALLBACK_CHAIN};
pub use store::MarketSnapshotStore;
pub use types::{
    Black76Inputs, EstimateMethod, FieldUpdate, MarketFields, MarketSnapshot, MissingInput,
    PriceEstimate, Unavailable,
};

pub type Result<T> = std::result::Result<T, MarketDataError>;
