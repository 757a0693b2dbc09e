//! # Instrument Crate
//!
//! Listed option instruments for one underlying and expiry, and the
//! resolution of user-requested strikes onto them.
//!
//! ## Key Components
//!
//! - **Domain Types**: `ListedInstrument`, `OptionType`, `InstrumentId`, `ResolvedTarget`
//! - **Catalog**: `InstrumentCatalog` binds a requested (strike, side) to the exact
//!   listed instrument, or to the nearest one when the strike is not listed
//!
//! ```text
//! requested strikes ──► InstrumentCatalog ──► ResolvedTarget (standard | closest)
//!                            ▲
//!            exchange listing (queried once at startup)
//! ```

pub mod catalog;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use catalog::InstrumentCatalog;
pub use error::{InstrumentError, InstrumentResult};
pub use types::{InstrumentId, ListedInstrument, OptionType, ResolvedTarget};
