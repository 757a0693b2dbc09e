//! Common types and utilities for the mark-price sampler
//!
//! This crate provides shared types and error definitions used across
//! all workspace crates.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Shared domain types (Network, ExpiryCode)

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
