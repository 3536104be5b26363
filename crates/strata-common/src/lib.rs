//! # strata-common
//!
//! Common types, errors, and utilities for Strata.
//!
//! This crate provides the foundational types and abstractions used across
//! all Strata components:
//!
//! - **Types**: Core identifiers (`TableId`, `HandlerId`, `IteratorId`),
//!   nanosecond timestamps, and time buckets
//! - **Errors**: The error taxonomy (`ManagementError`, `ParseError`,
//!   `SchemaError`, `InvalidOperation`, `OutOfBounds`) and the unified
//!   `StrataError`
//! - **Thread registry**: Process-wide worker identity required on the
//!   append path
//! - **Constants**: System-wide constants and limits

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod error;
pub mod thread;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{StrataError, StrataResult};
pub use thread::{RegisteredThread, ThreadRegistry};
pub use types::{HandlerId, IteratorId, TableId, TimeBucket, Timestamp};
