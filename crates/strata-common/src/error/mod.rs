//! Error handling for Strata.
//!
//! This module provides the error taxonomy shared across all Strata
//! components, plus the unified `StrataError` that crosses the session
//! boundary.

mod taxonomy;

pub use taxonomy::{
    ErrorCode, InvalidOperation, ManagementError, OutOfBounds, ParseError, SchemaError,
    StrataError,
};

/// Result type alias for Strata operations.
pub type StrataResult<T> = std::result::Result<T, StrataError>;
