//! The Strata error taxonomy.
//!
//! Errors are grouped into five families, one enum per family, and a
//! unified `StrataError` wraps them all. Every error carries a
//! human-readable message suitable for crossing the session boundary
//! unchanged.

use thiserror::Error;

use crate::types::{HandlerId, TableId};

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling by a wire layer
/// and are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// Table, column, filter, trigger, or handler management failure.
    Management = 0x0100,
    /// Bad filter or trigger expression.
    Parse = 0x0200,
    /// Record payload does not fit the schema.
    Schema = 0x0300,
    /// Iterator or handler misuse.
    InvalidOperation = 0x0400,
    /// Offset outside the published log.
    OutOfBounds = 0x0500,
    /// Underlying I/O failure.
    Io = 0x0600,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Errors from table, index, filter, trigger, and handler management.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManagementError {
    /// A table with this name already exists.
    #[error("Table {name} already exists")]
    DuplicateTable {
        /// The conflicting table name.
        name: String,
    },

    /// No table with this name is registered.
    ///
    /// The message wording is an external contract; client test suites
    /// match it verbatim.
    #[error("No such table {name}")]
    NoSuchTable {
        /// The missing table name.
        name: String,
    },

    /// No table with this id is registered.
    #[error("No such table {id}")]
    NoSuchTableId {
        /// The missing table id.
        id: TableId,
    },

    /// A schema declares the same column name twice.
    #[error("Duplicate column {name}")]
    DuplicateColumn {
        /// The repeated column name.
        name: String,
    },

    /// The schema has no column with this name.
    #[error("No such column {name}")]
    NoSuchColumn {
        /// The missing column name.
        name: String,
    },

    /// The column is not indexed.
    #[error("No index on column {name}")]
    NoSuchIndex {
        /// The un-indexed column name.
        name: String,
    },

    /// A filter with this name already exists on the table.
    #[error("Filter {name} already exists")]
    DuplicateFilter {
        /// The conflicting filter name.
        name: String,
    },

    /// No filter with this name exists on the table.
    #[error("No such filter {name}")]
    NoSuchFilter {
        /// The missing filter name.
        name: String,
    },

    /// A trigger with this name already exists on the table.
    #[error("Trigger {name} already exists")]
    DuplicateTrigger {
        /// The conflicting trigger name.
        name: String,
    },

    /// No trigger with this name exists on the table.
    #[error("No such trigger {name}")]
    NoSuchTrigger {
        /// The missing trigger name.
        name: String,
    },

    /// The thread registry could not assign a handler slot.
    #[error("Could not register handler")]
    RegistrationFailed,

    /// The calling thread holds no handler slot to release.
    #[error("Could not deregister handler")]
    DeregistrationFailed,

    /// The session has not registered a handler yet.
    #[error("Handler not registered")]
    HandlerNotRegistered,
}

/// Errors from compiling filter or trigger expressions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The lexer or parser hit an unexpected token.
    #[error("Unexpected token {token:?} at position {position}")]
    UnexpectedToken {
        /// The offending token text.
        token: String,
        /// Byte position in the expression.
        position: usize,
    },

    /// The expression ended mid-clause.
    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    /// A comparison references a column the schema does not have.
    #[error("Unknown column {name}")]
    UnknownColumn {
        /// The unresolved column name.
        name: String,
    },

    /// A literal cannot be coerced to its column's type.
    #[error("Invalid literal {value:?} for column {column}")]
    BadLiteral {
        /// The literal text.
        value: String,
        /// The target column name.
        column: String,
    },

    /// A trigger expression names an unknown aggregate.
    #[error("Unknown aggregate {name}")]
    UnknownAggregate {
        /// The unresolved aggregate name.
        name: String,
    },

    /// The aggregate requires a column argument but none was given.
    #[error("Aggregate {name} requires a column argument")]
    MissingAggregateColumn {
        /// The aggregate name.
        name: String,
    },
}

/// Errors from validating record payloads against a schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The payload length differs from the schema's record size.
    #[error("Record size {size} does not match schema record size {expected}")]
    BadSize {
        /// The payload length.
        size: usize,
        /// The schema's record size.
        expected: usize,
    },

    /// A value's type differs from its column's type.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    BadType {
        /// The column type name.
        expected: String,
        /// The supplied value's type name.
        actual: String,
    },
}

/// Errors from iterator and handler misuse on a session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidOperation {
    /// The descriptor references no live iterator.
    #[error("No such iterator")]
    NoSuchIterator,

    /// The descriptor's handler id does not match the session's.
    #[error("handler id mismatch")]
    HandlerMismatch {
        /// The handler id pinned to the session.
        expected: HandlerId,
        /// The handler id carried by the descriptor.
        actual: HandlerId,
    },

    /// An iterator id collided in the session registry. Should never happen.
    #[error("Duplicate iterator id assigned")]
    DuplicateIteratorId,

    /// The session has no current table selected.
    #[error("No table selected")]
    NoTableSelected,
}

/// A read touched an offset outside the published log.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Offset {offset} out of bounds (read tail {tail})")]
pub struct OutOfBounds {
    /// The requested offset.
    pub offset: u64,
    /// The log's published read tail at the time of the read.
    pub tail: u64,
}

/// The unified error type for Strata.
///
/// One variant per taxonomy family, plus I/O from the durable storage
/// backends. Crosses the session boundary with the inner message intact.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Management failure.
    #[error(transparent)]
    Management(#[from] ManagementError),

    /// Expression compilation failure.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Record/schema mismatch.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Iterator or handler misuse.
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperation),

    /// Out-of-bounds read.
    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),

    /// I/O error from a durable storage backend.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl StrataError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Management(_) => ErrorCode::Management,
            Self::Parse(_) => ErrorCode::Parse,
            Self::Schema(_) => ErrorCode::Schema,
            Self::InvalidOperation(_) => ErrorCode::InvalidOperation,
            Self::OutOfBounds(_) => ErrorCode::OutOfBounds,
            Self::Io { .. } => ErrorCode::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_such_table_wording() {
        let err = ManagementError::NoSuchTable {
            name: "my_table".to_string(),
        };
        assert_eq!(err.to_string(), "No such table my_table");
    }

    #[test]
    fn test_registration_failed_wording() {
        assert_eq!(
            ManagementError::RegistrationFailed.to_string(),
            "Could not register handler"
        );
    }

    #[test]
    fn test_iterator_wordings() {
        assert_eq!(InvalidOperation::NoSuchIterator.to_string(), "No such iterator");
        assert_eq!(
            InvalidOperation::DuplicateIteratorId.to_string(),
            "Duplicate iterator id assigned"
        );
        let err = InvalidOperation::HandlerMismatch {
            expected: HandlerId::new(1),
            actual: HandlerId::new(2),
        };
        assert_eq!(err.to_string(), "handler id mismatch");
    }

    #[test]
    fn test_transparent_through_unified() {
        let err: StrataError = ManagementError::NoSuchTable {
            name: "my_table".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "No such table my_table");
        assert_eq!(err.code(), ErrorCode::Management);
    }

    #[test]
    fn test_out_of_bounds_display() {
        let err = OutOfBounds { offset: 128, tail: 64 };
        assert_eq!(err.to_string(), "Offset 128 out of bounds (read tail 64)");
    }
}
