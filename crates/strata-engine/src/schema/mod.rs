//! Typed column layout for fixed-width records.
//!
//! Schemas are built additively and immutable after table creation. Every
//! schema carries an implicit leading timestamp column at offset 0, so the
//! first 8 bytes of every record are its nanosecond timestamp.

mod value;

pub use value::{coerce_literal, Value};

use serde::{Deserialize, Serialize};
use std::fmt;

use strata_common::constants::TIMESTAMP_WIDTH;
use strata_common::error::{ManagementError, SchemaError, StrataResult};
use strata_common::types::Timestamp;

/// Name of the implicit leading timestamp column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// The closed set of column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// 1-byte boolean.
    Bool,
    /// 1-byte signed integer.
    Char,
    /// 2-byte signed integer.
    Short,
    /// 4-byte signed integer.
    Int,
    /// 8-byte signed integer.
    Long,
    /// 4-byte IEEE float.
    Float,
    /// 8-byte IEEE float.
    Double,
    /// Fixed-width string of the given byte length, zero padded.
    String(usize),
}

impl ColumnType {
    /// Returns the column width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Bool | Self::Char => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Long | Self::Double => 8,
            Self::String(n) => n,
        }
    }

    /// Returns true for types whose index keys are discretized by a bucket
    /// size rather than matched exactly.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Short | Self::Int | Self::Long | Self::Float | Self::Double
        )
    }

    /// Returns the type's display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String(_) => "string",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(n) => write!(f, "string({n})"),
            other => f.write_str(other.name()),
        }
    }
}

/// One column of a schema: name, type, and byte offset within the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    ty: ColumnType,
    offset: usize,
}

impl Column {
    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    #[must_use]
    pub fn ty(&self) -> ColumnType {
        self.ty
    }

    /// Returns the column's byte offset within a record.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the column width in bytes.
    #[must_use]
    pub fn width(&self) -> usize {
        self.ty.width()
    }
}

/// An ordered, immutable list of columns with a fixed record size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
    record_size: usize,
}

impl Schema {
    /// Starts building a schema. The implicit timestamp column is already
    /// present.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Returns the columns, including the leading timestamp column.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the fixed record size in bytes.
    #[must_use]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Resolves a column name to its position.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the column at the given position.
    #[must_use]
    pub fn column_at(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    /// Reads the timestamp from a record's leading bytes.
    #[must_use]
    pub fn timestamp_of(&self, record: &[u8]) -> Timestamp {
        let mut buf = [0u8; TIMESTAMP_WIDTH];
        buf.copy_from_slice(&record[..TIMESTAMP_WIDTH]);
        Timestamp::from_nanos(u64::from_le_bytes(buf))
    }

    /// Decodes the column at `index` from a record.
    #[must_use]
    pub fn value(&self, record: &[u8], index: usize) -> Value {
        let column = &self.columns[index];
        Value::decode(column.ty, &record[column.offset..column.offset + column.width()])
    }

    /// Decodes every column of a record, timestamp included.
    #[must_use]
    pub fn decode(&self, record: &[u8]) -> Vec<Value> {
        (0..self.columns.len()).map(|i| self.value(record, i)).collect()
    }

    /// Encodes a record from a timestamp and one value per user column.
    ///
    /// `values` covers the columns after the implicit timestamp, in schema
    /// order.
    pub fn encode(&self, timestamp: Timestamp, values: &[Value]) -> StrataResult<Vec<u8>> {
        let expected = self.columns.len() - 1;
        if values.len() != expected {
            return Err(SchemaError::BadType {
                expected: format!("{expected} values"),
                actual: format!("{} values", values.len()),
            }
            .into());
        }

        let mut record = Vec::with_capacity(self.record_size);
        record.extend_from_slice(&timestamp.as_nanos().to_le_bytes());
        for (value, column) in values.iter().zip(&self.columns[1..]) {
            value.encode_into(column.ty, &mut record)?;
        }
        debug_assert_eq!(record.len(), self.record_size);
        Ok(record)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", c.name, c.ty)?;
        }
        write!(f, "}}")
    }
}

/// Additive schema builder.
///
/// Starts with the implicit timestamp column and rejects duplicate names.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    columns: Vec<Column>,
    record_size: usize,
}

impl SchemaBuilder {
    /// Creates a builder holding only the implicit timestamp column.
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: vec![Column {
                name: TIMESTAMP_COLUMN.to_string(),
                ty: ColumnType::Long,
                offset: 0,
            }],
            record_size: TIMESTAMP_WIDTH,
        }
    }

    /// Appends a column.
    pub fn add_column(mut self, ty: ColumnType, name: impl Into<String>) -> StrataResult<Self> {
        let name = name.into();
        if self.columns.iter().any(|c| c.name == name) {
            return Err(ManagementError::DuplicateColumn { name }.into());
        }
        let offset = self.record_size;
        self.record_size += ty.width();
        self.columns.push(Column { name, ty, offset });
        Ok(self)
    }

    /// Finishes the schema.
    #[must_use]
    pub fn build(self) -> Schema {
        Schema {
            columns: self.columns,
            record_size: self.record_size,
        }
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
