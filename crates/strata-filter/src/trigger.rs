//! Trigger expression representation.

use std::fmt;

use serde::{Deserialize, Serialize};
use strata_common::error::ParseError;

use crate::expr::CompareOp;

/// An aggregate over one time bucket of a filter's postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateKind {
    /// Number of matching records in the bucket.
    Count,
    /// Sum of a numeric column over matching records.
    Sum,
    /// Minimum of a numeric column over matching records.
    Min,
    /// Maximum of a numeric column over matching records.
    Max,
}

impl AggregateKind {
    /// Resolves an aggregate name, case-insensitively.
    pub fn parse(name: &str) -> Result<Self, ParseError> {
        match name.to_ascii_lowercase().as_str() {
            "count" | "cnt" => Ok(Self::Count),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            _ => Err(ParseError::UnknownAggregate {
                name: name.to_string(),
            }),
        }
    }

    /// Returns true if the aggregate needs a column argument.
    #[must_use]
    pub const fn requires_column(self) -> bool {
        !matches!(self, Self::Count)
    }

    /// Returns the aggregate's canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed trigger condition: aggregate ⊗ threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerExpr {
    /// The aggregate to evaluate per bucket.
    pub aggregate: AggregateKind,
    /// The aggregated column; `None` only for `count`.
    pub column: Option<String>,
    /// The comparison against the threshold.
    pub op: CompareOp,
    /// The threshold value.
    pub threshold: f64,
}

impl fmt::Display for TriggerExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "{}({}) {} {}",
                self.aggregate, column, self.op, self.threshold
            ),
            None => write!(f, "{} {} {}", self.aggregate, self.op, self.threshold),
        }
    }
}
