//! Compiled predicates and named filters.
//!
//! A named filter is a compiled predicate plus time-bucketed postings:
//! every appended record that satisfies the predicate is recorded under the
//! 1-second bucket of its timestamp. Predefined queries then iterate bucket
//! postings instead of scanning the log.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use strata_common::error::{ManagementError, ParseError};
use strata_common::types::{TimeBucket, Timestamp};
use strata_filter::{CompareOp, Expr};

use crate::index::PostingList;
use crate::schema::{coerce_literal, Schema, Value};

/// One comparison with its column resolved and literal typed.
#[derive(Debug, Clone)]
pub struct CompiledComparison {
    /// Column position in the schema.
    pub column: usize,
    /// Comparison operator.
    pub op: CompareOp,
    /// The literal, coerced to the column's type.
    pub value: Value,
}

/// A predicate compiled onto a schema, in disjunctive normal form.
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    terms: Vec<Vec<CompiledComparison>>,
}

impl CompiledPredicate {
    /// Compiles an expression against a schema.
    ///
    /// Resolves column names and coerces literals; unknown columns and
    /// untypeable literals fail with `ParseError`.
    pub fn compile(expr: &Expr, schema: &Schema) -> Result<Self, ParseError> {
        let dnf = expr.to_dnf();
        let mut terms = Vec::with_capacity(dnf.0.len());
        for conjunction in &dnf.0 {
            let mut compiled = Vec::with_capacity(conjunction.0.len());
            for comparison in &conjunction.0 {
                let column =
                    schema
                        .column(&comparison.column)
                        .ok_or_else(|| ParseError::UnknownColumn {
                            name: comparison.column.clone(),
                        })?;
                let ty = schema.column_at(column).ty();
                let value = coerce_literal(&comparison.literal, ty, &comparison.column)?;
                compiled.push(CompiledComparison {
                    column,
                    op: comparison.op,
                    value,
                });
            }
            terms.push(compiled);
        }
        Ok(Self { terms })
    }

    /// Returns the DNF terms.
    #[must_use]
    pub fn terms(&self) -> &[Vec<CompiledComparison>] {
        &self.terms
    }

    /// Evaluates the predicate against a raw record.
    #[must_use]
    pub fn matches(&self, schema: &Schema, record: &[u8]) -> bool {
        self.terms.iter().any(|conjunction| {
            conjunction
                .iter()
                .all(|c| schema.value(record, c.column).matches(c.op, &c.value))
        })
    }
}

/// A named filter with time-bucketed postings.
pub struct TableFilter {
    name: String,
    predicate: CompiledPredicate,
    buckets: DashMap<u64, Arc<PostingList>>,
}

impl TableFilter {
    /// Creates a filter with empty postings.
    #[must_use]
    pub fn new(name: impl Into<String>, predicate: CompiledPredicate) -> Self {
        Self {
            name: name.into(),
            predicate,
            buckets: DashMap::new(),
        }
    }

    /// Returns the filter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the compiled predicate.
    #[must_use]
    pub fn predicate(&self) -> &CompiledPredicate {
        &self.predicate
    }

    /// Evaluates the filter against a freshly appended record, recording
    /// the offset on a match. Returns whether the record matched.
    pub fn on_append(
        &self,
        schema: &Schema,
        record: &[u8],
        offset: u64,
        timestamp: Timestamp,
    ) -> bool {
        if !self.predicate.matches(schema, record) {
            return false;
        }
        self.buckets
            .entry(timestamp.bucket().ordinal())
            .or_insert_with(|| Arc::new(PostingList::new()))
            .push(offset);
        true
    }

    /// Returns the posting list for one bucket, if any.
    #[must_use]
    pub fn bucket(&self, bucket: TimeBucket) -> Option<Arc<PostingList>> {
        self.buckets.get(&bucket.ordinal()).map(|e| Arc::clone(e.value()))
    }

    /// Returns snapshots of every non-empty bucket in `[from, to]`,
    /// ordered by bucket.
    #[must_use]
    pub fn buckets_in(&self, from: TimeBucket, to: TimeBucket) -> Vec<(u64, Vec<u64>)> {
        let mut out: Vec<(u64, Vec<u64>)> = self
            .buckets
            .iter()
            .filter(|entry| (from.ordinal()..=to.ordinal()).contains(entry.key()))
            .map(|entry| (*entry.key(), entry.value().snapshot()))
            .collect();
        out.sort_unstable_by_key(|(bucket, _)| *bucket);
        out
    }
}

/// The named filters attached to one table.
#[derive(Default)]
pub struct FilterSet {
    filters: RwLock<HashMap<String, Arc<TableFilter>>>,
}

impl FilterSet {
    /// Creates an empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a filter under its name.
    pub fn add(&self, filter: TableFilter) -> Result<(), ManagementError> {
        let mut filters = self.filters.write();
        if filters.contains_key(filter.name()) {
            return Err(ManagementError::DuplicateFilter {
                name: filter.name().to_string(),
            });
        }
        filters.insert(filter.name().to_string(), Arc::new(filter));
        Ok(())
    }

    /// Detaches a filter by name.
    pub fn remove(&self, name: &str) -> Result<(), ManagementError> {
        self.filters
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ManagementError::NoSuchFilter {
                name: name.to_string(),
            })
    }

    /// Looks up a filter by name.
    pub fn get(&self, name: &str) -> Result<Arc<TableFilter>, ManagementError> {
        self.filters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ManagementError::NoSuchFilter {
                name: name.to_string(),
            })
    }

    /// Returns a snapshot of every attached filter.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<TableFilter>> {
        self.filters.read().values().cloned().collect()
    }
}
