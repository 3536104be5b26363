//! Per-column secondary indexes.
//!
//! An index maps a discretized column value to the append-ordered set of
//! record offsets carrying that value. Numeric columns are discretized into
//! buckets of `bucket_size`; bool, char, and string columns use exact keys
//! and ignore the bucket size.
//!
//! Index postings are a superset source for the planner: a bucketed lookup
//! may return offsets whose exact value falls outside the requested bound,
//! so candidates are always re-checked against the full predicate.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use strata_filter::CompareOp;

use crate::schema::{Schema, Value};

/// A discretized index key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// Bucket ordinal for numeric columns; exact code for bool and char.
    Numeric(i64),
    /// Exact key for string columns.
    Text(String),
}

/// An append-ordered set of record offsets.
///
/// Writers on disjoint keys never contend; within one key, offsets are
/// pushed in append order and stay ordered.
#[derive(Debug, Default)]
pub struct PostingList {
    offsets: RwLock<Vec<u64>>,
}

impl PostingList {
    /// Creates an empty posting list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an offset.
    pub fn push(&self, offset: u64) {
        self.offsets.write().push(offset);
    }

    /// Returns a snapshot of the offsets.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u64> {
        self.offsets.read().clone()
    }

    /// Returns the number of offsets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.read().len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.read().is_empty()
    }
}

/// A secondary index over one column.
///
/// Indexes are built lazily: an index only covers records appended after
/// it was attached. `base_offset` records where coverage starts so the
/// planner can scan the uncovered prefix.
pub struct ColumnIndex {
    column: usize,
    bucket_size: f64,
    base_offset: u64,
    postings: DashMap<IndexKey, Arc<PostingList>>,
}

impl ColumnIndex {
    /// Creates an index over the column at `column` with the given bucket
    /// size, covering offsets at or above `base_offset`. Non-positive
    /// bucket sizes fall back to 1.
    #[must_use]
    pub fn new(column: usize, bucket_size: f64, base_offset: u64) -> Self {
        let bucket_size = if bucket_size > 0.0 { bucket_size } else { 1.0 };
        Self {
            column,
            bucket_size,
            base_offset,
            postings: DashMap::new(),
        }
    }

    /// Returns the indexed column position.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Returns the first offset this index covers.
    #[must_use]
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    fn key_of(&self, value: &Value) -> IndexKey {
        match value {
            Value::Str(s) => IndexKey::Text(s.clone()),
            Value::Bool(v) => IndexKey::Numeric(i64::from(*v)),
            Value::Char(v) => IndexKey::Numeric(i64::from(*v)),
            other => {
                // Unwrap is fine: every remaining variant is numeric.
                let v = other.as_f64().unwrap_or(0.0);
                IndexKey::Numeric((v / self.bucket_size).floor() as i64)
            }
        }
    }

    /// Records `offset` under the value's discretized key.
    pub fn insert(&self, value: &Value, offset: u64) {
        let key = self.key_of(value);
        self.postings
            .entry(key)
            .or_insert_with(|| Arc::new(PostingList::new()))
            .push(offset);
    }

    /// Returns candidate offsets for `column op value`.
    ///
    /// The result is a superset for bucketed keys: the boundary bucket is
    /// included whole, and `!=` returns every posting. Callers re-check
    /// candidates against the exact predicate.
    #[must_use]
    pub fn lookup(&self, op: CompareOp, value: &Value) -> Vec<u64> {
        let mut out = Vec::new();
        match op {
            CompareOp::Eq => {
                if let Some(list) = self.postings.get(&self.key_of(value)) {
                    out.extend(list.snapshot());
                }
            }
            CompareOp::Neq => {
                for entry in self.postings.iter() {
                    out.extend(entry.value().snapshot());
                }
            }
            CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                match self.key_of(value) {
                    IndexKey::Numeric(target) => {
                        for entry in self.postings.iter() {
                            let IndexKey::Numeric(bucket) = entry.key() else {
                                continue;
                            };
                            let keep = match op {
                                CompareOp::Lt | CompareOp::Le => *bucket <= target,
                                _ => *bucket >= target,
                            };
                            if keep {
                                out.extend(entry.value().snapshot());
                            }
                        }
                    }
                    IndexKey::Text(target) => {
                        for entry in self.postings.iter() {
                            let IndexKey::Text(key) = entry.key() else {
                                continue;
                            };
                            if op.matches(key.as_str().cmp(target.as_str())) {
                                out.extend(entry.value().snapshot());
                            }
                        }
                    }
                }
            }
        }
        out
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.postings.len()
    }
}

/// The set of indexes attached to one table.
#[derive(Default)]
pub struct IndexSet {
    indexes: RwLock<HashMap<usize, Arc<ColumnIndex>>>,
}

impl IndexSet {
    /// Creates an empty index set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an index over `column` covering offsets from `base_offset`
    /// on. Idempotent: a second add on an already-indexed column keeps the
    /// existing index and its postings.
    ///
    /// Returns true if a new index was created.
    pub fn add(&self, column: usize, bucket_size: f64, base_offset: u64) -> bool {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(&column) {
            return false;
        }
        indexes.insert(
            column,
            Arc::new(ColumnIndex::new(column, bucket_size, base_offset)),
        );
        true
    }

    /// Detaches the index over `column`. Returns true if one existed.
    pub fn remove(&self, column: usize) -> bool {
        self.indexes.write().remove(&column).is_some()
    }

    /// Returns the index over `column`, if any.
    #[must_use]
    pub fn get(&self, column: usize) -> Option<Arc<ColumnIndex>> {
        self.indexes.read().get(&column).cloned()
    }

    /// Inserts a freshly appended record into every attached index.
    pub fn on_append(&self, schema: &Schema, record: &[u8], offset: u64) {
        let indexes = self.indexes.read();
        for index in indexes.values() {
            let value = schema.value(record, index.column());
            index.insert(&value, offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_lookup() {
        let index = ColumnIndex::new(0, 1.0, 0);
        index.insert(&Value::Long(10), 0);
        index.insert(&Value::Long(20), 8);
        index.insert(&Value::Long(10), 16);

        assert_eq!(index.lookup(CompareOp::Eq, &Value::Long(10)), vec![0, 16]);
        assert!(index.lookup(CompareOp::Eq, &Value::Long(30)).is_empty());
    }

    #[test]
    fn test_bucketed_range_lookup_is_superset() {
        let index = ColumnIndex::new(0, 10.0, 0);
        index.insert(&Value::Long(5), 0); // bucket 0
        index.insert(&Value::Long(15), 8); // bucket 1
        index.insert(&Value::Long(25), 16); // bucket 2

        // > 14 targets bucket 1; the whole boundary bucket qualifies.
        let mut hits = index.lookup(CompareOp::Gt, &Value::Long(14));
        hits.sort_unstable();
        assert_eq!(hits, vec![8, 16]);
    }

    #[test]
    fn test_text_lookup() {
        let index = ColumnIndex::new(0, 1.0, 0);
        index.insert(&Value::Str("apple".to_string()), 0);
        index.insert(&Value::Str("banana".to_string()), 8);

        assert_eq!(
            index.lookup(CompareOp::Ge, &Value::Str("b".to_string())),
            vec![8]
        );
    }

    #[test]
    fn test_append_order_within_key() {
        let index = ColumnIndex::new(0, 1.0, 0);
        for offset in [0u64, 8, 16, 24] {
            index.insert(&Value::Int(1), offset);
        }
        assert_eq!(index.lookup(CompareOp::Eq, &Value::Int(1)), vec![0, 8, 16, 24]);
    }

    #[test]
    fn test_index_set_idempotent_add() {
        let set = IndexSet::new();
        assert!(set.add(1, 1.0, 0));
        assert!(!set.add(1, 100.0, 0));
        assert!(set.remove(1));
        assert!(!set.remove(1));
    }
}
