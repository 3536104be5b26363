//! Ad-hoc query planning.
//!
//! The predicate arrives in DNF. For each conjunct the planner picks the
//! most selective indexable clause to seed candidate offsets; if any
//! conjunct has no indexable clause, the whole query falls back to a full
//! scan bounded by the snapshot tail. Candidates are always re-checked
//! against the complete predicate, so plan choice affects cost, never the
//! result set.

use strata_filter::CompareOp;

use crate::filter::CompiledPredicate;
use crate::index::IndexSet;

/// How an ad-hoc query sources its candidate offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Scan every record below the snapshot tail.
    FullScan,
    /// Probe index-seeded offsets, after scanning the prefix the seeding
    /// indexes never covered.
    Candidates {
        /// Offsets below this were appended before some seeding index was
        /// attached and must be scanned sequentially.
        scan_below: u64,
        /// Index-seeded offsets at or above `scan_below`, sorted and
        /// deduplicated.
        offsets: Vec<u64>,
    },
}

/// Plans a compiled predicate against the table's indexes.
#[must_use]
pub fn plan(predicate: &CompiledPredicate, indexes: &IndexSet, snapshot_tail: u64) -> QueryPlan {
    let mut candidates: Vec<u64> = Vec::new();
    let mut scan_below = 0u64;

    for conjunction in predicate.terms() {
        // Pick the indexable clause with the fewest candidates.
        let mut best: Option<(Vec<u64>, u64)> = None;
        for comparison in conjunction {
            if comparison.op == CompareOp::Neq {
                continue;
            }
            let Some(index) = indexes.get(comparison.column) else {
                continue;
            };
            let hits = index.lookup(comparison.op, &comparison.value);
            let better = best.as_ref().map_or(true, |(b, _)| hits.len() < b.len());
            if better {
                best = Some((hits, index.base_offset()));
            }
        }

        match best {
            // One un-indexable conjunct forces scanning everything anyway.
            None => return QueryPlan::FullScan,
            Some((hits, base)) => {
                // The seeding index is lazy: records before its base were
                // never indexed and have to come from a prefix scan.
                scan_below = scan_below.max(base);
                candidates.extend(hits);
            }
        }
    }

    let scan_below = scan_below.min(snapshot_tail);
    candidates.sort_unstable();
    candidates.dedup();
    candidates.retain(|&offset| offset >= scan_below && offset < snapshot_tail);
    QueryPlan::Candidates {
        scan_below,
        offsets: candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnType, Schema, Value};
    use strata_filter::Parser;

    fn schema() -> Schema {
        Schema::builder()
            .add_column(ColumnType::Long, "e")
            .unwrap()
            .add_column(ColumnType::Int, "d")
            .unwrap()
            .build()
    }

    fn compile(schema: &Schema, expr: &str) -> CompiledPredicate {
        CompiledPredicate::compile(&Parser::parse(expr).unwrap(), schema).unwrap()
    }

    #[test]
    fn test_no_index_means_full_scan() {
        let schema = schema();
        let indexes = IndexSet::new();
        let predicate = compile(&schema, "e > 5");
        assert_eq!(plan(&predicate, &indexes, 100), QueryPlan::FullScan);
    }

    #[test]
    fn test_indexed_clause_seeds_candidates() {
        let schema = schema();
        let indexes = IndexSet::new();
        let e = schema.column("e").unwrap();
        indexes.add(e, 1.0, 0);
        let index = indexes.get(e).unwrap();
        index.insert(&Value::Long(10), 0);
        index.insert(&Value::Long(20), 24);

        let predicate = compile(&schema, "e == 10");
        assert_eq!(
            plan(&predicate, &indexes, 100),
            QueryPlan::Candidates {
                scan_below: 0,
                offsets: vec![0]
            }
        );
    }

    #[test]
    fn test_partially_indexed_disjunction_full_scans() {
        let schema = schema();
        let indexes = IndexSet::new();
        let e = schema.column("e").unwrap();
        indexes.add(e, 1.0, 0);

        // The `d` disjunct has no index, so its matches could be anywhere.
        let predicate = compile(&schema, "e == 10 || d == 3");
        assert_eq!(plan(&predicate, &indexes, 100), QueryPlan::FullScan);
    }

    #[test]
    fn test_candidates_bounded_by_snapshot() {
        let schema = schema();
        let indexes = IndexSet::new();
        let e = schema.column("e").unwrap();
        indexes.add(e, 1.0, 0);
        let index = indexes.get(e).unwrap();
        index.insert(&Value::Long(10), 0);
        index.insert(&Value::Long(10), 48);

        let predicate = compile(&schema, "e == 10");
        assert_eq!(
            plan(&predicate, &indexes, 24),
            QueryPlan::Candidates {
                scan_below: 0,
                offsets: vec![0]
            }
        );
    }

    #[test]
    fn test_neq_is_not_indexable() {
        let schema = schema();
        let indexes = IndexSet::new();
        let e = schema.column("e").unwrap();
        indexes.add(e, 1.0, 0);

        let predicate = compile(&schema, "e != 10");
        assert_eq!(plan(&predicate, &indexes, 100), QueryPlan::FullScan);
    }

    #[test]
    fn test_candidates_deduplicated() {
        let schema = schema();
        let indexes = IndexSet::new();
        let e = schema.column("e").unwrap();
        indexes.add(e, 1.0, 0);
        let index = indexes.get(e).unwrap();
        index.insert(&Value::Long(10), 0);
        index.insert(&Value::Long(20), 24);

        // Both disjuncts are indexed on the same column; overlapping
        // candidate sets collapse.
        let predicate = compile(&schema, "e >= 10 || e == 20");
        assert_eq!(
            plan(&predicate, &indexes, 100),
            QueryPlan::Candidates {
                scan_below: 0,
                offsets: vec![0, 24]
            }
        );
    }
}
