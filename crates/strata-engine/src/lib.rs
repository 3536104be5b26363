//! # strata-engine
//!
//! The Strata storage and query engine.
//!
//! A [`Store`] owns named [`Table`]s. Each table composes a schema-aware
//! record codec, an append-only segment log, per-column secondary indexes,
//! named predicate filters with time-bucketed postings, and triggers that
//! aggregate filter buckets into alerts.
//!
//! Appends fan out to every attached index, filter, and trigger before the
//! record publishes; the read-tail advance is the linearization point, so a
//! reader that observes an offset also observes its side effects.
//!
//! Queries come in four families, all returning pull-based snapshot
//! cursors: ad-hoc predicate scans, predefined filter ranges, combined
//! (predefined ∩ ad-hoc) ranges, and alert ranges.

#![warn(clippy::all)]

mod alert;
mod filter;
mod index;
mod planner;
mod schema;
mod store;
mod stream;
mod table;
mod trigger;
mod worker;

pub use alert::{Alert, AlertLog, AlertRange};
pub use filter::{CompiledComparison, CompiledPredicate, FilterSet, TableFilter};
pub use index::{ColumnIndex, IndexKey, IndexSet, PostingList};
pub use planner::QueryPlan;
pub use schema::{Column, ColumnType, Schema, SchemaBuilder, Value, TIMESTAMP_COLUMN};
pub use store::{Store, StoreOptions};
pub use stream::{AdhocScan, CombinedStream, PredefStream};
pub use table::{RecordBatch, RecordBatchBuilder, Table};
pub use trigger::{Trigger, TriggerSet};
