//! Pull-based query streams.
//!
//! Every stream is a non-restartable cursor carrying the snapshot bound it
//! was created with: records published after creation are invisible. The
//! cursors prefetch one record so `has_more` is exact, which is what lets
//! the session layer drop an iterator the moment it drains.

use std::sync::Arc;

use strata_common::types::{TimeBucket, Timestamp};
use strata_storage::RecordView;

use crate::filter::CompiledPredicate;
use crate::planner::QueryPlan;
use crate::table::Table;

/// An ad-hoc predicate scan over the whole log.
///
/// Sourced either sequentially (full scan) or from index-seeded candidate
/// offsets; every candidate is re-checked against the complete predicate.
pub struct AdhocScan {
    table: Arc<Table>,
    predicate: CompiledPredicate,
    snapshot_tail: u64,
    /// Sequential phase cursor; covers `[0, scan_limit)`.
    scan_next: u64,
    /// End of the sequential phase: the snapshot tail for a full scan, or
    /// the prefix the seeding indexes never covered for a candidate plan.
    scan_limit: u64,
    /// Index-seeded offsets probed after the sequential phase.
    candidates: std::vec::IntoIter<u64>,
    peeked: Option<RecordView>,
}

impl AdhocScan {
    pub(crate) fn new(table: Arc<Table>, predicate: CompiledPredicate, plan: QueryPlan) -> Self {
        let snapshot_tail = table.tail();
        let (scan_limit, candidates) = match plan {
            QueryPlan::FullScan => (snapshot_tail, Vec::new()),
            QueryPlan::Candidates { scan_below, offsets } => {
                (scan_below.min(snapshot_tail), offsets)
            }
        };
        let mut scan = Self {
            table,
            predicate,
            snapshot_tail,
            scan_next: 0,
            scan_limit,
            candidates: candidates.into_iter(),
            peeked: None,
        };
        scan.prefetch();
        scan
    }

    /// Returns true while matching records remain.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.peeked.is_some()
    }

    /// Returns the next matching record.
    pub fn next(&mut self) -> Option<RecordView> {
        let view = self.peeked.take()?;
        self.prefetch();
        Some(view)
    }

    fn next_offset(&mut self) -> Option<u64> {
        if self.scan_next < self.scan_limit {
            let offset = self.scan_next;
            self.scan_next += self.table.record_size() as u64;
            return Some(offset);
        }
        loop {
            let offset = self.candidates.next()?;
            if offset < self.snapshot_tail {
                return Some(offset);
            }
        }
    }

    fn prefetch(&mut self) {
        while let Some(offset) = self.next_offset() {
            let Ok(view) = self.table.read_published(offset) else {
                continue;
            };
            if self.predicate.matches(self.table.schema(), view.bytes()) {
                self.peeked = Some(view);
                return;
            }
        }
    }
}

/// A stream over one named filter's bucket postings in a time range.
///
/// Yields records whose timestamp lies in `[from, to)`, restricted to the
/// snapshot tail captured at creation.
pub struct PredefStream {
    table: Arc<Table>,
    from: Timestamp,
    to: Timestamp,
    snapshot_tail: u64,
    buckets: std::vec::IntoIter<(u64, Vec<u64>)>,
    current: std::vec::IntoIter<u64>,
    peeked: Option<RecordView>,
}

impl PredefStream {
    pub(crate) fn new(
        table: Arc<Table>,
        buckets: Vec<(u64, Vec<u64>)>,
        from: Timestamp,
        to: Timestamp,
    ) -> Self {
        let snapshot_tail = table.tail();
        let mut stream = Self {
            table,
            from,
            to,
            snapshot_tail,
            buckets: buckets.into_iter(),
            current: Vec::new().into_iter(),
            peeked: None,
        };
        stream.prefetch();
        stream
    }

    /// Returns true while records remain.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.peeked.is_some()
    }

    /// Returns the next record.
    pub fn next(&mut self) -> Option<RecordView> {
        let view = self.peeked.take()?;
        self.prefetch();
        Some(view)
    }

    /// Returns the time range covered by this stream.
    #[must_use]
    pub fn time_range(&self) -> (Timestamp, Timestamp) {
        (self.from, self.to)
    }

    fn prefetch(&mut self) {
        loop {
            let Some(offset) = self.next_offset() else {
                return;
            };
            if offset >= self.snapshot_tail {
                continue;
            }
            let Ok(view) = self.table.read_published(offset) else {
                continue;
            };
            let ts = self.table.schema().timestamp_of(view.bytes());
            if ts >= self.from && ts < self.to {
                self.peeked = Some(view);
                return;
            }
        }
    }

    fn next_offset(&mut self) -> Option<u64> {
        loop {
            if let Some(offset) = self.current.next() {
                return Some(offset);
            }
            let (_, offsets) = self.buckets.next()?;
            self.current = offsets.into_iter();
        }
    }
}

/// A predefined filter range with an extra ad-hoc predicate re-test.
///
/// Yields exactly the intersection of the named filter's range and the
/// ad-hoc predicate, restricted to `[from, to)`.
pub struct CombinedStream {
    inner: PredefStream,
    predicate: CompiledPredicate,
    peeked: Option<RecordView>,
}

impl CombinedStream {
    pub(crate) fn new(inner: PredefStream, predicate: CompiledPredicate) -> Self {
        let mut stream = Self {
            inner,
            predicate,
            peeked: None,
        };
        stream.prefetch();
        stream
    }

    /// Returns true while matching records remain.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.peeked.is_some()
    }

    /// Returns the next matching record.
    pub fn next(&mut self) -> Option<RecordView> {
        let view = self.peeked.take()?;
        self.prefetch();
        Some(view)
    }

    fn prefetch(&mut self) {
        while let Some(view) = self.inner.next() {
            if self
                .predicate
                .matches(self.inner.table.schema(), view.bytes())
            {
                self.peeked = Some(view);
                return;
            }
        }
    }
}

/// Maps a `[from, to)` time range to the inclusive bucket range it may
/// touch.
pub(crate) fn bucket_range(from: Timestamp, to: Timestamp) -> (TimeBucket, TimeBucket) {
    // `to` is exclusive, but the boundary bucket may still hold qualifying
    // records; the per-record timestamp check trims the excess.
    (from.bucket(), to.bucket())
}
