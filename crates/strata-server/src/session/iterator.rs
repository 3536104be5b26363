//! Iterator descriptors, handles, and the session's iterator sum type.

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use strata_common::types::{HandlerId, IteratorId};
use strata_engine::{AdhocScan, AlertRange, CombinedStream, PredefStream};

/// What an iterator's batched `data` contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataKind {
    /// Fixed-width records, back to back.
    Record,
    /// Newline-separated alert text lines.
    Alert,
}

/// Which query family an iterator came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IteratorKind {
    /// Ad-hoc predicate scan.
    Adhoc,
    /// Predefined filter range.
    Predef,
    /// Predefined range with an ad-hoc re-test.
    Combined,
    /// Alert log range.
    Alerts,
}

/// Identifies a live iterator for `get_more`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IteratorDescriptor {
    /// What the batched data contains.
    pub data_kind: DataKind,
    /// The session's pinned handler id; pulls from a foreign session are
    /// rejected.
    pub handler_id: HandlerId,
    /// The session-local iterator id.
    pub iterator_id: IteratorId,
    /// The iterator's query family.
    pub kind: IteratorKind,
}

/// One batched pull's worth of results.
#[derive(Debug, Clone)]
pub struct IteratorHandle {
    /// Descriptor for follow-up `get_more` calls.
    pub descriptor: IteratorDescriptor,
    /// The batched payload: raw records or alert text lines.
    pub data: Bytes,
    /// Number of records or alerts in `data`.
    pub num_entries: u32,
    /// Whether the underlying stream has more after this batch.
    pub has_more: bool,
}

/// A session-registered iterator: one variant per stream kind.
///
/// The source kept four separately typed iterator maps; a single registry
/// over this sum type, discriminated by the descriptor's kind, replaces
/// them.
pub(crate) enum SessionIterator {
    Adhoc(AdhocScan),
    Predef(PredefStream),
    Combined(CombinedStream),
    Alerts(AlertRange),
}

impl SessionIterator {
    pub(crate) fn kind(&self) -> IteratorKind {
        match self {
            Self::Adhoc(_) => IteratorKind::Adhoc,
            Self::Predef(_) => IteratorKind::Predef,
            Self::Combined(_) => IteratorKind::Combined,
            Self::Alerts(_) => IteratorKind::Alerts,
        }
    }

    pub(crate) fn data_kind(&self) -> DataKind {
        match self {
            Self::Alerts(_) => DataKind::Alert,
            _ => DataKind::Record,
        }
    }

    pub(crate) fn has_more(&self) -> bool {
        match self {
            Self::Adhoc(s) => s.has_more(),
            Self::Predef(s) => s.has_more(),
            Self::Combined(s) => s.has_more(),
            Self::Alerts(r) => r.has_more(),
        }
    }

    /// Drains up to `batch_size` entries into `buf`, returning the count.
    ///
    /// Records are appended as raw fixed-width bytes; alerts as text lines
    /// terminated by `\n`.
    pub(crate) fn fill(&mut self, batch_size: usize, buf: &mut BytesMut) -> u32 {
        let mut entries = 0u32;
        match self {
            Self::Adhoc(s) => {
                while entries < batch_size as u32 {
                    let Some(view) = s.next() else { break };
                    buf.extend_from_slice(view.bytes());
                    entries += 1;
                }
            }
            Self::Predef(s) => {
                while entries < batch_size as u32 {
                    let Some(view) = s.next() else { break };
                    buf.extend_from_slice(view.bytes());
                    entries += 1;
                }
            }
            Self::Combined(s) => {
                while entries < batch_size as u32 {
                    let Some(view) = s.next() else { break };
                    buf.extend_from_slice(view.bytes());
                    entries += 1;
                }
            }
            Self::Alerts(r) => {
                while entries < batch_size as u32 {
                    let Some(alert) = r.next() else { break };
                    buf.extend_from_slice(alert.to_string().as_bytes());
                    buf.extend_from_slice(b"\n");
                    entries += 1;
                }
            }
        }
        entries
    }
}
