//! System-wide constants for Strata.

// =============================================================================
// Record and Schema Constants
// =============================================================================

/// Width of the implicit leading timestamp column, in bytes.
pub const TIMESTAMP_WIDTH: usize = 8;

/// Minimum record size in bytes.
///
/// Every schema carries the implicit 8-byte timestamp column, so no record
/// can be smaller than that.
pub const MIN_RECORD_SIZE: usize = TIMESTAMP_WIDTH;

// =============================================================================
// Time Bucket Constants
// =============================================================================

/// Width of a time bucket in nanoseconds (1 second).
///
/// Filter postings and trigger evaluation are partitioned into 1-second
/// aligned windows.
pub const TIME_BUCKET_NS: u64 = 1_000_000_000;

// =============================================================================
// Segment Constants
// =============================================================================

/// Default segment capacity in bytes (1 MB).
///
/// The effective capacity is rounded down to a multiple of the table's
/// record size so records never straddle a segment boundary.
pub const DEFAULT_SEGMENT_SIZE: usize = 1024 * 1024;

/// Minimum segment capacity in bytes.
pub const MIN_SEGMENT_SIZE: usize = 4 * 1024;

// =============================================================================
// Session and Worker Constants
// =============================================================================

/// Default number of records (or alerts) returned per iterator pull.
pub const DEFAULT_ITERATOR_BATCH_SIZE: usize = 1024;

/// Default lateness threshold for trigger evaluation, in milliseconds.
///
/// A bucket is evaluated only once it is at least this far in the past,
/// giving slow appenders a grace window.
pub const DEFAULT_TRIGGER_LATENESS_MS: u64 = 1000;

/// Default trigger worker tick interval, in milliseconds.
pub const DEFAULT_TRIGGER_TICK_MS: u64 = 1000;

/// Default maximum number of concurrently registered handler threads.
///
/// This doubles as the server connection cap: every connection needs a
/// registered worker thread to append.
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;
