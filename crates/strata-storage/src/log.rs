//! The append-only segment log.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use strata_common::constants::{DEFAULT_SEGMENT_SIZE, MIN_SEGMENT_SIZE};
use strata_common::error::{OutOfBounds, StrataResult};

use crate::mode::StorageMode;
use crate::segment::Segment;
use crate::view::RecordView;

/// Options controlling where a log's segments live.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Storage mode for the log's segments.
    pub mode: StorageMode,
    /// Directory for segment files; required for the durable modes.
    pub dir: Option<PathBuf>,
    /// Requested segment capacity in bytes. The effective capacity is
    /// rounded down to a multiple of the slot size.
    pub segment_size: usize,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            mode: StorageMode::InMemory,
            dir: None,
            segment_size: DEFAULT_SEGMENT_SIZE,
        }
    }
}

/// A reserved slot that has not been published yet.
///
/// The holder must write the payload and then hand the reservation back to
/// [`SegmentLog::publish`]; until then the slot is invisible to readers.
#[must_use = "a reserved slot must be published"]
#[derive(Debug)]
pub struct Reservation {
    offset: u64,
    len: usize,
}

impl Reservation {
    /// Returns the absolute offset of the reserved slot.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the reserved length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }
}

/// An append-only byte log with stable, monotone slot offsets.
///
/// Every slot is `slot_size` bytes. Appending is wait-free in the common
/// case: one `fetch_add` reserves a slot, the payload is written into the
/// reserved region, and a monotone advance of the read tail publishes it.
/// The read-tail advance happens in offset order, so a reader that observes
/// an offset below the tail observes fully written bytes.
pub struct SegmentLog {
    slot_size: usize,
    segment_capacity: usize,
    mode: StorageMode,
    dir: Option<PathBuf>,
    segments: RwLock<Vec<Arc<Segment>>>,
    write_cursor: AtomicU64,
    read_tail: AtomicU64,
}

impl SegmentLog {
    /// Opens a log with the given slot size and options.
    ///
    /// Fails if a durable mode is requested without a directory, or if the
    /// directory cannot be created.
    pub fn open(slot_size: usize, options: LogOptions) -> StrataResult<Self> {
        assert!(slot_size > 0, "slot size must be positive");

        let requested = options.segment_size.max(MIN_SEGMENT_SIZE).max(slot_size);
        let segment_capacity = requested - requested % slot_size;

        let dir = if options.mode.is_durable() {
            let dir = options.dir.ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "durable storage mode requires a data directory",
                )
            })?;
            std::fs::create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };

        Ok(Self {
            slot_size,
            segment_capacity,
            mode: options.mode,
            dir,
            segments: RwLock::new(Vec::new()),
            write_cursor: AtomicU64::new(0),
            read_tail: AtomicU64::new(0),
        })
    }

    /// Opens a heap-backed log with default segment sizing.
    #[must_use]
    pub fn in_memory(slot_size: usize) -> Self {
        assert!(slot_size > 0, "slot size must be positive");
        let segment_capacity =
            DEFAULT_SEGMENT_SIZE.max(slot_size) - DEFAULT_SEGMENT_SIZE.max(slot_size) % slot_size;
        Self {
            slot_size,
            segment_capacity,
            mode: StorageMode::InMemory,
            dir: None,
            segments: RwLock::new(Vec::new()),
            write_cursor: AtomicU64::new(0),
            read_tail: AtomicU64::new(0),
        }
    }

    /// Returns the slot size in bytes.
    #[inline]
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Returns the log's storage mode.
    #[inline]
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Returns the published high-watermark: every offset below it is
    /// fully readable.
    #[inline]
    pub fn tail(&self) -> u64 {
        self.read_tail.load(Ordering::Acquire)
    }

    /// Returns the number of published slots.
    #[inline]
    pub fn num_slots(&self) -> u64 {
        self.tail() / self.slot_size as u64
    }

    /// Reserves `len` bytes and returns the slot.
    ///
    /// `len` must be a multiple of the slot size; multi-slot reservations
    /// are contiguous. Segment allocation for the reserved range happens
    /// here, so the subsequent write cannot fail. If allocation itself
    /// fails, the reserved range is never published and the log stops
    /// accepting publishes past it rather than exposing an unwritten slot.
    pub fn reserve(&self, len: usize) -> StrataResult<Reservation> {
        debug_assert!(len > 0 && len % self.slot_size == 0);
        let offset = self.write_cursor.fetch_add(len as u64, Ordering::Relaxed);
        self.ensure_segments(offset + len as u64)?;
        Ok(Reservation { offset, len })
    }

    /// Writes one slot's payload at `offset`.
    ///
    /// The caller must hold a reservation covering the slot. A slot never
    /// straddles segments because the segment capacity is a multiple of the
    /// slot size.
    pub fn write_slot(&self, offset: u64, data: &[u8]) {
        debug_assert_eq!(data.len(), self.slot_size);
        let (segment, at) = self.segment_at(offset);
        // SAFETY: the caller holds the reservation for this slot.
        unsafe { segment.write(at, data) };
    }

    /// Publishes a reservation, making its slots visible to readers.
    ///
    /// Publishes occur in offset order: a publish waits for all earlier
    /// reservations to publish first, which makes the read-tail advance the
    /// linearization point for the whole append.
    pub fn publish(&self, reservation: Reservation) {
        let Reservation { offset, len } = reservation;

        match self.mode {
            StorageMode::InMemory => {}
            StorageMode::DurableRelaxed => self.flush_range(offset, len, false),
            StorageMode::DurableStrict => self.flush_range(offset, len, true),
        }

        let end = offset + len as u64;
        while self
            .read_tail
            .compare_exchange_weak(offset, end, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    /// Reads the slot at `offset`.
    ///
    /// Fails with `OutOfBounds` if the offset is at or past the read tail,
    /// or not aligned to the slot size.
    pub fn read(&self, offset: u64) -> Result<RecordView, OutOfBounds> {
        let tail = self.tail();
        if offset >= tail || offset % self.slot_size as u64 != 0 {
            return Err(OutOfBounds { offset, tail });
        }
        let (segment, at) = self.segment_at(offset);
        Ok(RecordView::new(segment, at, self.slot_size))
    }

    /// Reserves, writes, and publishes a single slot.
    pub fn append(&self, data: &[u8]) -> StrataResult<u64> {
        debug_assert_eq!(data.len(), self.slot_size);
        let reservation = self.reserve(self.slot_size)?;
        let offset = reservation.offset();
        self.write_slot(offset, data);
        self.publish(reservation);
        Ok(offset)
    }

    fn segment_at(&self, offset: u64) -> (Arc<Segment>, usize) {
        let index = (offset / self.segment_capacity as u64) as usize;
        let at = (offset % self.segment_capacity as u64) as usize;
        let segments = self.segments.read();
        (Arc::clone(&segments[index]), at)
    }

    /// Makes sure every segment covering `[0, end)` is allocated.
    fn ensure_segments(&self, end: u64) -> StrataResult<()> {
        let needed = end.div_ceil(self.segment_capacity as u64) as usize;
        if self.segments.read().len() >= needed {
            return Ok(());
        }

        let mut segments = self.segments.write();
        while segments.len() < needed {
            let index = segments.len();
            let base = index as u64 * self.segment_capacity as u64;
            let segment = match &self.dir {
                None => Segment::heap(base, self.segment_capacity),
                Some(dir) => {
                    let path = dir.join(format!("segment-{index:06}.dat"));
                    Segment::mapped(base, self.segment_capacity, &path)?
                }
            };
            segments.push(Arc::new(segment));
        }
        Ok(())
    }

    fn flush_range(&self, offset: u64, len: usize, sync: bool) {
        let mut remaining = len;
        let mut at = offset;
        while remaining > 0 {
            let (segment, within) = self.segment_at(at);
            let in_segment = remaining.min(self.segment_capacity - within);
            segment.flush(within, in_segment, sync);
            at += in_segment as u64;
            remaining -= in_segment;
        }
    }
}

impl Drop for SegmentLog {
    fn drop(&mut self) {
        if self.mode.is_durable() {
            let tail = self.tail();
            if tail > 0 {
                self.flush_range(0, tail as usize, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_form_arithmetic_sequence() {
        let log = SegmentLog::in_memory(16);
        let data = [7u8; 16];
        for i in 0..100u64 {
            let offset = log.append(&data).unwrap();
            assert_eq!(offset, i * 16);
        }
        assert_eq!(log.tail(), 1600);
        assert_eq!(log.num_slots(), 100);
    }

    #[test]
    fn test_read_round_trip() {
        let log = SegmentLog::in_memory(8);
        let offset = log.append(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let view = log.read(offset).unwrap();
        assert_eq!(view.bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_read_past_tail() {
        let log = SegmentLog::in_memory(8);
        log.append(&[0u8; 8]).unwrap();
        let err = log.read(8).unwrap_err();
        assert_eq!(err, OutOfBounds { offset: 8, tail: 8 });
    }

    #[test]
    fn test_read_misaligned() {
        let log = SegmentLog::in_memory(8);
        log.append(&[0u8; 8]).unwrap();
        log.append(&[0u8; 8]).unwrap();
        assert!(log.read(4).is_err());
    }

    #[test]
    fn test_reserved_slot_invisible_until_publish() {
        let log = SegmentLog::in_memory(8);
        let reservation = log.reserve(8).unwrap();
        log.write_slot(reservation.offset(), &[9u8; 8]);
        assert!(log.read(0).is_err());
        log.publish(reservation);
        assert_eq!(log.read(0).unwrap().bytes(), &[9u8; 8]);
    }

    #[test]
    fn test_multi_slot_reservation_publishes_once() {
        let log = SegmentLog::in_memory(8);
        let reservation = log.reserve(24).unwrap();
        for slot in 0..3u8 {
            log.write_slot(u64::from(slot) * 8, &[slot; 8]);
        }
        log.publish(reservation);
        assert_eq!(log.num_slots(), 3);
        for slot in 0..3u8 {
            assert_eq!(log.read(u64::from(slot) * 8).unwrap().bytes(), &[slot; 8]);
        }
    }

    #[test]
    fn test_crosses_segment_boundary() {
        let log = SegmentLog::open(
            1024,
            LogOptions {
                segment_size: MIN_SEGMENT_SIZE,
                ..LogOptions::default()
            },
        )
        .unwrap();
        // MIN_SEGMENT_SIZE / 1024 slots per segment; write three segments' worth.
        let per_segment = MIN_SEGMENT_SIZE / 1024;
        for i in 0..(3 * per_segment) {
            let data = vec![i as u8; 1024];
            let offset = log.append(&data).unwrap();
            assert_eq!(log.read(offset).unwrap().bytes(), data.as_slice());
        }
    }

    #[test]
    fn test_durable_strict_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = SegmentLog::open(
            64,
            LogOptions {
                mode: StorageMode::DurableStrict,
                dir: Some(dir.path().to_path_buf()),
                segment_size: MIN_SEGMENT_SIZE,
            },
        )
        .unwrap();
        for i in 0..100u8 {
            let offset = log.append(&[i; 64]).unwrap();
            assert_eq!(log.read(offset).unwrap().bytes(), &[i; 64]);
        }
        assert!(dir.path().join("segment-000000.dat").exists());
    }

    #[test]
    fn test_durable_requires_directory() {
        let result = SegmentLog::open(
            64,
            LogOptions {
                mode: StorageMode::DurableRelaxed,
                dir: None,
                segment_size: MIN_SEGMENT_SIZE,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_concurrent_appends_publish_all() {
        use std::sync::Arc;

        let log = Arc::new(SegmentLog::in_memory(16));
        let threads: Vec<_> = (0..4u8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        log.append(&[t; 16]).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(log.num_slots(), 4000);
        for slot in 0..4000 {
            let view = log.read(slot * 16).unwrap();
            let first = view.bytes()[0];
            assert!(first < 4);
            assert!(view.bytes().iter().all(|&b| b == first));
        }
    }
}
