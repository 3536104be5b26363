//! Fixed-capacity segments backing the log.
//!
//! A segment is a contiguous byte region written exactly once per slot.
//! Writers only touch slots they have reserved through the log's write
//! cursor; readers only touch slots below the published read tail. Those
//! two ranges never overlap, which is the invariant every `unsafe` block
//! here relies on.

use std::cell::UnsafeCell;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use memmap2::MmapMut;
use tracing::error;

enum SegmentBuf {
    Heap(Box<[UnsafeCell<u8>]>),
    Mapped {
        ptr: *mut u8,
        map: MmapMut,
    },
}

/// One fixed-capacity region of the log.
pub(crate) struct Segment {
    /// Absolute offset of the segment's first byte.
    base: u64,
    capacity: usize,
    buf: SegmentBuf,
}

// Slot reservation partitions the byte range between writers, and the read
// tail partitions written bytes from in-flight ones.
unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

impl Segment {
    /// Allocates a heap-resident segment, zero-filled.
    pub(crate) fn heap(base: u64, capacity: usize) -> Self {
        let cells: Box<[UnsafeCell<u8>]> = (0..capacity).map(|_| UnsafeCell::new(0)).collect();
        Self {
            base,
            capacity,
            buf: SegmentBuf::Heap(cells),
        }
    }

    /// Creates a memory-mapped segment file of exactly `capacity` bytes.
    pub(crate) fn mapped(base: u64, capacity: usize, path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(capacity as u64)?;

        // SAFETY: the file was just created with the mapped length and the
        // mapping lives as long as the segment.
        let mut map = unsafe { MmapMut::map_mut(&file)? };
        let ptr = map.as_mut_ptr();

        Ok(Self {
            base,
            capacity,
            buf: SegmentBuf::Mapped { ptr, map },
        })
    }

    #[inline]
    pub(crate) fn base(&self) -> u64 {
        self.base
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn ptr(&self) -> *mut u8 {
        match &self.buf {
            SegmentBuf::Heap(cells) => cells.as_ptr() as *mut u8,
            SegmentBuf::Mapped { ptr, .. } => *ptr,
        }
    }

    /// Writes `data` at `at`.
    ///
    /// # Safety
    ///
    /// The caller must hold the reservation covering `[at, at + data.len())`
    /// and the range must lie within the segment.
    pub(crate) unsafe fn write(&self, at: usize, data: &[u8]) {
        debug_assert!(at + data.len() <= self.capacity);
        std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr().add(at), data.len());
    }

    /// Returns the bytes at `[at, at + len)`.
    ///
    /// # Safety
    ///
    /// The range must lie below the log's published read tail, so no writer
    /// can touch it again.
    pub(crate) unsafe fn slice(&self, at: usize, len: usize) -> &[u8] {
        debug_assert!(at + len <= self.capacity);
        std::slice::from_raw_parts(self.ptr().add(at), len)
    }

    /// Flushes the given range to disk for mapped segments; no-op for heap
    /// segments. Flush failures are logged, not propagated: a record whose
    /// flush failed still publishes, trading durability for availability.
    pub(crate) fn flush(&self, at: usize, len: usize, sync: bool) {
        if let SegmentBuf::Mapped { map, .. } = &self.buf {
            let result = if sync {
                map.flush_range(at, len)
            } else {
                map.flush_async_range(at, len)
            };
            if let Err(e) = result {
                error!(base = self.base, at, len, "segment flush failed: {e}");
            }
        }
    }
}
