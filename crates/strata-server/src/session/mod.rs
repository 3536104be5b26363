//! Per-connection session state and the stateful operation surface.
//!
//! A `SessionHandler` mirrors the RPC surface one call per method. It keeps
//! the per-connection state: the pinned handler id, the current table, the
//! monotone iterator id counter, and the registry of live iterators.

mod iterator;

pub use iterator::{DataKind, IteratorDescriptor, IteratorHandle, IteratorKind};

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use strata_common::constants::DEFAULT_ITERATOR_BATCH_SIZE;
use strata_common::error::{InvalidOperation, ManagementError, StrataResult};
use strata_common::types::{HandlerId, IteratorId, TableId, Timestamp};
use strata_common::ThreadRegistry;
use strata_engine::{RecordBatch, Schema, Store, Table};
use strata_storage::StorageMode;

use iterator::SessionIterator;

/// A stateful per-connection handler over the store.
///
/// The wire layer creates one handler per connection and calls its methods
/// in request order. A session may migrate between worker threads across
/// calls, but its handler id stays pinned from `register_handler` until
/// teardown.
pub struct SessionHandler {
    store: Arc<Store>,
    batch_size: usize,
    handler_id: Option<HandlerId>,
    current_table: Option<Arc<Table>>,
    next_iterator_id: u64,
    iterators: HashMap<IteratorId, SessionIterator>,
}

impl SessionHandler {
    /// Creates a handler with the default batch size.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_batch_size(store, DEFAULT_ITERATOR_BATCH_SIZE)
    }

    /// Creates a handler pulling up to `batch_size` entries per call.
    #[must_use]
    pub fn with_batch_size(store: Arc<Store>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            handler_id: None,
            current_table: None,
            next_iterator_id: 0,
            iterators: HashMap::new(),
        }
    }

    /// Returns the pinned handler id, if registered.
    #[must_use]
    pub fn handler_id(&self) -> Option<HandlerId> {
        self.handler_id
    }

    /// Returns the number of live iterators.
    #[must_use]
    pub fn iterator_count(&self) -> usize {
        self.iterators.len()
    }

    // =========================================================================
    // Handler Lifecycle
    // =========================================================================

    /// Registers the serving thread and pins its handler id to the session.
    pub fn register_handler(&mut self) -> StrataResult<HandlerId> {
        let id = ThreadRegistry::global().register()?;
        self.handler_id = Some(id);
        Ok(id)
    }

    /// Releases the serving thread's handler slot.
    pub fn deregister_handler(&mut self) -> StrataResult<()> {
        ThreadRegistry::global().deregister()?;
        self.handler_id = None;
        Ok(())
    }

    // =========================================================================
    // Table Management
    // =========================================================================

    /// Creates a table in the store.
    pub fn create_table(
        &self,
        name: &str,
        schema: Schema,
        mode: StorageMode,
    ) -> StrataResult<TableId> {
        self.store.add_table(name, schema, mode)
    }

    /// Selects the session's current table and returns its schema.
    pub fn set_current_table(&mut self, name: &str) -> StrataResult<Schema> {
        let table = self.store.get_table(name)?;
        let schema = table.schema().clone();
        self.current_table = Some(table);
        Ok(schema)
    }

    /// Attaches an index on the current table.
    pub fn add_index(&self, field: &str, bucket_size: f64) -> StrataResult<()> {
        self.current()?.add_index(field, bucket_size)
    }

    /// Detaches an index on the current table.
    pub fn remove_index(&self, field: &str) -> StrataResult<()> {
        self.current()?.remove_index(field)
    }

    /// Attaches a named filter on the current table.
    pub fn add_filter(&self, name: &str, expr: &str) -> StrataResult<()> {
        self.current()?.add_filter(name, expr)
    }

    /// Detaches a named filter on the current table.
    pub fn remove_filter(&self, name: &str) -> StrataResult<()> {
        self.current()?.remove_filter(name)
    }

    /// Attaches a trigger on the current table.
    pub fn add_trigger(&self, name: &str, filter: &str, expr: &str) -> StrataResult<()> {
        self.current()?.add_trigger(name, filter, expr)
    }

    /// Detaches a trigger on the current table.
    pub fn remove_trigger(&self, name: &str) -> StrataResult<()> {
        self.current()?.remove_trigger(name)
    }

    // =========================================================================
    // Producer Path
    // =========================================================================

    /// Appends one record to the current table.
    pub fn append(&self, data: &[u8]) -> StrataResult<u64> {
        self.current()?.append(data)
    }

    /// Appends a batch to the current table, returning the first offset.
    pub fn append_batch(&self, batch: &RecordBatch) -> StrataResult<u64> {
        self.current()?.append_batch(batch)
    }

    /// Reads `n_records` consecutive records starting at `offset`.
    pub fn read(&self, offset: u64, n_records: usize) -> StrataResult<Bytes> {
        let table = self.current()?;
        let record_size = table.record_size();
        let mut buf = BytesMut::with_capacity(record_size * n_records);
        for i in 0..n_records {
            let view = table.read(offset + (i * record_size) as u64)?;
            buf.extend_from_slice(view.bytes());
        }
        Ok(buf.freeze())
    }

    /// Returns the number of records in the current table.
    pub fn num_records(&self) -> StrataResult<u64> {
        Ok(self.current()?.num_records())
    }

    // =========================================================================
    // Consumer Path
    // =========================================================================

    /// Opens an ad-hoc filter iterator and returns its first batch.
    pub fn adhoc_filter(&mut self, expr: &str) -> StrataResult<IteratorHandle> {
        let scan = self.current()?.execute_filter(expr)?;
        let id = self.insert_iterator(SessionIterator::Adhoc(scan))?;
        self.pull(id, None)
    }

    /// Opens a predefined filter iterator over `[begin_ms, end_ms)` and
    /// returns its first batch.
    pub fn predef_filter(
        &mut self,
        name: &str,
        begin_ms: u64,
        end_ms: u64,
    ) -> StrataResult<IteratorHandle> {
        let stream = self.current()?.query_filter(
            name,
            Timestamp::from_millis(begin_ms),
            Timestamp::from_millis(end_ms),
        )?;
        let id = self.insert_iterator(SessionIterator::Predef(stream))?;
        self.pull(id, None)
    }

    /// Opens a combined filter iterator (predefined range ∩ ad-hoc
    /// predicate) and returns its first batch.
    pub fn combined_filter(
        &mut self,
        name: &str,
        expr: &str,
        begin_ms: u64,
        end_ms: u64,
    ) -> StrataResult<IteratorHandle> {
        let stream = self.current()?.query_filter_with(
            name,
            expr,
            Timestamp::from_millis(begin_ms),
            Timestamp::from_millis(end_ms),
        )?;
        let id = self.insert_iterator(SessionIterator::Combined(stream))?;
        self.pull(id, None)
    }

    /// Opens an alert iterator over `[begin_ms, end_ms)` and returns its
    /// first batch.
    pub fn alerts_by_time(&mut self, begin_ms: u64, end_ms: u64) -> StrataResult<IteratorHandle> {
        let range = self.current()?.get_alerts(
            Timestamp::from_millis(begin_ms),
            Timestamp::from_millis(end_ms),
        );
        let id = self.insert_iterator(SessionIterator::Alerts(range))?;
        self.pull(id, None)
    }

    /// Pulls the next batch from a previously opened iterator.
    ///
    /// The descriptor must carry this session's handler id and an iterator
    /// id that is still live; exhausted iterators are removed by the pull
    /// that drains them.
    pub fn get_more(&mut self, descriptor: &IteratorDescriptor) -> StrataResult<IteratorHandle> {
        let own = self.require_handler()?;
        if descriptor.handler_id != own {
            return Err(InvalidOperation::HandlerMismatch {
                expected: own,
                actual: descriptor.handler_id,
            }
            .into());
        }
        self.pull(descriptor.iterator_id, Some(descriptor.kind))
    }

    /// Drops all session state: iterators first, then the handler slot.
    /// Deregistration at teardown is mandatory.
    pub fn close(&mut self) {
        self.iterators.clear();
        self.current_table = None;
        if self.handler_id.take().is_some() {
            let _ = ThreadRegistry::global().deregister();
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn current(&self) -> StrataResult<&Arc<Table>> {
        self.current_table
            .as_ref()
            .ok_or_else(|| InvalidOperation::NoTableSelected.into())
    }

    fn require_handler(&self) -> StrataResult<HandlerId> {
        self.handler_id
            .ok_or_else(|| ManagementError::HandlerNotRegistered.into())
    }

    fn insert_iterator(&mut self, iterator: SessionIterator) -> StrataResult<IteratorId> {
        self.require_handler()?;
        let id = IteratorId::new(self.next_iterator_id);
        self.next_iterator_id += 1;
        match self.iterators.entry(id) {
            Entry::Occupied(_) => Err(InvalidOperation::DuplicateIteratorId.into()),
            Entry::Vacant(slot) => {
                slot.insert(iterator);
                Ok(id)
            }
        }
    }

    fn pull(
        &mut self,
        id: IteratorId,
        expected_kind: Option<IteratorKind>,
    ) -> StrataResult<IteratorHandle> {
        let handler_id = self.require_handler()?;
        let iterator = self
            .iterators
            .get_mut(&id)
            .ok_or(InvalidOperation::NoSuchIterator)?;
        if expected_kind.is_some_and(|kind| kind != iterator.kind()) {
            return Err(InvalidOperation::NoSuchIterator.into());
        }

        let mut data = BytesMut::new();
        let num_entries = iterator.fill(self.batch_size, &mut data);
        let has_more = iterator.has_more();
        let descriptor = IteratorDescriptor {
            data_kind: iterator.data_kind(),
            handler_id,
            iterator_id: id,
            kind: iterator.kind(),
        };
        if !has_more {
            self.iterators.remove(&id);
            debug!(iterator = %id, "iterator exhausted and removed");
        }

        Ok(IteratorHandle {
            descriptor,
            data: data.freeze(),
            num_entries,
            has_more,
        })
    }
}

impl Drop for SessionHandler {
    fn drop(&mut self) {
        self.close();
    }
}
