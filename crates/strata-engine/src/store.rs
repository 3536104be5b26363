//! The store registry: name and id to table mapping.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::info;

use strata_common::constants::{
    DEFAULT_SEGMENT_SIZE, DEFAULT_TRIGGER_LATENESS_MS, DEFAULT_TRIGGER_TICK_MS,
};
use strata_common::error::{ManagementError, StrataResult};
use strata_common::types::TableId;
use strata_storage::{LogOptions, StorageMode};

use crate::schema::Schema;
use crate::table::Table;
use crate::worker::TriggerWorker;

/// Store-wide defaults applied to every table it creates.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Root directory for durable tables; each table gets a subdirectory.
    pub data_dir: Option<PathBuf>,
    /// Segment capacity passed to each table's log.
    pub segment_size: usize,
    /// How far a bucket must be in the past before triggers evaluate it.
    pub trigger_lateness: Duration,
    /// Trigger worker tick interval.
    pub trigger_tick: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            data_dir: None,
            segment_size: DEFAULT_SEGMENT_SIZE,
            trigger_lateness: Duration::from_millis(DEFAULT_TRIGGER_LATENESS_MS),
            trigger_tick: Duration::from_millis(DEFAULT_TRIGGER_TICK_MS),
        }
    }
}

#[derive(Default)]
struct Inner {
    by_name: HashMap<String, TableId>,
    /// Slot per table id; removal leaves a hole so ids stay stable.
    tables: Vec<Option<Arc<Table>>>,
}

/// Owns every table and maps names and ids to them.
///
/// Tables are reference counted: a session holding a table keeps it usable
/// even after removal from the store.
pub struct Store {
    options: StoreOptions,
    inner: RwLock<Inner>,
}

impl Store {
    /// Creates a store with the given options.
    #[must_use]
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Creates a store that only supports in-memory tables.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(StoreOptions::default())
    }

    /// Returns the store's options.
    #[must_use]
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Creates a table and returns its id.
    ///
    /// Fails with `DuplicateTable` if the name is taken, and with an I/O
    /// error if a durable mode is requested without a data directory.
    pub fn add_table(
        &self,
        name: &str,
        schema: Schema,
        mode: StorageMode,
    ) -> StrataResult<TableId> {
        let mut inner = self.inner.write();
        if inner.by_name.contains_key(name) {
            return Err(ManagementError::DuplicateTable {
                name: name.to_string(),
            }
            .into());
        }

        let dir = if mode.is_durable() {
            let root = self.options.data_dir.clone().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "store has no data directory for durable tables",
                )
            })?;
            Some(root.join(name))
        } else {
            None
        };

        let id = TableId::new(inner.tables.len() as u64);
        let table = Arc::new(Table::new(
            id,
            name,
            schema,
            LogOptions {
                mode,
                dir,
                segment_size: self.options.segment_size,
            },
        )?);

        let worker = TriggerWorker::spawn(
            Arc::downgrade(&table),
            name,
            self.options.trigger_lateness,
            self.options.trigger_tick,
        );
        table.install_worker(worker);

        inner.by_name.insert(name.to_string(), id);
        inner.tables.push(Some(table));
        info!(table = name, id = %id, %mode, "table created");
        Ok(id)
    }

    /// Looks up a table by name.
    pub fn get_table(&self, name: &str) -> StrataResult<Arc<Table>> {
        let inner = self.inner.read();
        inner
            .by_name
            .get(name)
            .and_then(|id| inner.tables[id.as_index()].clone())
            .ok_or_else(|| {
                ManagementError::NoSuchTable {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Looks up a table by id.
    pub fn get_table_by_id(&self, id: TableId) -> StrataResult<Arc<Table>> {
        let inner = self.inner.read();
        inner
            .tables
            .get(id.as_index())
            .and_then(Clone::clone)
            .ok_or_else(|| ManagementError::NoSuchTableId { id }.into())
    }

    /// Resolves a table name to its id.
    pub fn table_id(&self, name: &str) -> StrataResult<TableId> {
        self.inner.read().by_name.get(name).copied().ok_or_else(|| {
            ManagementError::NoSuchTable {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Removes a table by name.
    ///
    /// The error message for an unknown name is an external contract:
    /// `No such table <name>`.
    pub fn remove_table(&self, name: &str) -> StrataResult<()> {
        let table = {
            let mut inner = self.inner.write();
            let id = inner
                .by_name
                .remove(name)
                .ok_or_else(|| ManagementError::NoSuchTable {
                    name: name.to_string(),
                })?;
            inner.tables[id.as_index()].take()
        };
        if let Some(table) = table {
            table.shutdown();
            info!(table = name, "table removed");
        }
        Ok(())
    }

    /// Removes a table by id.
    pub fn remove_table_by_id(&self, id: TableId) -> StrataResult<()> {
        let table = {
            let mut inner = self.inner.write();
            let table = inner
                .tables
                .get_mut(id.as_index())
                .and_then(Option::take)
                .ok_or(ManagementError::NoSuchTableId { id })?;
            inner.by_name.remove(table.name());
            table
        };
        table.shutdown();
        info!(table = table.name(), "table removed");
        Ok(())
    }

    /// Returns every table name, unordered.
    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        self.inner.read().by_name.keys().cloned().collect()
    }

    /// Returns the number of live tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.inner.read().by_name.len()
    }
}
