//! Process-wide thread registry.
//!
//! Every thread that touches a table's append path must hold a handler slot
//! in the registry. Registration is explicit: workers call
//! [`ThreadRegistry::register`] before their first append and
//! [`ThreadRegistry::deregister`] at teardown. Identity is keyed by OS
//! thread id, so the registry keeps no hidden thread-local state.
//!
//! The registry is a process-wide resource initialized on first use; the
//! slot count doubles as the server's concurrency cap.

use std::sync::OnceLock;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::info;

use crate::constants::DEFAULT_MAX_CONCURRENCY;
use crate::error::ManagementError;
use crate::types::HandlerId;

static GLOBAL: OnceLock<ThreadRegistry> = OnceLock::new();

/// Registry of worker threads allowed on the append path.
pub struct ThreadRegistry {
    /// Slot occupancy; index is the handler id.
    slots: Mutex<Vec<bool>>,
    /// Registered threads by OS thread id.
    by_thread: DashMap<ThreadId, HandlerId>,
}

impl ThreadRegistry {
    /// Creates a registry with the given slot capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(vec![false; capacity]),
            by_thread: DashMap::new(),
        }
    }

    /// Returns the process-wide registry, initializing it on first use.
    ///
    /// The first caller wins: [`ThreadRegistry::init`] before any other use
    /// sets a custom capacity, otherwise the default applies.
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| Self::with_capacity(DEFAULT_MAX_CONCURRENCY))
    }

    /// Initializes the process-wide registry with a custom capacity.
    ///
    /// Returns false if the registry was already initialized; the existing
    /// capacity then stays in effect.
    pub fn init(capacity: usize) -> bool {
        GLOBAL.set(Self::with_capacity(capacity)).is_ok()
    }

    /// Returns the slot capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns the number of registered threads.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.by_thread.len()
    }

    /// Registers the calling thread and returns its handler id.
    ///
    /// Registering an already-registered thread returns its existing id.
    /// Fails with `RegistrationFailed` when every slot is taken.
    pub fn register(&self) -> Result<HandlerId, ManagementError> {
        let tid = thread::current().id();
        if let Some(existing) = self.by_thread.get(&tid) {
            return Ok(*existing);
        }

        let mut slots = self.slots.lock();
        let free = slots
            .iter()
            .position(|taken| !taken)
            .ok_or(ManagementError::RegistrationFailed)?;
        slots[free] = true;
        drop(slots);

        let id = HandlerId::new(free as u64);
        self.by_thread.insert(tid, id);
        info!(thread = ?tid, handler = %id, "registered handler thread");
        Ok(id)
    }

    /// Releases the calling thread's handler slot.
    ///
    /// Fails with `DeregistrationFailed` if the thread holds no slot.
    pub fn deregister(&self) -> Result<HandlerId, ManagementError> {
        let tid = thread::current().id();
        let (_, id) = self
            .by_thread
            .remove(&tid)
            .ok_or(ManagementError::DeregistrationFailed)?;

        let mut slots = self.slots.lock();
        slots[id.as_u64() as usize] = false;
        drop(slots);

        info!(thread = ?tid, handler = %id, "deregistered handler thread");
        Ok(id)
    }

    /// Returns the calling thread's handler id, if registered.
    #[must_use]
    pub fn current(&self) -> Option<HandlerId> {
        self.by_thread.get(&thread::current().id()).map(|id| *id)
    }
}

/// RAII registration for the calling thread.
///
/// Registers on construction and deregisters on drop. Used by tests and by
/// short-lived worker threads.
pub struct RegisteredThread {
    registry: &'static ThreadRegistry,
    id: HandlerId,
}

impl RegisteredThread {
    /// Registers the calling thread with the process-wide registry.
    pub fn new() -> Result<Self, ManagementError> {
        let registry = ThreadRegistry::global();
        let id = registry.register()?;
        Ok(Self { registry, id })
    }

    /// Returns the held handler id.
    #[must_use]
    pub fn id(&self) -> HandlerId {
        self.id
    }
}

impl Drop for RegisteredThread {
    fn drop(&mut self) {
        let _ = self.registry.deregister();
    }
}
