//! The session manager.
//!
//! `Server` owns the store and the set of live sessions, enforcing the
//! connection cap. A transport accepts a connection, creates a session,
//! and routes that connection's requests to its `SessionHandler`; closing
//! the connection closes the session, destroying its iterators and
//! releasing its handler slot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::info;

use strata_common::error::{ManagementError, StrataResult};
use strata_common::ThreadRegistry;
use strata_engine::Store;

use crate::config::ServerConfig;
use crate::session::SessionHandler;

/// Unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Creates a new session ID.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric ID.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Number of live sessions.
    pub active_sessions: usize,
    /// Total sessions created.
    pub total_sessions: u64,
    /// Number of live tables.
    pub total_tables: usize,
    /// Uptime.
    pub uptime: Duration,
}

/// The session manager over one store.
pub struct Server {
    config: ServerConfig,
    store: Arc<Store>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionHandler>>>>,
    next_session_id: AtomicU64,
    total_sessions: AtomicU64,
    started_at: Instant,
}

impl Server {
    /// Opens a server over a fresh store built from `config`.
    ///
    /// Sizes the process-wide thread registry to the configured concurrency
    /// cap; if the registry was already initialized, its existing capacity
    /// stays in effect.
    #[must_use]
    pub fn open(config: ServerConfig) -> Self {
        ThreadRegistry::init(config.max_concurrency);
        let store = Arc::new(Store::new(config.store_options()));
        info!(
            max_concurrency = config.max_concurrency,
            batch_size = config.iterator_batch_size,
            "server opened"
        );
        Self {
            config,
            store,
            sessions: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            total_sessions: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Creates a session, enforcing the connection cap.
    pub fn create_session(&self) -> StrataResult<SessionId> {
        let mut sessions = self.sessions.write();
        if sessions.len() >= self.config.max_concurrency {
            return Err(ManagementError::RegistrationFailed.into());
        }

        let id = SessionId::new(self.next_session_id.fetch_add(1, Ordering::SeqCst));
        let handler = SessionHandler::with_batch_size(
            Arc::clone(&self.store),
            self.config.iterator_batch_size,
        );
        sessions.insert(id, Arc::new(Mutex::new(handler)));
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
        info!(session = %id, "session opened");
        Ok(id)
    }

    /// Gets a session by ID.
    #[must_use]
    pub fn get_session(&self, id: SessionId) -> Option<Arc<Mutex<SessionHandler>>> {
        self.sessions.read().get(&id).cloned()
    }

    /// Closes a session, destroying its iterators and releasing its
    /// handler slot. Returns false for an unknown id.
    pub fn close_session(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&id);
        match removed {
            Some(session) => {
                session.lock().close();
                info!(session = %id, "session closed");
                true
            }
            None => false,
        }
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn active_session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns server statistics.
    #[must_use]
    pub fn stats(&self) -> ServerStats {
        ServerStats {
            active_sessions: self.active_session_count(),
            total_sessions: self.total_sessions.load(Ordering::Relaxed),
            total_tables: self.store.table_count(),
            uptime: self.started_at.elapsed(),
        }
    }

    /// Closes every session.
    pub fn close(&self) {
        let ids: Vec<SessionId> = self.sessions.read().keys().copied().collect();
        for id in ids {
            self.close_session(id);
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let server = Server::open(ServerConfig::default());
        let id = server.create_session().unwrap();
        assert_eq!(server.active_session_count(), 1);
        assert!(server.get_session(id).is_some());

        assert!(server.close_session(id));
        assert!(!server.close_session(id));
        assert_eq!(server.active_session_count(), 0);
        assert_eq!(server.stats().total_sessions, 1);
    }

    #[test]
    fn test_connection_cap() {
        let server = Server::open(ServerConfig::default());
        let cap = server.config().max_concurrency;
        for _ in 0..cap {
            server.create_session().unwrap();
        }
        let err = server.create_session().unwrap_err();
        assert_eq!(err.to_string(), "Could not register handler");
    }
}
