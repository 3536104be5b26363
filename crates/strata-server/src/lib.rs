//! # strata-server
//!
//! The stateful session layer over the Strata engine.
//!
//! Each client connection is served by a [`SessionHandler`]: it pins a
//! handler id from the process-wide thread registry, tracks one current
//! table, and owns a registry of live iterators. Query calls open an
//! iterator and immediately return its first batch; `get_more` drains
//! subsequent batches until the iterator is exhausted and removed.
//!
//! The wire codec is an external collaborator: a binary framing layer
//! would decode requests into calls on `SessionHandler` and encode the
//! returned [`IteratorHandle`]s, errors included, back to the client.
//!
//! # Quick Start
//!
//! ```ignore
//! use strata_server::{Server, ServerConfig};
//!
//! let server = Server::open(ServerConfig::default());
//! let session_id = server.create_session()?;
//! let session = server.get_session(session_id).unwrap();
//!
//! let mut handler = session.lock();
//! handler.register_handler()?;
//! handler.set_current_table("events")?;
//! let handle = handler.adhoc_filter("level >= 3")?;
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use server::{Server, ServerStats, SessionId};
pub use session::{
    DataKind, IteratorDescriptor, IteratorHandle, IteratorKind, SessionHandler,
};
