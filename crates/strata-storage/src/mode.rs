//! Storage mode selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where segment memory lives and when it reaches disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Heap-resident segments; nothing touches disk.
    #[default]
    InMemory,
    /// Memory-mapped segments, flushed asynchronously on publish.
    DurableRelaxed,
    /// Memory-mapped segments, flushed synchronously before publish.
    DurableStrict,
}

impl StorageMode {
    /// Returns true for the memory-mapped modes.
    #[inline]
    #[must_use]
    pub const fn is_durable(self) -> bool {
        matches!(self, Self::DurableRelaxed | Self::DurableStrict)
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InMemory => "in_memory",
            Self::DurableRelaxed => "durable_relaxed",
            Self::DurableStrict => "durable_strict",
        };
        f.write_str(name)
    }
}
