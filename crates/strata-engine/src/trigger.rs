//! Triggers: aggregate conditions over filter buckets.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashSet;
use parking_lot::RwLock;

use strata_common::error::ManagementError;
use strata_common::types::TimeBucket;
use strata_filter::TriggerExpr;

/// A trigger: an aggregate over one filter's bucket, compared against a
/// threshold.
pub struct Trigger {
    name: String,
    filter_name: String,
    expr: TriggerExpr,
    /// Aggregated column position; `None` for bare `count`.
    column: Option<usize>,
    /// Buckets that received matching records since their last evaluation.
    dirty: DashSet<u64>,
}

impl Trigger {
    /// Creates a trigger over the named filter.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        filter_name: impl Into<String>,
        expr: TriggerExpr,
        column: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            filter_name: filter_name.into(),
            expr,
            column,
            dirty: DashSet::new(),
        }
    }

    /// Returns the trigger name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the referenced filter name.
    #[must_use]
    pub fn filter_name(&self) -> &str {
        &self.filter_name
    }

    /// Returns the parsed trigger condition.
    #[must_use]
    pub fn expr(&self) -> &TriggerExpr {
        &self.expr
    }

    /// Returns the aggregated column position, if the aggregate has one.
    #[must_use]
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// Marks a bucket as having received matching records.
    pub fn mark_dirty(&self, bucket: TimeBucket) {
        self.dirty.insert(bucket.ordinal());
    }

    /// Clears and returns the bucket's dirty mark.
    pub fn take_dirty(&self, bucket: TimeBucket) -> bool {
        self.dirty.remove(&bucket.ordinal()).is_some()
    }
}

/// The triggers attached to one table.
#[derive(Default)]
pub struct TriggerSet {
    triggers: RwLock<HashMap<String, Arc<Trigger>>>,
}

impl TriggerSet {
    /// Creates an empty trigger set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a trigger under its name.
    pub fn add(&self, trigger: Trigger) -> Result<(), ManagementError> {
        let mut triggers = self.triggers.write();
        if triggers.contains_key(trigger.name()) {
            return Err(ManagementError::DuplicateTrigger {
                name: trigger.name().to_string(),
            });
        }
        triggers.insert(trigger.name().to_string(), Arc::new(trigger));
        Ok(())
    }

    /// Detaches a trigger by name.
    pub fn remove(&self, name: &str) -> Result<(), ManagementError> {
        self.triggers
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ManagementError::NoSuchTrigger {
                name: name.to_string(),
            })
    }

    /// Marks `bucket` dirty on every trigger referencing `filter_name`.
    pub fn mark_dirty(&self, filter_name: &str, bucket: TimeBucket) {
        let triggers = self.triggers.read();
        for trigger in triggers.values() {
            if trigger.filter_name() == filter_name {
                trigger.mark_dirty(bucket);
            }
        }
    }

    /// Returns a snapshot of every attached trigger.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Trigger>> {
        self.triggers.read().values().cloned().collect()
    }
}
