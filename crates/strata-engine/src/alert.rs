//! The per-table alert log.

use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use strata_common::types::Timestamp;

/// An alert emitted by a trigger for one completed bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// The emitting trigger's name.
    pub trigger: String,
    /// Start of the bucket the aggregate covered.
    pub timestamp: Timestamp,
    /// The observed aggregate value.
    pub value: f64,
}

impl fmt::Display for Alert {
    /// Renders the wire text form: `<trigger>\t<timestamp_ns>\t<value>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.trigger, self.timestamp.as_nanos(), self.value)
    }
}

/// Time-ordered, in-memory alert storage for one table.
///
/// Alerts live for the table's lifetime. Delivery is at-least-once: a
/// restarted trigger worker may re-emit an alert for a bucket it already
/// covered, and readers must tolerate duplicates.
#[derive(Default)]
pub struct AlertLog {
    alerts: RwLock<Vec<Alert>>,
}

impl AlertLog {
    /// Creates an empty alert log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an alert, keeping the log ordered by timestamp.
    pub fn push(&self, alert: Alert) {
        let mut alerts = self.alerts.write();
        let at = alerts.partition_point(|a| a.timestamp <= alert.timestamp);
        alerts.insert(at, alert);
    }

    /// Returns the number of stored alerts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    /// Returns true if no alerts have been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }

    /// Returns a snapshot cursor over alerts with timestamps in `[from, to)`.
    ///
    /// The end is captured at call time; alerts emitted afterwards are
    /// invisible to the cursor.
    #[must_use]
    pub fn range(&self, from: Timestamp, to: Timestamp) -> AlertRange {
        let alerts = self.alerts.read();
        let start = alerts.partition_point(|a| a.timestamp < from);
        let end = alerts.partition_point(|a| a.timestamp < to);
        AlertRange {
            alerts: alerts[start..end].to_vec(),
            pos: 0,
        }
    }
}

/// A pull-based snapshot cursor over a time range of the alert log.
#[derive(Debug, Clone)]
pub struct AlertRange {
    alerts: Vec<Alert>,
    pos: usize,
}

impl AlertRange {
    /// Returns true while alerts remain.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.pos < self.alerts.len()
    }

    /// Returns the next alert, advancing the cursor.
    pub fn next(&mut self) -> Option<Alert> {
        let alert = self.alerts.get(self.pos).cloned()?;
        self.pos += 1;
        Some(alert)
    }

    /// Returns the number of alerts remaining.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.alerts.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(trigger: &str, ts: u64) -> Alert {
        Alert {
            trigger: trigger.to_string(),
            timestamp: Timestamp::from_nanos(ts),
            value: 1.0,
        }
    }

    #[test]
    fn test_display_format() {
        let a = Alert {
            trigger: "hot".to_string(),
            timestamp: Timestamp::from_nanos(5_000_000_000),
            value: 4.0,
        };
        assert_eq!(a.to_string(), "hot\t5000000000\t4");
    }

    #[test]
    fn test_range_is_half_open() {
        let log = AlertLog::new();
        log.push(alert("t", 100));
        log.push(alert("t", 200));
        log.push(alert("t", 300));

        let mut range = log.range(Timestamp::from_nanos(100), Timestamp::from_nanos(300));
        assert_eq!(range.remaining(), 2);
        assert_eq!(range.next().unwrap().timestamp.as_nanos(), 100);
        assert_eq!(range.next().unwrap().timestamp.as_nanos(), 200);
        assert!(!range.has_more());
        assert!(range.next().is_none());
    }

    #[test]
    fn test_out_of_order_push_keeps_order() {
        let log = AlertLog::new();
        log.push(alert("t", 300));
        log.push(alert("t", 100));
        log.push(alert("t", 200));

        let mut range = log.range(Timestamp::ZERO, Timestamp::MAX);
        let stamps: Vec<u64> = std::iter::from_fn(|| range.next())
            .map(|a| a.timestamp.as_nanos())
            .collect();
        assert_eq!(stamps, vec![100, 200, 300]);
    }

    #[test]
    fn test_range_snapshot() {
        let log = AlertLog::new();
        log.push(alert("t", 100));
        let range = log.range(Timestamp::ZERO, Timestamp::MAX);
        log.push(alert("t", 150));
        assert_eq!(range.remaining(), 1);
    }
}
