//! The background trigger worker.
//!
//! One worker thread per table advances the table's trigger clock in
//! 1-second steps. Each tick it evaluates the most recent bucket that is
//! fully past the lateness threshold; buckets missed while the worker was
//! stalled are skipped, not back-filled. Alerts are therefore at-least-once
//! under restarts and never retroactive.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Weak;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error};

use strata_common::types::{TimeBucket, Timestamp};

use crate::table::Table;

pub(crate) struct TriggerWorker {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl TriggerWorker {
    /// Spawns the worker for a table. The worker holds only a weak
    /// reference and exits once the table is dropped.
    pub(crate) fn spawn(
        table: Weak<Table>,
        table_name: &str,
        lateness: Duration,
        tick: Duration,
    ) -> Self {
        let (shutdown, receiver) = mpsc::channel();
        let thread_name = format!("strata-trigger-{table_name}");
        let handle = match std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || run(table, receiver, lateness, tick))
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(table = table_name, "failed to spawn trigger worker: {e}");
                None
            }
        };
        Self { shutdown, handle }
    }

    /// Signals shutdown and joins the worker thread.
    pub(crate) fn stop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            // The worker thread itself may drop the last table reference;
            // joining from there would deadlock.
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for TriggerWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(table: Weak<Table>, shutdown: Receiver<()>, lateness: Duration, tick: Duration) {
    let mut last_evaluated: Option<TimeBucket> = None;
    loop {
        match shutdown.recv_timeout(tick) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        let Some(table) = table.upgrade() else {
            break;
        };

        // The most recent bucket whose end is past the lateness threshold.
        let target = Timestamp::now().sub(lateness).bucket().prev();
        if last_evaluated == Some(target) {
            continue;
        }
        table.evaluate_bucket(target);
        last_evaluated = Some(target);
    }
    debug!("trigger worker exited");
}
