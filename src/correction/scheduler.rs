//! Background worker that recalculates dynamic (throttle-dependent)
//! corrections on their own cadence.

use crossbeam::channel::{bounded, tick, Select, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One scheduled recalculation: a callback plus how often it should run.
pub struct DynamicEntry {
    pub recalc: Box<dyn Fn() + Send>,
    pub period: Duration,
}

/// Runs zero or more [`DynamicEntry`] recalculations on a background
/// thread. With no entries the scheduler never spawns a thread at all —
/// there is nothing to wait on. Shutdown is signaled by dropping the
/// sender half of a rendezvous channel rather than polling a flag: the
/// worker thread blocks in `Select` until either a tick fires or the
/// channel disconnects.
pub struct CorrectionScheduler {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CorrectionScheduler {
    pub fn spawn(entries: Vec<DynamicEntry>) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        if entries.is_empty() {
            return CorrectionScheduler { shutdown: Some(shutdown_tx), handle: None };
        }

        let handle = thread::spawn(move || {
            let tickers: Vec<_> = entries.iter().map(|e| tick(e.period)).collect();
            loop {
                let mut sel = Select::new();
                for t in &tickers {
                    sel.recv(t);
                }
                let shutdown_idx = sel.recv(&shutdown_rx);

                let op = sel.select();
                let idx = op.index();
                if idx == shutdown_idx {
                    break;
                }
                if op.recv(&tickers[idx]).is_ok() {
                    (entries[idx].recalc)();
                }
            }
        });

        CorrectionScheduler { shutdown: Some(shutdown_tx), handle: Some(handle) }
    }

    pub fn stop(mut self) {
        self.shutdown.take();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for CorrectionScheduler {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn empty_entries_spawns_no_thread() {
        let scheduler = CorrectionScheduler::spawn(Vec::new());
        assert!(scheduler.handle.is_none());
    }

    #[test]
    fn recalc_runs_at_least_once_within_its_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let entry = DynamicEntry {
            recalc: Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
            period: Duration::from_millis(20),
        };
        let scheduler = CorrectionScheduler::spawn(vec![entry]);
        thread::sleep(Duration::from_millis(150));
        scheduler.stop();
        assert!(counter.load(Ordering::SeqCst) >= 2);
    }
}
