//! Bounded parallel execution of per-symbol units.
//!
//! Every symbol becomes one task. A semaphore caps how many run at once. A unit's
//! error or panic is logged with its symbol and counted; it never reaches sibling
//! units or the coordinator.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::SyncError;
use crate::models::SymbolRef;

/// Lifecycle of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Queued behind the concurrency limit.
    Pending,
    /// Holding a worker slot.
    Running,
    /// Finished without error.
    Succeeded,
    /// Returned an error or panicked.
    Failed,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitState::Pending => "pending",
            UnitState::Running => "running",
            UnitState::Succeeded => "succeeded",
            UnitState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// End-of-run tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Units that finished cleanly.
    pub succeeded: usize,
    /// Units that errored or panicked.
    pub failed: usize,
}

impl SyncOutcome {
    /// Units processed.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

/// Runs units with a fixed maximum width.
#[derive(Debug, Clone, Copy)]
pub struct ParallelSyncCoordinator {
    workers: usize,
}

impl ParallelSyncCoordinator {
    /// Coordinator running at most `workers` units at a time (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Configured width.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `unit` for every symbol and waits for all of them.
    pub async fn run<F, Fut>(&self, symbols: Vec<SymbolRef>, unit: F) -> SyncOutcome
    where
        F: Fn(SymbolRef) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<usize, SyncError>> + Send + 'static,
    {
        let slots = Arc::new(Semaphore::new(self.workers));
        let unit = Arc::new(unit);
        info!(symbols = symbols.len(), workers = self.workers, "sync run started");

        let mut handles: Vec<(String, JoinHandle<Result<usize, SyncError>>)> =
            Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let code = symbol.code.clone();
            debug!(symbol = %code, state = %UnitState::Pending, "unit queued");

            let slots = Arc::clone(&slots);
            let unit = Arc::clone(&unit);
            let handle = tokio::spawn(async move {
                let _permit = slots
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncError::Config(format!("worker pool closed: {e}")))?;
                debug!(symbol = %symbol.code, state = %UnitState::Running, "unit started");
                unit(symbol).await
            });
            handles.push((code, handle));
        }

        let mut outcome = SyncOutcome::default();
        for (code, handle) in handles {
            match handle.await {
                Ok(Ok(written)) => {
                    outcome.succeeded += 1;
                    debug!(symbol = %code, state = %UnitState::Succeeded, written, "unit finished");
                }
                Ok(Err(e)) => {
                    outcome.failed += 1;
                    error!(
                        symbol = %code,
                        state = %UnitState::Failed,
                        committed = e.committed(),
                        error = %e,
                        "unit failed"
                    );
                }
                Err(join) => {
                    outcome.failed += 1;
                    let cause = if join.is_panic() { "panicked" } else { "cancelled" };
                    error!(symbol = %code, state = %UnitState::Failed, cause, "unit aborted");
                }
            }
        }

        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "sync run finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn symbols(codes: &[&str]) -> Vec<SymbolRef> {
        codes.iter().map(|c| SymbolRef::new(*c, *c)).collect()
    }

    #[tokio::test]
    async fn error_and_panic_each_count_once() {
        let coord = ParallelSyncCoordinator::new(2);
        let outcome = coord
            .run(symbols(&["A", "B", "C", "D"]), |s| async move {
                match s.code.as_str() {
                    "A" => Err(SyncError::Data("bad row".into())),
                    "B" => panic!("unit blew up"),
                    _ => Ok(1),
                }
            })
            .await;
        assert_eq!(outcome, SyncOutcome { succeeded: 2, failed: 2 });
        assert_eq!(outcome.total(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn width_bounds_concurrency() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let coord = ParallelSyncCoordinator::new(3);

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let codes: Vec<String> = (0..12).map(|i| format!("S{i}")).collect();
        let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
        let outcome = coord
            .run(symbols(&refs), move |_| {
                let (r, p) = (Arc::clone(&r), Arc::clone(&p));
                async move {
                    let now = r.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    r.fetch_sub(1, Ordering::SeqCst);
                    Ok(0)
                }
            })
            .await;

        assert_eq!(outcome.succeeded, 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn empty_run_is_zero() {
        let outcome = ParallelSyncCoordinator::new(0)
            .run(Vec::new(), |_| async { Ok(0) })
            .await;
        assert_eq!(outcome, SyncOutcome::default());
    }
}
