// =============================================================================
// Worker Pool — bounded fan-out / fan-in over per-symbol fetches
// =============================================================================
//
// Every spawned task carries the slot index of the symbol it was created for
// and hands it back together with its result. Fan-in writes exactly that slot,
// so completion order never decides which symbol a result lands on.
// =============================================================================

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{ScanError, ScanResult};
use crate::types::{Symbol, SymbolMap};

/// Default number of concurrent fetches, independent of catalog size.
pub const DEFAULT_WORKERS: usize = 32;

/// Outcome of one fan-out stage.
#[derive(Debug)]
pub struct Gathered<V> {
    /// Non-empty results in dispatch order.
    pub entries: SymbolMap<V>,
    /// Symbols whose fetch returned nothing, in dispatch order.
    pub skipped: Vec<Symbol>,
}

/// Semaphore-gated task pool shared by the candle and order-book stages.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `fetch` once per symbol with at most `workers` in flight and wait
    /// for every task before returning.
    ///
    /// `Ok(None)` from a task means "no data" and drops that symbol. The first
    /// error observed is returned once all tasks have finished.
    pub async fn gather<V, F, Fut>(
        &self,
        stage: &'static str,
        symbols: &[Symbol],
        fetch: F,
    ) -> ScanResult<Gathered<V>>
    where
        V: Send + 'static,
        F: Fn(&Symbol) -> Fut,
        Fut: Future<Output = ScanResult<Option<V>>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();

        for (slot, symbol) in symbols.iter().enumerate() {
            let permits = Arc::clone(&self.permits);
            let job = fetch(symbol);
            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (slot, Err(ScanError::Task(e.to_string()))),
                };
                (slot, job.await)
            });
        }

        let mut slots: Vec<Option<V>> = symbols.iter().map(|_| None).collect();
        let mut empty_slots = Vec::new();
        let mut first_error: Option<ScanError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, Ok(Some(value)))) => {
                    debug_assert!(slots[slot].is_none(), "slot written twice");
                    slots[slot] = Some(value);
                }
                Ok((slot, Ok(None))) => {
                    debug!(stage, symbol = %symbols[slot], "empty result — dropping symbol");
                    empty_slots.push(slot);
                }
                Ok((slot, Err(e))) => {
                    warn!(stage, symbol = %symbols[slot], error = %e, "fetch failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    warn!(stage, error = %e, "fetch task did not complete");
                    if first_error.is_none() {
                        first_error = Some(ScanError::Task(e.to_string()));
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        empty_slots.sort_unstable();
        let skipped = empty_slots
            .into_iter()
            .map(|slot| symbols[slot].clone())
            .collect();

        let entries = symbols
            .iter()
            .cloned()
            .zip(slots)
            .filter_map(|(symbol, value)| value.map(|v| (symbol, v)))
            .collect();

        Ok(Gathered {
            entries: SymbolMap::from_entries(entries),
            skipped,
        })
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}
