// =============================================================================
// Scheduler — drives the scan pipeline once or on a fixed cadence
// =============================================================================
//
// Cycle: candles → rank → (order books → notional / spread) → Snapshot.
// Stages run strictly in sequence; only the fetch stages fan out. The catalog
// is resolved once, after the connectivity check, and reused by every cycle.
//
// In repeating mode the cancellation token is only observed between cycles,
// so a cycle that has started always runs to completion.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::analytics::{NotionalCalculator, Ranker, SpreadTracker};
use crate::config::{BookPlan, ScanConfig};
use crate::error::ScanResult;
use crate::market_data::candles::lookback_window;
use crate::market_data::{CandleFetcher, OrderBookFetcher, SymbolCatalog, WorkerPool};
use crate::source::MarketSource;
use crate::types::{SkipCounts, Snapshot, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    Idle,
    Running,
    Cancelled,
}

pub struct Scheduler<S: MarketSource> {
    source: Arc<S>,
    config: ScanConfig,
    plan: Option<BookPlan>,
    candles: CandleFetcher<S>,
    books: OrderBookFetcher<S>,
    /// Resolved on the first cycle.
    symbols: Option<Vec<Symbol>>,
    spreads: SpreadTracker,
    state: SchedulerState,
    cycle: u64,
}

impl<S: MarketSource> Scheduler<S> {
    /// Validate `config` and build the pipeline. No request is made here.
    pub fn new(source: Arc<S>, config: ScanConfig) -> ScanResult<Self> {
        let plan = config.validate()?;
        let pool = WorkerPool::new(config.workers);
        info!(workers = pool.workers(), "worker pool ready");

        if let Some(plan) = plan {
            info!(
                retained_levels = plan.retained_levels,
                fetch_depth = plan.fetch_depth,
                notional = plan.notional,
                spread = plan.spread,
                "order-book stage enabled"
            );
        }

        Ok(Self {
            candles: CandleFetcher::new(
                Arc::clone(&source),
                pool.clone(),
                config.kline_interval.clone(),
            ),
            books: OrderBookFetcher::new(Arc::clone(&source), pool),
            source,
            config,
            plan,
            symbols: None,
            spreads: SpreadTracker::new(),
            state: SchedulerState::Idle,
            cycle: 0,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Completed cycles.
    #[cfg(test)]
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Run a single cycle and return its snapshot.
    pub async fn run_once(&mut self) -> ScanResult<Snapshot> {
        self.state = SchedulerState::Running;
        let result = self.run_cycle().await;
        self.state = SchedulerState::Idle;
        result
    }

    /// Repeat cycles, handing each snapshot to `emit`, until `cancel` fires.
    ///
    /// Returns the number of completed cycles. A fatal error in any cycle
    /// stops the loop and is returned as is.
    pub async fn run<F>(&mut self, cancel: CancellationToken, mut emit: F) -> ScanResult<u64>
    where
        F: FnMut(&Snapshot),
    {
        if cancel.is_cancelled() {
            self.state = SchedulerState::Cancelled;
            info!("cancelled before first cycle");
            return Ok(0);
        }

        self.state = SchedulerState::Running;
        let interval = self.config.interval();
        let mut completed = 0u64;

        loop {
            let snapshot = match self.run_cycle().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    self.state = SchedulerState::Idle;
                    warn!(error = %e, cycle = self.cycle + 1, "cycle failed — stopping");
                    return Err(e);
                }
            };
            emit(&snapshot);
            completed += 1;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.state = SchedulerState::Cancelled;
                    info!(cycles = completed, "scheduler cancelled");
                    return Ok(completed);
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Check connectivity and resolve the catalog, once per scheduler.
    async fn prepare(&mut self) -> ScanResult<()> {
        if self.symbols.is_some() {
            return Ok(());
        }
        self.source.ping().await?;
        let symbols =
            SymbolCatalog::resolve(self.source.as_ref(), self.config.quote_filter()).await?;
        self.symbols = Some(symbols);
        Ok(())
    }

    #[instrument(skip_all, name = "scheduler::cycle", fields(cycle = self.cycle + 1))]
    async fn run_cycle(&mut self) -> ScanResult<Snapshot> {
        self.prepare().await?;
        let symbols = self.symbols.as_deref().unwrap_or(&[]);

        let taken_at = Utc::now();
        let (start_ms, end_ms) = lookback_window(taken_at, self.config.lookback_hours)?;

        let windows = self.candles.fetch_all(symbols, start_ms, end_ms).await?;
        let ranked = Ranker::rank(&windows.entries, self.config.metric, Some(self.config.top));

        let mut skipped = SkipCounts {
            candles: windows.skipped.len(),
            order_books: 0,
        };
        let mut notional = None;
        let mut spreads = None;

        if let Some(plan) = self.plan {
            let top: Vec<Symbol> = ranked.iter().map(|r| r.symbol.clone()).collect();
            let gathered = self.books.fetch_all(&top, plan.retained_levels).await?;
            skipped.order_books = gathered.skipped.len();

            let keep = plan.retained_levels as usize;
            let books = gathered.entries.map_values(|book| {
                let mut book = book.clone();
                book.truncate(keep);
                book
            });

            if plan.notional {
                notional = Some(NotionalCalculator::summarize(&books, keep));
            }
            if plan.spread {
                let bids = books.map_values(|b| b.bids.clone());
                let asks = books.map_values(|b| b.asks.clone());
                spreads = Some(self.spreads.update(&bids, &asks));
            }
        }

        self.cycle += 1;
        info!(
            ranked = ranked.len(),
            skipped_candles = skipped.candles,
            skipped_books = skipped.order_books,
            spreads_tracked = self.spreads.tracked(),
            "cycle complete"
        );

        Ok(Snapshot {
            cycle: self.cycle,
            taken_at,
            metric: self.config.metric,
            lookback_hours: self.config.lookback_hours,
            ranked,
            notional,
            spreads,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::ScanError;
    use crate::source::mock::{book, candle, MockSource};

    fn catalog() -> Vec<Symbol> {
        vec![
            Symbol::new("AAABTC", "AAA", "BTC"),
            Symbol::new("BBBBTC", "BBB", "BTC"),
            Symbol::new("CCCBTC", "CCC", "BTC"),
            Symbol::new("DDDUSDT", "DDD", "USDT"),
        ]
    }

    fn source() -> MockSource {
        MockSource::new(catalog())
            .with_candles("AAABTC", vec![candle(0, dec!(100), 40)])
            .with_candles("CCCBTC", vec![candle(0, dec!(20), 9), candle(1, dec!(50), 10)])
            .with_candles("DDDUSDT", vec![candle(0, dec!(999), 1)])
    }

    fn btc_config() -> ScanConfig {
        ScanConfig {
            quote_asset: Some("BTC".into()),
            ..ScanConfig::default()
        }
    }

    fn levels(n: usize, price: Decimal) -> Vec<(Decimal, Decimal)> {
        (0..n).map(|_| (price, dec!(1))).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_ranks_filtered_symbols_and_skips_empty_windows() {
        let source = Arc::new(source());
        let mut scheduler = Scheduler::new(Arc::clone(&source), btc_config()).unwrap();

        let snapshot = scheduler.run_once().await.unwrap();

        let names: Vec<&str> = snapshot.ranked.iter().map(|r| r.symbol.name.as_str()).collect();
        assert_eq!(names, vec!["AAABTC", "CCCBTC"]);
        assert_eq!(snapshot.ranked[0].value, dec!(100));
        assert_eq!(snapshot.ranked[1].value, dec!(50));
        assert_eq!(snapshot.ranked[1].rank, 1);
        assert_eq!(snapshot.skipped.candles, 1);
        assert!(snapshot.notional.is_none());
        assert!(snapshot.spreads.is_none());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(source.book_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn notional_fetches_normalised_tier_and_sums_retained_levels() {
        let source = Arc::new(
            source()
                .with_book("AAABTC", book(&levels(10, dec!(2)), &levels(10, dec!(3))))
                .with_book("CCCBTC", book(&levels(10, dec!(1)), &levels(10, dec!(1)))),
        );
        let config = ScanConfig {
            notional: Some(7),
            top: 1,
            ..btc_config()
        };
        let mut scheduler = Scheduler::new(Arc::clone(&source), config).unwrap();

        let snapshot = scheduler.run_once().await.unwrap();

        assert_eq!(source.last_depth.load(Ordering::SeqCst), 10);
        assert_eq!(source.book_calls.load(Ordering::SeqCst), 1);
        let notional = snapshot.notional.unwrap();
        assert_eq!(notional.len(), 1);
        assert_eq!(notional[0].symbol.name, "AAABTC");
        assert_eq!(notional[0].bid_levels, 7);
        assert_eq!(notional[0].bids, dec!(14));
        assert_eq!(notional[0].asks, dec!(21));
    }

    #[tokio::test]
    async fn invalid_depth_fails_before_any_request() {
        let source = Arc::new(source());
        let config = ScanConfig {
            notional: Some(6000),
            ..btc_config()
        };

        let err = Scheduler::new(Arc::clone(&source), config).err().unwrap();

        assert!(matches!(err, ScanError::InvalidDepth { .. }));
        assert_eq!(source.ping_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn catalog_is_resolved_once_across_cycles() {
        let source = Arc::new(source());
        let mut scheduler = Scheduler::new(Arc::clone(&source), btc_config()).unwrap();

        scheduler.run_once().await.unwrap();
        scheduler.run_once().await.unwrap();
        let third = scheduler.run_once().await.unwrap();

        assert_eq!(third.cycle, 3);
        assert_eq!(source.ping_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.candle_calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn spread_delta_appears_from_second_cycle() {
        let source = Arc::new(
            source().with_book("AAABTC", book(&[(dec!(10), dec!(1))], &[(dec!(11), dec!(1))])),
        );
        let config = ScanConfig {
            spread: true,
            top: 1,
            ..btc_config()
        };
        let mut scheduler = Scheduler::new(Arc::clone(&source), config).unwrap();

        let first = scheduler.run_once().await.unwrap().spreads.unwrap();
        assert_eq!(first[0].spread, dec!(-1));
        assert_eq!(first[0].delta, None);
        assert_eq!(source.last_depth.load(Ordering::SeqCst), 100);

        source.set_book("AAABTC", book(&[(dec!(10.5), dec!(1))], &[(dec!(11), dec!(1))]));
        let second = scheduler.run_once().await.unwrap().spreads.unwrap();
        assert_eq!(second[0].spread, dec!(-0.5));
        assert_eq!(second[0].previous, Some(dec!(-1)));
        assert_eq!(second[0].delta, Some(dec!(0.5)));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_book_is_counted_as_skipped() {
        let source = Arc::new(
            source().with_book("AAABTC", book(&[(dec!(2), dec!(1))], &[(dec!(3), dec!(1))])),
        );
        let config = ScanConfig {
            notional: Some(5),
            ..btc_config()
        };
        let mut scheduler = Scheduler::new(Arc::clone(&source), config).unwrap();

        let snapshot = scheduler.run_once().await.unwrap();

        assert_eq!(snapshot.skipped.order_books, 1);
        assert_eq!(snapshot.notional.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_mode_stops_at_sleep_boundary() {
        let source = Arc::new(source());
        let config = ScanConfig {
            interval_secs: 10,
            ..btc_config()
        };
        let mut scheduler = Scheduler::new(Arc::clone(&source), config).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let mut seen = Vec::new();
        let completed = scheduler
            .run(cancel, |snapshot| {
                seen.push(snapshot.cycle);
                if snapshot.cycle == 3 {
                    trigger.cancel();
                }
            })
            .await
            .unwrap();

        assert_eq!(completed, 3);
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_sleep_ends_the_loop() {
        let source = Arc::new(source());
        let mut scheduler = Scheduler::new(Arc::clone(&source), btc_config()).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            trigger.cancel();
        });

        let completed = scheduler.run(cancel, |_| {}).await.unwrap();

        // Cycles at t=0 and t=10; cancelled while sleeping towards t=20.
        assert_eq!(completed, 2);
        assert_eq!(scheduler.cycles(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
    }

    #[tokio::test]
    async fn already_cancelled_token_runs_no_cycle() {
        let source = Arc::new(source());
        let mut scheduler = Scheduler::new(Arc::clone(&source), btc_config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let completed = scheduler.run(cancel, |_| {}).await.unwrap();

        assert_eq!(completed, 0);
        assert_eq!(source.ping_calls.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_ends_the_loop() {
        let source = Arc::new(source().failing("BBBBTC"));
        let mut scheduler = Scheduler::new(source, btc_config()).unwrap();

        let err = scheduler
            .run(CancellationToken::new(), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Status { status: 500, .. }));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.cycles(), 0);
    }
}
