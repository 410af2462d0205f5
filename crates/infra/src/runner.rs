//! Scheduled analytics runs on a background thread.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use stockwise_analytics::{
    AnalyticsEngine, CancellationToken, CatalogReader, RunRequest, StockLevelReader, TransactionHistoryReader,
};
use stockwise_core::AnalyticsError;

use crate::sink::SnapshotSink;

/// Schedule and retry settings for the analytics runner.
#[derive(Debug, Clone)]
pub struct AnalyticsRunner {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for AnalyticsRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

/// Readers the runner pulls each run's input from.
pub struct RunnerSources<H: ?Sized, S: ?Sized, C: ?Sized> {
    pub history: Arc<H>,
    pub stock: Arc<S>,
    pub catalog: Arc<C>,
}

/// Handle for a running analytics runner (shutdown + trigger hook).
#[derive(Debug)]
pub struct AnalyticsRunnerHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    cancel: CancellationToken,
    join: Option<thread::JoinHandle<()>>,
}

impl AnalyticsRunnerHandle {
    /// Request a run as soon as possible (e.g. after a bulk import).
    ///
    /// Triggers are coalesced: while a run is already pending this is a no-op.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Stop the runner, cancelling any in-flight run, and wait for the thread.
    pub fn shutdown(mut self) {
        self.cancel.cancel();
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl AnalyticsRunner {
    /// Spawn a runner thread.
    ///
    /// - Schedule: runs once on startup, then every `interval`
    /// - Trigger: `handle.trigger()` requests an extra run
    /// - Failures: logged and retried with bounded exponential backoff; never propagate
    ///
    /// `request` is called at the start of each run and supplies its `as_of` and scope.
    pub fn spawn<H, S, C, K, R>(
        &self,
        name: &'static str,
        engine: AnalyticsEngine,
        sources: RunnerSources<H, S, C>,
        sink: Arc<K>,
        request: R,
    ) -> std::io::Result<AnalyticsRunnerHandle>
    where
        H: TransactionHistoryReader + ?Sized + 'static,
        S: StockLevelReader + ?Sized + 'static,
        C: CatalogReader + ?Sized + 'static,
        K: SnapshotSink + ?Sized,
        R: Fn() -> RunRequest + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);
        let cancel = CancellationToken::new();

        let cfg = self.clone();
        let loop_cancel = cancel.clone();
        let join = thread::Builder::new().name(name.to_string()).spawn(move || {
            let ctx = RunnerContext {
                name,
                cfg,
                engine,
                sources,
                sink,
                request,
                cancel: loop_cancel,
            };
            runner_loop(ctx, shutdown_rx, trigger_rx)
        })?;

        Ok(AnalyticsRunnerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            cancel,
            join: Some(join),
        })
    }
}

struct RunnerContext<H: ?Sized, S: ?Sized, C: ?Sized, K: ?Sized, R> {
    name: &'static str,
    cfg: AnalyticsRunner,
    engine: AnalyticsEngine,
    sources: RunnerSources<H, S, C>,
    sink: Arc<K>,
    request: R,
    cancel: CancellationToken,
}

/// When the next run is due.
#[derive(Debug)]
struct Schedule {
    interval: Duration,
    next_tick: Instant,
    pending: bool,
    failures: u32,
    retry_at: Option<Instant>,
}

impl Schedule {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_tick: now + interval,
            pending: true,
            failures: 0,
            retry_at: None,
        }
    }

    /// Mark a run pending if the interval elapsed; skipped ticks collapse into one.
    fn tick(&mut self, now: Instant) {
        if now < self.next_tick {
            return;
        }
        self.pending = true;
        while self.next_tick <= now {
            self.next_tick += self.interval;
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        self.pending && self.retry_at.is_none_or(|at| now >= at)
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let until = match self.retry_at {
            Some(at) if self.pending => at.min(self.next_tick),
            _ => self.next_tick,
        };
        until.saturating_duration_since(now).min(Duration::from_millis(250))
    }

    fn succeeded(&mut self) {
        self.pending = false;
        self.failures = 0;
        self.retry_at = None;
    }

    /// Returns the attempt number of the failed run.
    fn failed(&mut self, now: Instant, max_retries: u32, base: Duration) -> u32 {
        self.failures += 1;
        let attempt = self.failures;
        if attempt <= max_retries {
            self.pending = true;
            self.retry_at = Some(now + backoff(base, attempt));
        } else {
            self.succeeded();
        }
        attempt
    }
}

fn runner_loop<H, S, C, K, R>(
    ctx: RunnerContext<H, S, C, K, R>,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
) where
    H: TransactionHistoryReader + ?Sized,
    S: StockLevelReader + ?Sized,
    C: CatalogReader + ?Sized,
    K: SnapshotSink + ?Sized,
    R: Fn() -> RunRequest,
{
    let name = ctx.name;
    info!(runner = name, interval_secs = ctx.cfg.interval.as_secs(), "analytics runner started");

    let mut schedule = Schedule::new(ctx.cfg.interval, Instant::now());

    while shutdown_rx.try_recv().is_err() && !ctx.cancel.is_cancelled() {
        let now = Instant::now();
        schedule.tick(now);
        if trigger_rx.try_iter().count() > 0 {
            schedule.pending = true;
        }

        if !schedule.is_due(now) {
            thread::sleep(schedule.idle_for(now).max(Duration::from_millis(10)));
            continue;
        }

        let request = (ctx.request)();
        match ctx.engine.run_from_sources(
            &request,
            &*ctx.sources.history,
            &*ctx.sources.stock,
            &*ctx.sources.catalog,
            &ctx.cancel,
        ) {
            Ok(report) => {
                schedule.succeeded();
                info!(
                    runner = name,
                    run_id = %report.snapshot.run_id,
                    as_of = %request.as_of,
                    alerts = report.snapshot.alerts.len(),
                    diagnostics = report.diagnostics.len(),
                    "scheduled analytics run completed"
                );
                ctx.sink.emit(report);
            }
            Err(AnalyticsError::Cancelled) => break,
            Err(e) => {
                let attempt = schedule.failed(Instant::now(), ctx.cfg.max_retries, ctx.cfg.base_backoff);
                warn!(runner = name, error = %e, attempt, max_retries = ctx.cfg.max_retries, "analytics run failed");
            }
        }
    }

    info!(runner = name, "analytics runner stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(u128::from(pow));
    Duration::from_millis(ms.min(10_000) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_retries_then_gives_up_until_next_tick() {
        let t0 = Instant::now();
        let mut schedule = Schedule::new(Duration::from_secs(60), t0);
        assert!(schedule.is_due(t0));

        assert_eq!(schedule.failed(t0, 2, Duration::from_millis(100)), 1);
        assert!(!schedule.is_due(t0));
        assert!(schedule.is_due(t0 + Duration::from_millis(100)));

        assert_eq!(schedule.failed(t0, 2, Duration::from_millis(100)), 2);
        assert_eq!(schedule.failed(t0, 2, Duration::from_millis(100)), 3);
        assert!(!schedule.is_due(t0 + Duration::from_secs(1)));

        schedule.tick(t0 + Duration::from_secs(185));
        assert!(schedule.is_due(t0 + Duration::from_secs(185)));
        assert_eq!(schedule.next_tick, t0 + Duration::from_secs(240));
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff(base, 1), Duration::from_millis(100));
        assert_eq!(backoff(base, 2), Duration::from_millis(200));
        assert_eq!(backoff(base, 4), Duration::from_millis(800));
        assert_eq!(backoff(base, 30), Duration::from_millis(10_000));
    }
}
