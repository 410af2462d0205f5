//! Bounded fork-join over per-SKU work.
//!
//! Workers pull the next item index from a shared counter and send
//! `(index, result)` over a channel; results are merged after the join, so
//! workers share no mutable state beyond the counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::warn;

use stockwise_core::{AnalyticsError, AnalyticsResult};

use crate::cancel::CancellationToken;

/// Apply `f` to every item on at most `workers` threads.
///
/// Results come back in input order. Returns [`AnalyticsError::Cancelled`] if
/// the token fires before every item has been processed.
pub fn fan_out<T, R, F>(items: &[T], workers: usize, cancel: &CancellationToken, f: F) -> AnalyticsResult<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return if cancel.is_cancelled() {
            Err(AnalyticsError::Cancelled)
        } else {
            Ok(Vec::new())
        };
    }

    let workers = workers.clamp(1, items.len());
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, R)>();

    let work = |tx: mpsc::Sender<(usize, R)>| {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let idx = next.fetch_add(1, Ordering::Relaxed);
            let Some(item) = items.get(idx) else {
                break;
            };
            if tx.send((idx, f(item))).is_err() {
                break;
            }
        }
    };

    thread::scope(|scope| {
        for i in 1..workers {
            let tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("stockwise-worker-{i}"))
                .spawn_scoped(scope, || work(tx));
            if let Err(e) = spawned {
                // The calling thread still drains the queue.
                warn!(worker = i, error = %e, "failed to spawn analytics worker");
            }
        }
        work(tx);
    });

    let mut results: Vec<(usize, R)> = rx.into_iter().collect();
    if cancel.is_cancelled() || results.len() != items.len() {
        return Err(AnalyticsError::Cancelled);
    }
    results.sort_unstable_by_key(|(idx, _)| *idx);
    Ok(results.into_iter().map(|(_, r)| r).collect())
}
