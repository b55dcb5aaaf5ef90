// src/batch_runner.rs
//
// Fan-out/fan-in for one API: one task per address, each tagged with the
// address it was created for. Results are attributed through that tag only,
// never through the payload, so identical answers for different addresses
// stay apart.

use crate::api_spec::ApiSpec;
use crate::fetcher::{FetchResult, Fetcher};
use crate::metrics;
use crate::progress::{batch_progress, ProgressBarExt};
use crate::proxy_pool::ProxyPool;
use futures::stream::{FuturesUnordered, StreamExt};
use log::info;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;

/// Results of one API batch, keyed by address.
pub type PerApiResultSet = HashMap<String, FetchResult>;

/// Runs one batch of fetches per call. Clients live in the shared [`Fetcher`]
/// and pool, so they outlive every batch.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    fetcher: Arc<Fetcher>,
    show_progress: bool,
}

/// Resolves `task` and pairs its output with the address it was spawned for.
async fn tagged<T, F>(address: String, task: F) -> (String, Result<T, JoinError>)
where
    F: Future<Output = Result<T, JoinError>>,
{
    (address, task.await)
}

impl BatchRunner {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Fetches `api` for every distinct address concurrently.
    ///
    /// Every address gets an entry; a task that dies is recorded as
    /// [`FetchResult::Failed`].
    pub async fn run(
        &self,
        api: &ApiSpec,
        addresses: &[String],
        pool: Arc<ProxyPool>,
    ) -> PerApiResultSet {
        let started = Instant::now();
        let label = api.kind.label();

        let mut seen = HashSet::new();
        let unique: Vec<&String> = addresses.iter().filter(|a| seen.insert(*a)).collect();

        let progress = batch_progress(unique.len() as u64, label, self.show_progress);
        progress.info(format!("[BATCH] {}: fetching {} addresses", label, unique.len()));

        let spec = Arc::new(api.clone());
        let mut pending = FuturesUnordered::new();
        for address in unique {
            let fetcher = Arc::clone(&self.fetcher);
            let spec = Arc::clone(&spec);
            let proxy = pool.pick_random();
            let task_address = address.clone();
            let handle = tokio::spawn(async move {
                fetcher.fetch(&spec, &task_address, proxy.as_ref()).await
            });
            pending.push(tagged(address.clone(), handle));
        }

        let mut results = PerApiResultSet::with_capacity(pending.len());
        while let Some((address, outcome)) = pending.next().await {
            let result = outcome.unwrap_or_else(|e| {
                progress.error(format!("[BATCH] {} {}: fetch task died: {}", label, address, e));
                metrics::increment_fetch_result(label, "failed");
                FetchResult::Failed(e.to_string())
            });
            results.insert(address, result);
            progress.inc(1);
        }

        let elapsed = started.elapsed();
        metrics::record_batch_duration(label, elapsed);
        let with_data = results.values().filter(|r| r.payload().is_some()).count();
        progress.finish_and_clear();
        info!(
            "[BATCH] {}: {}/{} addresses returned data in {:.1?}",
            label,
            with_data,
            results.len(),
            elapsed
        );
        results
    }
}
