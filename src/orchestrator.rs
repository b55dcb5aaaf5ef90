//! # Run Orchestrator
//!
//! The `Orchestrator` sequences one complete claim check.
//!
//! ## Overview
//!
//! The orchestrator:
//! - Probes every candidate proxy once and keeps the working set
//! - Runs one concurrent batch per enabled API, in the fixed order
//!   PUFFER, ETHERFI, EIGEN_S2, RENZO, pausing for the cooldown between batches
//! - Hands every per-API result set to the aggregator
//! - Writes the report and prints the summary
//!
//! An empty working set is not an error: requests then go out directly.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use airdrop_claim_checker::{Orchestrator, Settings};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let settings = Settings::new()?;
//! let orchestrator = Orchestrator::new(settings)?;
//!
//! let report = orchestrator.run_from_inputs().await?;
//! orchestrator.emit(&report)?;
//! # Ok(())
//! # }
//! ```

use crate::{
    aggregator,
    api_spec::{ApiCatalog, ApiKind},
    batch_runner::BatchRunner,
    fetcher::Fetcher,
    inputs, metrics,
    proxy::Proxy,
    proxy_pool::{HttpProbe, ProxyPool, ProxyProbe},
    report::Report,
    settings::Settings,
};
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Orchestrator {
    settings: Settings,
    catalog: ApiCatalog,
    fetcher: Arc<Fetcher>,
    probe: Arc<dyn ProxyProbe>,
    show_progress: bool,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Result<Self> {
        let catalog = ApiCatalog::from_settings(&settings).context("building API catalog")?;
        let fetcher = Fetcher::from_settings(&settings).context("building HTTP client")?;
        let probe = Arc::new(HttpProbe::from_settings(&settings));

        Ok(Self {
            settings,
            catalog,
            fetcher: Arc::new(fetcher),
            probe,
            show_progress: true,
        })
    }

    /// Replaces the proxy liveness probe.
    pub fn with_probe(mut self, probe: Arc<dyn ProxyProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> &ApiCatalog {
        &self.catalog
    }

    /// APIs fetched by [`Orchestrator::run`], in batch order. Disabled APIs
    /// are not fetched at all.
    pub fn plan(&self) -> Vec<ApiKind> {
        ApiKind::ALL
            .into_iter()
            .filter(|kind| self.settings.run.apis.contains(kind))
            .collect()
    }

    pub async fn warm_up(&self, candidates: &[Proxy]) -> ProxyPool {
        if candidates.is_empty() {
            info!("No proxies configured. Continuing without proxies.");
            metrics::set_working_proxies(0);
            return ProxyPool::direct();
        }

        info!("Checking {} proxies...", candidates.len());
        let pool = ProxyPool::warm_up(
            self.probe.as_ref(),
            candidates,
            self.settings.proxy_check.shuffle_seed,
        )
        .await;
        info!("Found {} working proxies", pool.len());
        if pool.is_empty() {
            warn!("No working proxies found. Continuing without proxies.");
        }
        pool
    }

    /// Warm-up, every batch, then aggregation.
    pub async fn run(&self, addresses: &[String], candidates: &[Proxy]) -> Report {
        let pool = Arc::new(self.warm_up(candidates).await);
        self.run_with_pool(addresses, pool).await
    }

    /// Runs every batch against an already warmed-up pool.
    pub async fn run_with_pool(&self, addresses: &[String], pool: Arc<ProxyPool>) -> Report {
        let runner = BatchRunner::new(Arc::clone(&self.fetcher)).with_progress(self.show_progress);
        let cooldown = self.settings.run.cooldown();
        let mut per_api = HashMap::new();

        for (i, kind) in self.plan().into_iter().enumerate() {
            if i > 0 && !cooldown.is_zero() {
                info!("Cooling down for {:?} before {}", cooldown, kind);
                tokio::time::sleep(cooldown).await;
            }
            let Some(spec) = self.catalog.get(kind) else {
                warn!("No endpoint configured for {}, skipping", kind);
                continue;
            };
            let results = runner.run(spec, addresses, Arc::clone(&pool)).await;
            per_api.insert(kind, results);
        }

        let report = aggregator::combine(&per_api, addresses, &self.settings.run.apis);
        metrics::record_report_totals(report.wallet_count(), report.total());
        info!(
            "{} of {} wallets have something to claim",
            report.wallet_count(),
            addresses.len()
        );
        report
    }

    /// Loads the configured input files and runs the whole pipeline.
    pub async fn run_from_inputs(&self) -> Result<Report> {
        let inputs = &self.settings.inputs;
        let addresses = inputs::load_addresses(&inputs.address_file)?;

        let candidates = if !inputs.use_proxies {
            info!("Proxy use disabled");
            Vec::new()
        } else if !inputs.proxy_file.exists() {
            warn!(
                "Proxy file {} not found, requests will go out directly",
                inputs.proxy_file.display()
            );
            Vec::new()
        } else {
            inputs::load_proxies(&inputs.proxy_file)?
        };

        Ok(self.run(&addresses, &candidates).await)
    }

    /// Writes the JSON output file and prints the console summary.
    pub fn emit(&self, report: &Report) -> Result<()> {
        let path = &self.settings.inputs.output_file;
        report.write_json(path)?;
        info!("Results saved to {}", path.display());
        report.print_summary();
        Ok(())
    }
}
