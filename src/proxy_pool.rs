// src/proxy_pool.rs
//
// Proxy warm-up and selection. Every candidate is probed exactly once, in
// parallel; the survivors are shuffled and then shared read-only by all
// fetch tasks for the rest of the run.

use crate::metrics;
use crate::proxy::Proxy;
use crate::settings::Settings;
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Liveness check for one proxy.
#[async_trait]
pub trait ProxyProbe: Send + Sync {
    async fn probe(&self, proxy: &Proxy) -> bool;
}

/// Probes a proxy with a GET to a test URL; only a 200 counts as working.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    test_url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(test_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            test_url: test_url.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.proxy_check.test_url.clone(),
            settings.proxy_check.timeout(),
        )
    }
}

#[async_trait]
impl ProxyProbe for HttpProbe {
    async fn probe(&self, proxy: &Proxy) -> bool {
        let client = match proxy
            .to_reqwest()
            .and_then(|p| Client::builder().proxy(p).timeout(self.timeout).build())
        {
            Ok(client) => client,
            Err(e) => {
                debug!("[PROXY_CHECK] {} -> client build failed: {}", proxy, e);
                return false;
            }
        };

        match client.get(&self.test_url).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => true,
            Ok(resp) => {
                debug!("[PROXY_CHECK] {} -> status {}", proxy, resp.status());
                false
            }
            Err(e) => {
                debug!("[PROXY_CHECK] {} -> {}", proxy, e);
                false
            }
        }
    }
}

/// A proxy that passed the probe, with a client that routes through it.
#[derive(Debug, Clone)]
pub struct WorkingProxy {
    pub proxy: Proxy,
    pub client: Client,
}

impl WorkingProxy {
    pub fn new(proxy: Proxy) -> reqwest::Result<Self> {
        let client = Client::builder().proxy(proxy.to_reqwest()?).build()?;
        Ok(Self { proxy, client })
    }
}

/// Read-only working set built once at startup.
#[derive(Debug)]
pub struct ProxyPool {
    working: Vec<WorkingProxy>,
    rng: Mutex<StdRng>,
}

impl ProxyPool {
    /// Empty pool: every request goes out directly.
    pub fn direct() -> Self {
        Self::from_working(Vec::new(), None)
    }

    /// Builds a pool from proxies already known to work. Proxies whose client
    /// cannot be built are dropped with a warning.
    pub fn from_working(proxies: Vec<Proxy>, seed: Option<u64>) -> Self {
        let working = proxies
            .into_iter()
            .filter_map(|proxy| match WorkingProxy::new(proxy.clone()) {
                Ok(working) => Some(working),
                Err(e) => {
                    warn!("[PROXY_POOL] dropping {}: {}", proxy, e);
                    None
                }
            })
            .collect();
        Self {
            working,
            rng: Mutex::new(seeded_rng(seed)),
        }
    }

    /// Probes every distinct candidate concurrently and returns the working
    /// ones in shuffled order.
    pub async fn check_all(
        probe: &dyn ProxyProbe,
        candidates: &[Proxy],
        rng: &mut StdRng,
    ) -> Vec<Proxy> {
        let mut seen = HashSet::new();
        let unique: Vec<&Proxy> = candidates.iter().filter(|p| seen.insert(*p)).collect();

        let outcomes = join_all(unique.iter().map(|proxy| probe.probe(proxy))).await;

        let mut working: Vec<Proxy> = unique
            .into_iter()
            .zip(outcomes)
            .filter_map(|(proxy, ok)| {
                metrics::increment_proxy_probe(ok);
                ok.then(|| proxy.clone())
            })
            .collect();
        working.shuffle(rng);
        working
    }

    /// Probes `candidates` and builds the pool from the survivors.
    pub async fn warm_up(probe: &dyn ProxyProbe, candidates: &[Proxy], seed: Option<u64>) -> Self {
        let mut rng = seeded_rng(seed);
        let working = Self::check_all(probe, candidates, &mut rng).await;
        info!(
            "[PROXY_POOL] {}/{} proxies passed the liveness check",
            working.len(),
            candidates.len()
        );
        metrics::set_working_proxies(working.len());

        // Continue the same stream for the per-request draws.
        let mut pool = Self::from_working(working, None);
        pool.rng = Mutex::new(rng);
        pool
    }

    /// Uniformly random working proxy, or `None` when the pool is empty.
    pub fn pick_random(&self) -> Option<WorkingProxy> {
        if self.working.is_empty() {
            return None;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.working.choose(&mut *rng).cloned()
    }

    pub fn proxies(&self) -> impl Iterator<Item = &Proxy> {
        self.working.iter().map(|w| &w.proxy)
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
