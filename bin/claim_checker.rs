//! # Claim Checker
//!
//! Command-line entry point: loads settings and input files, runs every
//! enabled claim API for every address and writes the combined report.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin claim_checker -- --addresses evm.txt --proxies proxies.txt
//! RUST_LOG=debug cargo run --bin claim_checker -- --apis puffer,renzo --no-proxies
//! ```
//!
//! Flags override `Config.toml`, which in turn is overridden by `CLAIMS_*`
//! environment variables (a `.env` file is honoured).

use airdrop_claim_checker::{settings::parse_api_list, ApiKind, Orchestrator, Settings};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "claim_checker", version, about = "Check airdrop claims for a list of wallets")]
struct Args {
    /// Config file (default: ./Config.toml if present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Proxy list, one proxy per line
    #[arg(long)]
    proxies: Option<PathBuf>,

    /// Address list, one wallet per line
    #[arg(long)]
    addresses: Option<PathBuf>,

    /// Where to write the JSON results
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// APIs to query, e.g. `puffer,eigen_s2`
    #[arg(long, value_delimiter = ',')]
    apis: Vec<String>,

    /// Send every request directly, ignoring the proxy list
    #[arg(long)]
    no_proxies: bool,

    /// Pause between two API batches, in seconds
    #[arg(long)]
    cooldown_secs: Option<u64>,

    /// Seed for the proxy shuffle and proxy draws
    #[arg(long)]
    seed: Option<u64>,

    /// Disable the progress bars
    #[arg(long)]
    no_progress: bool,

    /// Serve Prometheus metrics on this address (requires the `observability` feature)
    #[arg(long)]
    metrics_addr: Option<String>,
}

impl Args {
    fn apply(&self, settings: &mut Settings) -> Result<()> {
        if let Some(path) = &self.proxies {
            settings.inputs.proxy_file = path.clone();
        }
        if let Some(path) = &self.addresses {
            settings.inputs.address_file = path.clone();
        }
        if let Some(path) = &self.output {
            settings.inputs.output_file = path.clone();
        }
        if !self.apis.is_empty() {
            settings.run.apis = parse_api_list(&self.apis).context("--apis")?;
        }
        if self.no_proxies {
            settings.inputs.use_proxies = false;
        }
        if let Some(secs) = self.cooldown_secs {
            settings.run.cooldown_seconds = secs;
        }
        if let Some(seed) = self.seed {
            settings.proxy_check.shuffle_seed = Some(seed);
        }
        settings.validate().context("invalid settings")?;
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    args.apply(&mut settings)?;

    if let Some(listen) = &args.metrics_addr {
        #[cfg(feature = "observability")]
        airdrop_claim_checker::metrics::install_prometheus(listen)?;
        #[cfg(not(feature = "observability"))]
        log::warn!(
            "--metrics-addr {} ignored: built without the `observability` feature",
            listen
        );
    }

    let apis: Vec<&str> = settings.run.apis.iter().map(ApiKind::label).collect();
    info!(
        "Checking {} with APIs [{}], cooldown {}s",
        settings.inputs.address_file.display(),
        apis.join(", "),
        settings.run.cooldown_seconds
    );

    let orchestrator = Orchestrator::new(settings)?.with_progress(!args.no_progress);
    let report = orchestrator.run_from_inputs().await?;
    orchestrator.emit(&report)?;

    Ok(())
}
