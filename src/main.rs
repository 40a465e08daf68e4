use anyhow::{Result, anyhow};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

use etherseek::capture::SessionSettings;
use etherseek::capture::chrome::ChromeLauncher;
use etherseek::explorer::WalletResolver;
use etherseek::metrics::Metrics;
use etherseek::models::chains::ChainRegistry;
use etherseek::models::common::Config;
use etherseek::models::errors::ConfigError;
use etherseek::pipeline::transformations::dataset::{attach_wallets, distinct_contracts};
use etherseek::pipeline::{build_dataset, call_stats, filter_captures, run_shards, split_urls};
use etherseek::sources::{from_csv_file, from_urlscan};
use etherseek::storage::ResultsWriter;
use etherseek::storage::summary::RunSummary;
use etherseek::utils::load_config;
use etherseek::utils::retry::RetryConfig;

#[derive(Parser, Debug)]
#[command(
    name = "etherseek",
    version,
    about = "Visit phishing pages, capture their blockchain RPC traffic and trace the contracts they call"
)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "urlscan"])))]
struct Cli {
    /// CSV file of URLs and the name of the column holding them
    #[arg(short = 'f', long, num_args = 2, value_names = ["PATH", "COLUMN"])]
    file: Option<Vec<String>>,

    /// Fetch URLs from urlscan.io with this API key
    #[arg(short = 'u', long, value_name = "API_KEY")]
    urlscan: Option<String>,

    /// Name of the output directory under the results path (default: random UUID)
    #[arg(short, long)]
    output: Option<String>,

    /// Also save the unfiltered captures
    #[arg(short, long)]
    raw: bool,

    /// Keep only pages whose URL (or, with `filter_target: domain`, whose traffic domain) contains this keyword
    #[arg(short, long)]
    keyword: String,

    /// Resolve contract creators with this explorer API token
    #[arg(short, long, value_name = "API_TOKEN")]
    wallets: Option<String>,

    /// Chain used for wallet resolution instead of guessing from the keyword
    #[arg(long)]
    chain_id: Option<u64>,

    /// Number of parallel browser workers
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, default_value = "etherseek.yml")]
    config: PathBuf,

    /// Scan at most this many URLs
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    info!("=========================== INITIALIZING ===========================");

    // Load config
    let config = match load_config(&cli.config) {
        Ok(config) => {
            info!("Config loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Err(e);
        }
    };

    if cli.jobs == 0 {
        return Err(ConfigError::InvalidJobCount { jobs: cli.jobs }.into());
    }
    if matches!(cli.wallets.as_deref(), Some(token) if token.trim().is_empty()) {
        return Err(ConfigError::MissingCredential {
            name: "explorer API token".to_string(),
        }
        .into());
    }

    let registry = match &config.chains {
        Some(chains) => ChainRegistry::with_entries(chains.clone()),
        None => ChainRegistry::default().with_explorer_endpoint(&config.explorer_endpoint),
    };

    let run_id = cli
        .output
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let metrics = Metrics::new()?;
    if config.metrics.enabled {
        metrics
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await?;
    } else {
        info!("Metrics server is disabled");
    }

    let mut summary = RunSummary::new(&run_id, &cli.keyword);

    info!("============================ COLLECTING ============================");

    let mut urls = collect_urls(&cli, &config).await?;
    if let Some(limit) = cli.limit {
        urls.truncate(limit);
    }
    if urls.is_empty() {
        warn!("No URLs to scan");
    }
    summary.urls_requested = urls.len();
    summary.shards = cli.jobs;

    info!("============================= CAPTURING ============================");

    let shards = split_urls(&urls, cli.jobs)?;
    let settings = SessionSettings::from_config(&config, cli.verbose);
    let report = run_shards(Arc::new(ChromeLauncher), shards, &settings, Some(&metrics)).await;

    if report.is_partial() {
        for failure in &report.failures {
            error!(
                "Shard {} ({} URLs) produced no results: {}",
                failure.shard, failure.url_count, failure.reason
            );
        }
    }
    summary.failed_shards = report.failures.clone();

    let merged = report.merged();
    let filtered = filter_captures(&merged, &cli.keyword, config.filter_target);
    summary.pages_captured = merged.page_count();
    summary.pages_matched = filtered.page_count();
    summary.events_captured = merged.event_count();
    info!(
        "{} of {} captured pages match '{}'",
        filtered.page_count(),
        merged.page_count(),
        cli.keyword
    );

    info!("============================== SAVING ==============================");

    let writer = ResultsWriter::create(&config.results_path, &run_id)?;
    writer.write_captures(&filtered)?;
    if cli.raw {
        writer.write_raw_captures(&merged)?;
    }

    let rows = build_dataset(&filtered);
    writer.write_dataset(&rows)?;

    let contracts = distinct_contracts(&rows);
    summary.rows = rows.len();
    summary.distinct_contracts = contracts.len();
    summary.calls = call_stats(&rows);

    let mut outcome = Ok(());
    if let Some(token) = &cli.wallets {
        info!("============================= WALLETS ==============================");

        match registry.resolve(cli.chain_id, &cli.keyword, &config.explorer_endpoint) {
            Ok(chain) => {
                info!("Resolving wallets on {} (chain id {})", chain.name, chain.chain_id);
                let resolver =
                    WalletResolver::new(&chain.explorer_endpoint, token, config.explorer_rate())?;
                let wallets = resolver
                    .resolve(&contracts, chain.chain_id, Some(&metrics))
                    .await;

                writer.write_wallets(&chain, &attach_wallets(&rows, &wallets))?;
                summary.chain = Some(chain.name.clone());
                summary.wallets_resolved = Some(wallets.len());
            }
            Err(e) => {
                error!("Skipping wallet resolution: {}", e);
                outcome = Err(e.into());
            }
        }
    }

    summary.finish();
    writer.write_summary(&summary)?;
    writer.write_metrics(&metrics.render()?)?;

    if summary.is_partial() {
        warn!(
            "Run finished with {} failed shard(s); results are partial",
            summary.failed_shards.len()
        );
    }
    info!("Results saved to {}", writer.path().display());

    outcome
}

async fn collect_urls(cli: &Cli, config: &Config) -> Result<Vec<String>> {
    if let Some(file) = &cli.file {
        let [path, column] = file.as_slice() else {
            return Err(anyhow!("--file takes a path and a column name"));
        };
        return from_csv_file(path, column);
    }

    match cli.urlscan.as_deref() {
        Some(api_key) if !api_key.trim().is_empty() => {
            from_urlscan(
                &config.urlscan_endpoint,
                api_key,
                &config.urlscan_query,
                &RetryConfig::default(),
            )
            .await
        }
        _ => Err(ConfigError::MissingCredential {
            name: "urlscan API key".to_string(),
        }
        .into()),
    }
}
