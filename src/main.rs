use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use mvp_stats_collector::{checkpoint, config, export, report, roster};
use mvp_stats_collector::{CheckpointStore, Collector, Config, NbaStatsClient};

#[derive(Parser)]
#[command(name = "mvp-stats-collector")]
#[command(about = "Collect season stats for award candidates from the NBA stats API")]
struct Cli {
    /// TOML config file; every field is optional
    #[arg(short, long, global = true, env = "MVP_STATS_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enrich the vote table, resuming from the checkpoint
    Collect(CollectArgs),
    /// Print a summary of a finished checkpoint
    Report {
        /// Checkpoint CSV to read
        #[arg(long, default_value = "mvp_complete_stats.csv")]
        checkpoint: PathBuf,
    },
    /// Write one JSON document per checkpoint row
    Export {
        /// Checkpoint CSV to read
        #[arg(long, default_value = "mvp_complete_stats.csv")]
        checkpoint: PathBuf,

        /// Output file (JSON lines)
        #[arg(short, long, default_value = "mvp_candidates.jsonl")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct CollectArgs {
    /// Vote table with Player, Season and Points columns
    #[arg(short, long, default_value = "mvp_voting_results.csv")]
    input: PathBuf,

    /// Checkpoint CSV; created on first run and extended afterwards
    #[arg(short, long, default_value = "mvp_complete_stats.csv")]
    output: PathBuf,

    /// Results per checkpoint flush
    #[arg(long)]
    batch_size: Option<usize>,

    /// Minimum delay after each collected entry in milliseconds
    #[arg(long)]
    min_delay: Option<u64>,

    /// Maximum delay after each collected entry in milliseconds
    #[arg(long)]
    max_delay: Option<u64>,

    /// Stats API base URL
    #[arg(long, env = "MVP_STATS_BASE_URL")]
    base_url: Option<String>,
}

impl CollectArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(batch_size) = self.batch_size {
            config.collection.batch_size = batch_size;
        }
        if let Some(min) = self.min_delay {
            config.collection.min_delay_ms = min;
        }
        if let Some(max) = self.max_delay {
            config.collection.max_delay_ms = max;
        }
        if let Some(url) = &self.base_url {
            config.source.base_url = url.clone();
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "mvp_stats_collector=debug"
    } else {
        "mvp_stats_collector=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_target(false)
        .init();
}

async fn collect(mut config: Config, args: &CollectArgs) -> Result<()> {
    args.apply(&mut config);
    config::validate(&config)?;

    info!(input = %args.input.display(), output = %args.output.display(), "running stat collector");
    info!(
        batch_size = config.collection.batch_size,
        min_delay_ms = config.collection.min_delay_ms,
        max_delay_ms = config.collection.max_delay_ms,
        "rate limit"
    );

    let roster = roster::load(&args.input)
        .with_context(|| format!("loading roster {}", args.input.display()))?;
    info!(entries = roster.len(), "roster loaded");

    let mut store = CheckpointStore::open(&args.output)
        .with_context(|| format!("loading checkpoint {}", args.output.display()))?;
    if !store.is_empty() {
        info!(completed = store.len(), "found existing checkpoint");
    }

    let client = NbaStatsClient::new(&config.source).context("building HTTP client")?;
    let mut collector = Collector::from_config(Arc::new(client), &config)?;

    let summary = match collector.run(&roster, &mut store).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "checkpoint write failed, stopping");
            return Err(e).context("saving checkpoint");
        }
    };

    info!(
        total = summary.total,
        collected = summary.collected,
        skipped = summary.skipped,
        failed = summary.failed.len(),
        flushes = summary.flushes,
        "collection finished"
    );
    for (key, reason) in &summary.failed {
        warn!(%key, %reason, "not collected");
    }

    match store.season_coverage() {
        Some((seasons, first, last)) => info!(
            rows = store.len(),
            seasons,
            first = %first,
            last = %last,
            path = %store.path().display(),
            "final dataset"
        ),
        None => info!(path = %store.path().display(), "final dataset is empty"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Collect(args) => collect(config, args).await?,
        Command::Report { checkpoint: path } => {
            let results = checkpoint::read_results(path)
                .with_context(|| format!("reading {}", path.display()))?;
            print!("{}", report::build(&results));
        }
        Command::Export { checkpoint: path, out } => {
            let results = checkpoint::read_results(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let written = export::export_to_file(&results, out)
                .with_context(|| format!("writing {}", out.display()))?;
            info!(documents = written, out = %out.display(), "export complete");
        }
    }

    Ok(())
}
