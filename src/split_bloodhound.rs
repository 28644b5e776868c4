/*
cargo run --release --bin split_bloodhound -- \
    --filename data/20240101_computers.json \
    --output   data/computers_chunks \
    --chunks   50

size based, ~256 MiB per file
cargo run --release --bin split_bloodhound -- \
    --filename data/20240101_computers.json \
    --output   data/computers_chunks \
    --policy size --max-bytes 268435456
*/

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bh_split::config::default_workers;
use bh_split::logging::init_logging;
use bh_split::{run_split, Policy, SplitConfig, DEFAULT_CHUNK_COUNT, DEFAULT_MAX_CHUNK_BYTES};
use clap::{CommandFactory, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Even split by record count (--chunks)
    Count,
    /// Greedy split by serialized size (--max-bytes)
    Size,
}

// Split a collector JSON export into chunk_<n>.json files
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Output folder for chunked JSON files (created if missing)
    #[arg(long)]
    output: PathBuf,

    /// Name of the collector JSON file. Every meta key it carries (e.g.
    /// `methods`) is copied into each chunk, only `count` is rewritten
    #[arg(long)]
    filename: PathBuf,

    /// Number of chunks to split the file into
    #[arg(long, default_value_t = DEFAULT_CHUNK_COUNT as u64,
          value_parser = clap::value_parser!(u64).range(1..))]
    chunks: u64,

    #[arg(long, value_enum, default_value_t = PolicyArg::Count)]
    policy: PolicyArg,

    /// Byte ceiling per chunk for --policy size
    #[arg(long = "max-bytes", default_value_t = DEFAULT_MAX_CHUNK_BYTES)]
    max_bytes: u64,

    /// Fold the short trailing chunk into the previous one so at most
    /// --chunks files are written
    #[arg(long)]
    absorb_remainder: bool,

    /// Parallel writers (defaults to available cores)
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

impl Cli {
    fn into_config(self) -> SplitConfig {
        let policy = match self.policy {
            PolicyArg::Count => Policy::Count {
                chunks: self.chunks as usize,
                absorb_remainder: self.absorb_remainder,
            },
            PolicyArg::Size => Policy::Size {
                max_bytes: self.max_bytes,
            },
        };
        SplitConfig::new(self.filename, self.output)
            .policy(policy)
            .workers(self.workers.unwrap_or_else(default_workers))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging(&cli.log_dir, "split_bloodhound")?;
    let config = cli.into_config();

    info!("Starting split of {}", config.input.display());
    info!("Policy: {:?}, workers: {}", config.policy, config.workers);

    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks",
    )?);

    let report = run_split(&config, &bar)
        .await
        .with_context(|| format!("Failed to split {}", config.input.display()))?;

    println!(
        "Wrote {} chunk file(s), {} records → {} (log: {})",
        report.written().count(),
        report.records_written(),
        config.output_dir.display(),
        log_path.display()
    );

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{failed} of {} chunk files could not be written", report.outcomes.len());
    }
    Ok(())
}
