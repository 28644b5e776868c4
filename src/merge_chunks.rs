/*
cargo run --release --bin merge_chunks -- \
    --input-dir data/computers_chunks \
    --output    data/computers_rejoined.json
*/

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use bh_split::logging::init_logging;
use bh_split::merge_dir;
use clap::Parser;
use log::info;

// Rebuild one export from a folder of chunk_<n>.json files, in index order.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Folder holding chunk_0.json, chunk_1.json, ...
    #[arg(long)]
    input_dir: PathBuf,

    /// File that will be created/overwritten
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_dir, "merge_chunks")?;

    let merged = merge_dir(&args.input_dir)
        .with_context(|| format!("Failed to merge {}", args.input_dir.display()))?;

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &merged)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        "Merged {} records of type '{}' into {}",
        merged.data.len(),
        merged.meta.kind,
        args.output.display()
    );
    println!(
        "Merged {} record(s) into {}",
        merged.data.len(),
        args.output.display()
    );
    Ok(())
}
