use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};

/// Terminal gets warnings and errors, `<log_dir>/<tool>_<timestamp>.log`
/// gets everything from info up. Returns the log file path.
pub fn init_logging(log_dir: &Path, tool: &'static str) -> Result<PathBuf> {
    create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log dir {}", log_dir.display()))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("{tool}_{ts}.log"));
    let file = File::create(&log_path)
        .with_context(|| format!("Failed to create {}", log_path.display()))?;

    let config = ConfigBuilder::new()
        .add_filter_allow_str("bh_split")
        .add_filter_allow_str(tool)
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Warn,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, config, file),
    ])?;

    Ok(log_path)
}
