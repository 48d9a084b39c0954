//! Dropload command-line uploader.

mod app;
mod config;
mod files;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Upload files to an HTTP endpoint, whole or in chunks.
#[derive(Debug, Parser)]
#[command(name = "dropload", version)]
struct Cli {
    /// Files to upload.
    #[arg(required_unless_present = "write_config")]
    files: Vec<PathBuf>,

    /// Configuration file (default: ~/.config/dropload/dropload.toml).
    #[arg(short, long, env = "DROPLOAD_CONFIG")]
    config: Option<PathBuf>,

    /// Target URL; `{name}` and `{id}` expand per file.
    #[arg(short, long)]
    url: Option<String>,

    /// Upload in chunks of this many bytes.
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Per-request timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    write_config: bool,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize structured logging.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting dropload");

    let mut config = match &cli.config {
        // A config file about to be written need not exist yet.
        Some(path) if cli.write_config && !path.exists() => config::Config::default(),
        path => config::Config::load(path.as_deref())?,
    };
    if let Some(url) = cli.url {
        config.upload.url = url;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.engine.chunks = true;
        config.engine.chunk_size = Some(chunk_size);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.engine.timeout_ms = Some(timeout_ms);
    }

    if cli.write_config {
        let path = match cli.config {
            Some(path) => path,
            None => config::config_path()?,
        };
        config.save(&path)?;
        println!("configuration written to {}", path.display());
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(app::run(config, cli.files))?;

    println!("{} uploaded", summary.done);
    for (name, status) in &summary.failed {
        println!("failed   {name}: {status}");
    }
    for (name, reasons) in &summary.rejected {
        println!("rejected {name}: {reasons}");
    }

    if !summary.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
