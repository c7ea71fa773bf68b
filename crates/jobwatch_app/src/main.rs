mod app;
mod commands;
mod config;
mod effects;
mod render;

use std::path::PathBuf;

use clap::Parser;
use jobwatch_logging::{watch_info, watch_warn};

use crate::config::{load_config, save_config, WatchConfig, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[command(
    name = "jobwatch",
    version,
    about = "Watch analysis jobs on a server and get notified when they finish"
)]
struct Args {
    /// RON config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Server base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Poll interval in milliseconds, 0 for manual refresh only
    #[arg(short = 'i', long)]
    interval_ms: Option<u64>,

    /// Jobs per page
    #[arg(short = 'n', long)]
    page_size: Option<u32>,

    /// Bearer token sent with every request
    #[arg(long, env = "JOBWATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Write the effective config to --config and exit
    #[arg(long)]
    write_config: bool,
}

impl Args {
    fn apply(&self, config: &mut WatchConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            config.poll_interval_ms = interval_ms;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size.max(1);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging is configured by the file, so load problems are reported once
    // the logger is up.
    let (mut config, load_problem) = match load_config(&args.config) {
        Ok(config) => (config, None),
        Err(err) => (WatchConfig::default(), Some(err)),
    };
    args.apply(&mut config);

    if args.write_config {
        if let Some(err) = load_problem {
            return Err(err.context("not writing a config over a file that does not load"));
        }
        save_config(&args.config, &config)?;
        println!("Wrote {}", args.config.display());
        return Ok(());
    }

    jobwatch_logging::initialize(&config.log_destination(), config.log_level());
    if let Some(err) = load_problem {
        watch_warn!("{:#}; using defaults", err);
    }
    watch_info!("jobwatch {} starting", env!("CARGO_PKG_VERSION"));

    app::run(config, args.token).await
}
