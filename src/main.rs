use anyhow::Context;
use clap::Parser;
use ferrumkv::{config::DEFAULT_LISTEN_ADDR, server, AofConfig, Config, SyncPolicy};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// FerrumKV server
#[derive(Parser, Debug)]
#[command(name = "ferrumkv")]
#[command(about = "In-memory key-value store speaking RESP, with an append-only file")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = DEFAULT_LISTEN_ADDR)]
    listen: String,

    /// Path of the append-only file
    #[arg(long, default_value = "database.aof")]
    aof_path: PathBuf,

    /// When to fsync the append-only file: always, everysec or no
    #[arg(long, default_value_t = SyncPolicy::EverySecond)]
    appendfsync: SyncPolicy,

    /// Run purely in memory, without the append-only file
    #[arg(long)]
    no_aof: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            listen_addr: self.listen,
            aof: AofConfig {
                path: self.aof_path,
                sync_policy: self.appendfsync,
                enabled: !self.no_aof,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("FerrumKV v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = args.into_config();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    server::run(&config, shutdown)
        .await
        .with_context(|| format!("server on {} failed", config.listen_addr))?;

    info!("FerrumKV stopped");
    Ok(())
}
