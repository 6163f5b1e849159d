mod cli;

use thumbcache::{config, context::AppContext, server};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use thumbcache_common::{ResponseStats, ThumbnailResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment fallback for `--log-file`.
const LOG_FILE_ENV: &str = "LOG_FILE";

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting thumbcache");

    let ctx = AppContext::build(config).await?;
    let server_result = server::start_server(ctx.clone()).await;

    tracing::info!("Shutting down...");
    ctx.shutdown().await;

    server_result
}

async fn fetch(urls: &[String], config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let ctx = AppContext::build(config).await?;

    let outcome = ctx.orchestrator.resolve_batch(urls).await;

    // Wait for fresh results to reach the cache before exiting.
    let stats = ctx.shutdown().await;

    let results = outcome?;
    for result in &results {
        match result {
            ThumbnailResult::Success(record) => {
                let meta = &record.metadata;
                println!(
                    "✓ {} \"{}\" by {} ({}x{}, {} bytes)",
                    meta.id,
                    meta.title,
                    meta.channel_title,
                    meta.width,
                    meta.height,
                    record.image.len()
                );
            }
            ThumbnailResult::Failure(failure) => {
                println!("✗ {}: {}", failure.key, failure.kind);
            }
        }
    }

    println!();
    println!("{}", ResponseStats::of(&results));
    if let Some(stats) = stats {
        println!(
            "Cached: {} record(s), {} failed",
            stats.persisted_records, stats.failed_records
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "thumbcache=trace,thumbcache_store=trace,thumbcache_common=debug,tower_http=debug"
                .to_string()
        } else {
            "thumbcache=info,thumbcache_store=info,tower_http=info".to_string()
        }
    });

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| std::env::var_os(LOG_FILE_ENV).map(PathBuf::from));
    let journal = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(&env_filter))
        .with(tracing_subscriber::fmt::layer())
        .with(journal)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Fetch { urls } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(fetch(&urls, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("thumbcache {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::load_config_or_default(None)?
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Cache backend: {:?}", config.cache.backend);
    println!("  Media dir: {}", config.cache.media_dir.display());
    println!(
        "  API key: {}",
        if config.remote.api_key.is_some() {
            "set"
        } else {
            "missing"
        }
    );
    println!(
        "  Write-behind: capacity {}, shutdown {}",
        config.writeback.capacity, config.writeback.shutdown
    );

    Ok(())
}
