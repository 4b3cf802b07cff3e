//! ouilookup CLI
//!
//! Runs the lookup service and the operator tasks around its registry.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ouilookup_api::{ApiConfig, ApiServer};
use ouilookup_cache::RefreshableLookupCache;
use ouilookup_core::constants::DEFAULT_UPSTREAM_URL;
use ouilookup_core::traits::{DatasetParser, DatasetSource};
use ouilookup_parser::OuiParser;
use ouilookup_source::{FileStoreSource, HttpSource, StoreWriter};

/// ouilookup - hardware vendor lookup against the IEEE registry
#[derive(Parser)]
#[command(name = "ouilookup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP lookup service
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "8080")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Look up the vendor of one address
    Lookup {
        /// Address or prefix, e.g. AB-CD-EF or ab:cd:ef:00:11:22
        address: String,
        /// Read the registry from this file instead of upstream
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Upstream registry URL
        #[arg(long, env = "OUI_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
        url: String,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refresh the durable store from upstream
    SyncStore {
        /// Store location
        #[arg(short, long, env = "OUI_STORE_PATH", default_value = "./data/oui.txt")]
        path: PathBuf,
        /// Upstream registry URL
        #[arg(long, env = "OUI_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
        url: String,
    },

    /// Parse a registry file and summarize it
    Inspect {
        /// Registry file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "ouilookup=debug,info"
    } else {
        "ouilookup=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(port, &bind).await,
        Commands::Lookup { address, file, url, json } => {
            cmd_lookup(&address, file.as_deref(), &url, json).await
        }
        Commands::SyncStore { path, url } => cmd_sync_store(&path, &url).await,
        Commands::Inspect { file } => cmd_inspect(&file).await,
    }
}

/// Run the HTTP service
async fn cmd_serve(port: u16, bind: &str) -> Result<()> {
    let config = ApiConfig::from_env();

    println!("{}", "Starting ouilookup...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!("   {} {:?}", "Source:".dimmed(), config.source);
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::new(config).context("invalid service configuration")?;

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", bind, port))?;
    server.run(addr).await?;

    Ok(())
}

/// One-shot lookup through the same cache path the service uses
async fn cmd_lookup(address: &str, file: Option<&Path>, url: &str, json: bool) -> Result<()> {
    let source: Arc<dyn DatasetSource> = match file {
        Some(path) => Arc::new(FileStoreSource::new(path)),
        None => Arc::new(HttpSource::new(url).context("invalid upstream URL")?),
    };
    if !json {
        println!("{} {}", "Loading registry from:".cyan().bold(), source.describe());
    }

    let cache = RefreshableLookupCache::new(source, Arc::new(OuiParser::new()));
    let snapshot = cache.get().await.context("failed to load registry")?;
    let record = snapshot
        .resolve(address)
        .with_context(|| format!("lookup of '{}' failed", address))?;

    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!("\n{}", record.manufacturer.green().bold());
    println!("   {} {}", "Prefix:".dimmed(), record.prefix);
    for line in &record.address {
        println!("   {} {}", "Address:".dimmed(), line);
    }
    if let Some(country) = &record.country {
        println!("   {} {}", "Country:".dimmed(), country);
    }
    if record.local {
        println!("   {}", "Locally administered".yellow());
    }
    if record.multicast {
        println!("   {}", "Multicast".yellow());
    }
    println!("   {} {}", "Registry generated:".dimmed(), snapshot.generated_at());

    Ok(())
}

/// Copy the upstream registry into the durable store
async fn cmd_sync_store(path: &Path, url: &str) -> Result<()> {
    println!("{} {}", "Syncing store from:".cyan().bold(), url);

    let upstream = Arc::new(HttpSource::new(url).context("invalid upstream URL")?);
    let writer = StoreWriter::new(upstream, path);
    let bytes = writer
        .refresh()
        .await
        .with_context(|| format!("failed to refresh {}", path.display()))?;

    println!("{} {} bytes to {}", "Wrote".green(), bytes, path.display());
    Ok(())
}

/// Parse a registry file and print its shape
async fn cmd_inspect(file: &Path) -> Result<()> {
    let raw = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let dataset = OuiParser::new()
        .parse(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    println!("{} {}", "Registry:".cyan().bold(), file.display());
    println!("   {} {}", "Generated:".dimmed(), dataset.generated_at());
    println!("   {} {}", "Entries:".dimmed(), dataset.len());
    for (bits, count) in dataset.prefix_lengths() {
        println!("   {} /{}: {}", "Prefix".dimmed(), bits, count);
    }

    Ok(())
}
