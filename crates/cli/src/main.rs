//! Attach CLI
//!
//! Upload files to the attachment server and inspect the local thumbnail
//! cache.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use attach_cache::ThumbnailStore;
use attach_cache_fs::FsThumbnailStore;
use attach_cache_memory::MemoryThumbnailStore;
use attach_client::{AttachmentUploader, StaticSession, UploaderConfig};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

/// Attach CLI: upload attachments and manage the thumbnail cache.
#[derive(Parser, Debug)]
#[command(name = "attach", version, about)]
struct Cli {
    /// Attachment server base URL. Overrides the config file.
    #[arg(long, env = "ATTACH_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Session token sent in the `Authorization` header.
    #[arg(long, env = "ATTACH_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Path to a TOML uploader config.
    #[arg(long, env = "ATTACH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory for the on-disk thumbnail cache. Overrides the config file.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload one or more files.
    Upload(commands::upload::UploadArgs),
    /// Download an attachment, using the cache when possible.
    Fetch(commands::fetch::FetchArgs),
    /// Show server-side metadata for an attachment.
    Meta(commands::meta::MetaArgs),
    /// Inspect the local thumbnail cache.
    Cache(commands::cache::CacheArgs),
}

async fn load_config(cli: &Cli) -> anyhow::Result<UploaderConfig> {
    let mut config = match &cli.config {
        Some(path) => UploaderConfig::load(path).await?,
        None => UploaderConfig::default(),
    };
    if let Some(endpoint) = &cli.endpoint {
        config.base_url.clone_from(endpoint);
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    Ok(config.normalized())
}

fn open_cache(config: &UploaderConfig) -> Arc<dyn ThumbnailStore> {
    match &config.cache_dir {
        Some(dir) => {
            debug!(dir = %dir.display(), "using on-disk thumbnail cache");
            Arc::new(FsThumbnailStore::new(dir))
        }
        None => Arc::new(MemoryThumbnailStore::new()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli).await?;
    let persistent = config.cache_dir.is_some();
    let cache = open_cache(&config);
    let session = match &cli.token {
        Some(token) => StaticSession::new(token),
        None => StaticSession::anonymous(),
    };
    let uploader = AttachmentUploader::builder()
        .config(config)
        .cache(Arc::clone(&cache))
        .session(Arc::new(session))
        .build()?;

    match cli.command {
        Command::Upload(args) => commands::upload::run(&uploader, &args, &cli.format).await,
        Command::Fetch(args) => commands::fetch::run(&uploader, &args, &cli.format).await,
        Command::Meta(args) => commands::meta::run(&uploader, &args, &cli.format).await,
        Command::Cache(args) => {
            if !persistent {
                anyhow::bail!("no cache directory configured; pass --cache-dir or set cache_dir");
            }
            commands::cache::run(&uploader, cache.as_ref(), &args, &cli.format).await
        }
    }
}
