use attach_cache::ThumbnailStore;
use attach_client::AttachmentUploader;
use attach_core::AttachmentRef;
use clap::{Args, Subcommand};

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show a cached entry, refreshing its last-used time.
    Show {
        /// Attachment reference (`id:<raw>` or a bare id).
        reference: String,
    },
    /// Remove a cached entry.
    Remove {
        /// Attachment reference (`id:<raw>` or a bare id).
        reference: String,
    },
    /// Count cached entries.
    Count,
}

pub async fn run(
    uploader: &AttachmentUploader,
    store: &dyn ThumbnailStore,
    args: &CacheArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    match &args.command {
        CacheCommand::Show { reference } => {
            let Some(entry) = uploader.cached(reference).await? else {
                anyhow::bail!("{reference} is not cached");
            };
            match format {
                OutputFormat::Json => {
                    let out = serde_json::json!({
                        "id": entry.id,
                        "filename": entry.filename,
                        "mimeType": entry.mime_type,
                        "size": entry.size(),
                        "recentUsed": entry.recent_used,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                OutputFormat::Text => {
                    println!("ID:          {}", entry.id);
                    println!("Filename:    {}", entry.filename);
                    println!("MIME type:   {}", entry.mime_type);
                    println!("Size:        {} bytes", entry.size());
                    println!(
                        "Recent used: {}",
                        entry.recent_used.format("%Y-%m-%d %H:%M:%S%.3f UTC")
                    );
                }
            }
        }
        CacheCommand::Remove { reference } => {
            let reference = AttachmentRef::parse(reference)?;
            let removed = store.remove(reference.raw()).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "removed": removed }));
                }
                OutputFormat::Text if removed => println!("Removed {reference} from the cache."),
                OutputFormat::Text => println!("{reference} was not cached."),
            }
        }
        CacheCommand::Count => {
            let count = store.len().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "count": count })),
                OutputFormat::Text => println!("Cached entries: {count}"),
            }
        }
    }
    Ok(())
}
