use std::path::{Path, PathBuf};

use anyhow::Context;
use attach_client::AttachmentUploader;
use clap::Args;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Attachment reference (`id:<raw>` or a bare id).
    pub reference: String,
    /// Write the payload here; defaults to the attachment's file name.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Local file name for a server-supplied filename. Directory parts are
/// dropped so the payload always lands in the working directory.
fn default_output(filename: &str) -> anyhow::Result<PathBuf> {
    Path::new(filename)
        .file_name()
        .filter(|name| !name.is_empty())
        .map(PathBuf::from)
        .with_context(|| format!("cannot derive a file name from {filename:?}; pass --output"))
}

pub async fn run(
    uploader: &AttachmentUploader,
    args: &FetchArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let entry = uploader.fetch(&args.reference).await?;
    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output(&entry.filename)?,
    };
    tokio::fs::write(&output, &entry.data)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "id": entry.id,
                "filename": entry.filename,
                "mimeType": entry.mime_type,
                "size": entry.size(),
                "path": output.display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!(
                "Saved {} ({}, {} bytes) to {}",
                entry.filename,
                entry.mime_type,
                entry.size(),
                output.display()
            );
        }
    }
    Ok(())
}
