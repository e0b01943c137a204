use std::path::{Path, PathBuf};

use anyhow::Context;
use attach_client::AttachmentUploader;
use attach_core::{UploadFile, UploadOptions};
use clap::Args;

use crate::OutputFormat;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Files to upload.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Destination channel.
    #[arg(long)]
    pub channel: Option<String>,
    /// MIME type override; guessed from the extension otherwise.
    #[arg(long)]
    pub mime: Option<String>,
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map_or_else(|| FALLBACK_MIME.to_owned(), |m| m.essence_str().to_owned())
}

async fn read_file(path: &Path, mime: Option<&str>) -> anyhow::Result<UploadFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let mime_type = mime.map_or_else(|| guess_mime(path), str::to_owned);
    Ok(UploadFile::new(filename, mime_type, data))
}

pub async fn run(
    uploader: &AttachmentUploader,
    args: &UploadArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        files.push(read_file(path, args.mime.as_deref()).await?);
    }
    let options = UploadOptions {
        channel_id: args.channel.clone(),
    };

    let results = uploader.upload_many(&files, &options).await;
    let mut failed = 0usize;

    match format {
        OutputFormat::Json => {
            let items: Vec<_> = files
                .iter()
                .zip(&results)
                .map(|(file, result)| match result {
                    Ok(r) => serde_json::json!({
                        "filename": file.filename,
                        "attachmentId": r.attachment_id,
                    }),
                    Err(e) => {
                        failed += 1;
                        serde_json::json!({
                            "filename": file.filename,
                            "error": e.to_string(),
                        })
                    }
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        OutputFormat::Text => {
            for (file, result) in files.iter().zip(&results) {
                match result {
                    Ok(r) => println!("{}\t{}", r.attachment_id, file.filename),
                    Err(e) => {
                        failed += 1;
                        eprintln!("{}: {e}", file.filename);
                    }
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} uploads failed", files.len());
    }
    Ok(())
}
