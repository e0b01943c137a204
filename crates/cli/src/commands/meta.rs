use attach_client::AttachmentUploader;
use clap::Args;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct MetaArgs {
    /// Attachment reference (`id:<raw>` or a bare id).
    pub reference: String,
}

pub async fn run(
    uploader: &AttachmentUploader,
    args: &MetaArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let meta = uploader.meta(&args.reference).await?;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        OutputFormat::Text => {
            println!("ID:       {}", meta.id);
            println!("Filename: {}", meta.filename);
            println!("Size:     {} bytes", meta.size);
            if let Some(hash) = &meta.hash {
                println!("Hash:     {hash}");
            }
        }
    }
    Ok(())
}
