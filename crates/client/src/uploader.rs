use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use attach_cache::{ThumbnailEntry, ThumbnailStore};
use attach_core::{AttachmentRef, UploadFile, UploadOptions, UploadResult, resolve_upload_response};
use chrono::Utc;
use futures::FutureExt;
use futures::future::join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::UploaderConfig;
use crate::context::{ActiveConversation, ConversationContext, SessionContext};
use crate::error::Error;
use crate::meta::AttachmentMeta;
use crate::transport::{HttpTransport, Transport};

const AUTHORIZATION: &str = "Authorization";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Uploads attachments and keeps a local copy of each one in the thumbnail
/// cache.
///
/// An upload either fully succeeds, returning the canonical `id:` reference,
/// or fails with one error. The cache write happens after the server has
/// answered and its outcome never changes the result.
///
/// The uploader itself needs no particular executor. [`HttpTransport`] does:
/// reqwest must run inside a Tokio runtime.
pub struct AttachmentUploader {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ThumbnailStore>,
    session: Arc<dyn SessionContext>,
    conversation: Arc<dyn ConversationContext>,
    config: UploaderConfig,
}

impl std::fmt::Debug for AttachmentUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentUploader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for an [`AttachmentUploader`].
#[derive(Default)]
pub struct AttachmentUploaderBuilder {
    transport: Option<Arc<dyn Transport>>,
    cache: Option<Arc<dyn ThumbnailStore>>,
    session: Option<Arc<dyn SessionContext>>,
    conversation: Option<Arc<dyn ConversationContext>>,
    config: UploaderConfig,
}

impl AttachmentUploaderBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for paths, headers, timeouts and the cache write mode.
    #[must_use]
    pub fn config(mut self, config: UploaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom transport instead of an [`HttpTransport`] built from the
    /// config.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Thumbnail cache that receives uploaded payloads. Required.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn ThumbnailStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Session providing the authorization token. Required.
    #[must_use]
    pub fn session(mut self, session: Arc<dyn SessionContext>) -> Self {
        self.session = Some(session);
        self
    }

    /// Conversation providing the fallback channel.
    #[must_use]
    pub fn conversation(mut self, conversation: Arc<dyn ConversationContext>) -> Self {
        self.conversation = Some(conversation);
        self
    }

    /// Build the uploader.
    pub fn build(self) -> Result<AttachmentUploader, Error> {
        let cache = self
            .cache
            .ok_or_else(|| Error::Configuration("a thumbnail cache is required".to_owned()))?;
        let session = self
            .session
            .ok_or_else(|| Error::Configuration("a session context is required".to_owned()))?;
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(
                HttpTransport::builder(self.config.base_url.clone())
                    .timeout(self.config.timeout())
                    .build()?,
            ),
        };
        let conversation = self
            .conversation
            .unwrap_or_else(|| Arc::new(ActiveConversation::new()));

        Ok(AttachmentUploader {
            transport,
            cache,
            session,
            conversation,
            config: self.config,
        })
    }
}

impl AttachmentUploader {
    /// Create a builder.
    pub fn builder() -> AttachmentUploaderBuilder {
        AttachmentUploaderBuilder::new()
    }

    /// The active configuration.
    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    fn auth_headers(&self) -> Result<Vec<(String, String)>, Error> {
        let token = self
            .session
            .token()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Configuration("no session token available".to_owned()))?;
        Ok(vec![(AUTHORIZATION.to_owned(), token)])
    }

    fn upload_headers(&self, options: &UploadOptions) -> Result<Vec<(String, String)>, Error> {
        let mut headers = self.auth_headers()?;
        if let Some(channel) = options.effective_channel(self.conversation.active_channel()) {
            headers.push((self.config.channel_header.clone(), channel));
        }
        Ok(headers)
    }

    /// Upload a file and cache its payload under the assigned id.
    ///
    /// The channel comes from `options`, else the active conversation; with
    /// neither, no routing header is sent.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example(uploader: attach_client::AttachmentUploader) -> Result<(), attach_client::Error> {
    /// use attach_core::{UploadFile, UploadOptions};
    ///
    /// let file = UploadFile::new("photo.png", "image/png", std::fs::read("photo.png").unwrap());
    /// let result = uploader.upload(&file, &UploadOptions::channel("ch-1")).await?;
    /// println!("uploaded as {}", result.attachment_id);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, file, options), fields(filename = %file.filename, size = file.len()))]
    pub async fn upload(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
    ) -> Result<UploadResult, Error> {
        let headers = self.upload_headers(options)?;
        let response = self
            .transport
            .post_multipart(
                &self.config.upload_path,
                &self.config.file_field,
                file,
                &headers,
            )
            .await?;
        self.complete(file, response).await
    }

    /// Like [`upload`](Self::upload), but aborts the pending request when
    /// `cancel` fires. A cancelled upload never touches the cache.
    #[instrument(skip(self, file, options, cancel), fields(filename = %file.filename, size = file.len()))]
    pub async fn upload_with_cancel(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, Error> {
        let headers = self.upload_headers(options)?;
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("upload cancelled before the server answered");
                return Err(Error::Cancelled);
            }
            response = self.transport.post_multipart(
                &self.config.upload_path,
                &self.config.file_field,
                file,
                &headers,
            ) => response?,
        };
        self.complete(file, response).await
    }

    /// Upload several files concurrently.
    ///
    /// Each upload is independent: results are returned in input order and
    /// one failure does not affect the others.
    pub async fn upload_many(
        &self,
        files: &[UploadFile],
        options: &UploadOptions,
    ) -> Vec<Result<UploadResult, Error>> {
        join_all(files.iter().map(|file| self.upload(file, options))).await
    }

    async fn complete(&self, file: &UploadFile, response: Value) -> Result<UploadResult, Error> {
        let resolved = resolve_upload_response(&response).map_err(|e| {
            warn!(error = %e, "upload response carried no usable attachment id");
            Error::from(e)
        })?;

        self.cache_best_effort(ThumbnailEntry::from_upload(resolved.cache_key(), file))
            .await;

        debug!(attachment_id = %resolved.reference, "upload complete");
        Ok(UploadResult {
            attachment_id: resolved.reference,
            response,
        })
    }

    /// Write `entry` to the cache. Failures, including a panicking backend,
    /// are logged and dropped.
    async fn cache_best_effort(&self, entry: ThumbnailEntry) {
        let id = entry.id.clone();
        let write = self.cache.write(entry, self.config.cache_write);

        match AssertUnwindSafe(write).catch_unwind().await {
            Ok(Ok(true)) => debug!(id = %id, "cached attachment payload"),
            Ok(Ok(false)) => debug!(id = %id, "attachment already cached, kept existing entry"),
            Ok(Err(e)) => warn!(id = %id, error = %e, "failed to cache attachment payload"),
            Err(panic) => warn!(
                id = %id,
                panic = panic_message(panic.as_ref()),
                "attachment cache write panicked"
            ),
        }
    }

    /// Look up a cached attachment by canonical or raw reference.
    ///
    /// A hit refreshes the entry's `recent_used` timestamp.
    pub async fn cached(&self, reference: &str) -> Result<Option<ThumbnailEntry>, Error> {
        let reference = AttachmentRef::parse(reference)?;
        let Some(entry) = self.cache.get(reference.raw()).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if let Err(e) = self.cache.touch(reference.raw(), now).await {
            warn!(id = reference.raw(), error = %e, "failed to refresh cached attachment");
            return Ok(Some(entry));
        }
        Ok(Some(entry.with_recent_used(now)))
    }

    /// Fetch server-side metadata for an attachment.
    pub async fn meta(&self, reference: &str) -> Result<AttachmentMeta, Error> {
        let reference = AttachmentRef::parse(reference)?;
        let headers = self.auth_headers()?;
        self.fetch_meta(&reference, &headers).await
    }

    async fn fetch_meta(
        &self,
        reference: &AttachmentRef,
        headers: &[(String, String)],
    ) -> Result<AttachmentMeta, Error> {
        let body = self
            .transport
            .get_json(&self.config.meta_url_path(reference.raw()), headers)
            .await?;
        AttachmentMeta::from_response(body)
    }

    /// Return an attachment's payload, from the cache when possible.
    ///
    /// On a miss the metadata and bytes are downloaded concurrently and the
    /// result is cached best-effort. A failing cache degrades to a download.
    #[instrument(skip(self))]
    pub async fn fetch(&self, reference: &str) -> Result<ThumbnailEntry, Error> {
        match self.cached(reference).await {
            Ok(Some(entry)) => return Ok(entry),
            Ok(None) => {}
            Err(Error::Cache(e)) => warn!(error = %e, "thumbnail cache unavailable, downloading"),
            Err(e) => return Err(e),
        }

        let reference = AttachmentRef::parse(reference)?;
        let headers = self.auth_headers()?;
        let data_path = self.config.attachment_url_path(reference.raw());
        let (meta, blob) = tokio::try_join!(
            self.fetch_meta(&reference, &headers),
            self.transport.get_bytes(&data_path, &headers),
        )?;

        let mime_type = blob.content_type.unwrap_or_else(|| FALLBACK_MIME.to_owned());
        let entry = ThumbnailEntry::new(reference.raw(), meta.filename, mime_type, blob.data);
        self.cache_best_effort(entry.clone()).await;
        Ok(entry)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
