//! The relay state machine.
//!
//! ```text
//! ResolveDestination -> FetchSourceMessage -> ExtractMedia -> DownloadMedia
//!     -> ApplyEdits -> SendContent -> Cleanup
//! ```
//!
//! Resolve, fetch and send failures end the job. A message without media
//! or a download that never completes falls back to a text-only send; a
//! failed edit falls back to the unedited file. Cleanup runs on every path.

use {
    courier_common::naming::artifact_path,
    courier_config::RelayConfig,
    courier_media::{EditPlan, MediaEditor, MediaKind, WatermarkInput, image_ops},
    std::{
        path::{Path, PathBuf},
        time::Duration,
    },
    tracing::debug,
};

use crate::{
    bridge::AsyncBridge,
    destination::resolve_destination,
    error::{Error, ErrorKind, Result},
    fetcher::FileFetcher,
    janitor,
    job::{RelayJob, SourceRef},
    log::JobLog,
    outcome::{Fallback, PipelineOutcome, RelayReport},
    remote::{ChatId, InputMessageContent, Request},
    resolver::resolve_media,
};

const TRANSCRIPT_TAIL_LINES: usize = 20;
const FILE_URI_PREFIX: &str = "file://";

/// Per-step time bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTimeouts {
    pub resolve: Duration,
    pub fetch_message: Duration,
    pub download: Duration,
    pub send: Duration,
}

impl StepTimeouts {
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            resolve: config.resolve_timeout(),
            fetch_message: config.fetch_message_timeout(),
            download: config.download_timeout(),
            send: config.send_timeout(),
        }
    }
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// A step failure that ends the job.
#[derive(Debug)]
struct StepFailure {
    kind: ErrorKind,
    message: String,
}

impl StepFailure {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Content chosen for the send step.
struct Payload {
    content: InputMessageContent,
    media: Option<MediaKind>,
    edited: bool,
}

/// Runs one [`RelayJob`] at a time, strictly sequentially.
#[derive(Clone)]
pub struct RelayPipeline {
    bridge: AsyncBridge,
    fetcher: FileFetcher,
    editor: MediaEditor,
    timeouts: StepTimeouts,
}

impl RelayPipeline {
    pub fn new(
        bridge: AsyncBridge,
        fetcher: FileFetcher,
        editor: MediaEditor,
        timeouts: StepTimeouts,
    ) -> Self {
        Self {
            bridge,
            fetcher,
            editor,
            timeouts,
        }
    }

    pub fn from_config(bridge: AsyncBridge, editor: MediaEditor, config: &RelayConfig) -> Self {
        let fetcher = FileFetcher::from_config(bridge.clone(), config);
        Self::new(bridge, fetcher, editor, StepTimeouts::from_config(config))
    }

    /// Run `job` to completion. Files under `scratch_dir` are removed before
    /// this returns, whatever the outcome.
    pub async fn run(&self, job: &RelayJob, scratch_dir: &Path, log: &JobLog) -> PipelineOutcome {
        if let Err(e) = tokio::fs::create_dir_all(scratch_dir).await {
            log.warn(format!(
                "scratch dir {} unavailable: {e}",
                scratch_dir.display()
            ));
        }
        let result = self.execute(job, scratch_dir, log).await;
        if let Err(failure) = &result {
            log.error(format!("{}: {}", failure.kind, failure.message));
        }

        let removed = janitor::cleanup(scratch_dir).await;
        log.info(format!("cleanup removed {removed} scratch file(s)"));

        if let Ok(report) = &result {
            log.info(format!(
                "relayed to {} ({} fallback(s))",
                report.chat_id,
                report.fallbacks.len()
            ));
        }
        log.flush();

        match result {
            Ok(report) => PipelineOutcome::Success(report),
            Err(failure) => PipelineOutcome::Failure {
                kind: failure.kind,
                message: failure.message,
                log_tail: log.tail(),
                log_file: log.file_path().to_path_buf(),
            },
        }
    }

    async fn execute(
        &self,
        job: &RelayJob,
        scratch_dir: &Path,
        log: &JobLog,
    ) -> std::result::Result<RelayReport, StepFailure> {
        let source = match (job.send_with_media(), job.source()) {
            (true, None) => {
                return Err(StepFailure::new(
                    ErrorKind::InvalidInput,
                    "source chat and message ids are required to relay media",
                ));
            },
            (true, source) => source,
            (false, _) => None,
        };

        log.info(format!("resolving destination {}", job.destination()));
        let chat_id = resolve_destination(&self.bridge, job.destination(), self.timeouts.resolve)
            .await
            .map_err(|e| StepFailure::new(ErrorKind::DestinationResolutionFailed, e.to_string()))?;
        log.info(format!("destination resolved to {chat_id}"));

        let mut fallbacks = Vec::new();
        let payload = match source {
            Some(source) => {
                self.media_payload(job, source, scratch_dir, log, &mut fallbacks)
                    .await?
            },
            None => {
                log.info("media not requested, sending text only");
                text_payload(job)
            },
        };

        self.send(chat_id, payload.content, log).await?;
        Ok(RelayReport {
            job_id: job.id().to_string(),
            chat_id,
            media: payload.media,
            edited: payload.edited,
            fallbacks,
        })
    }

    async fn media_payload(
        &self,
        job: &RelayJob,
        source: SourceRef,
        scratch_dir: &Path,
        log: &JobLog,
        fallbacks: &mut Vec<Fallback>,
    ) -> std::result::Result<Payload, StepFailure> {
        log.info(format!(
            "fetching message {} from chat {}",
            source.message_id, source.chat_id
        ));
        let message = self
            .bridge
            .get_message(source.chat_id, source.message_id, self.timeouts.fetch_message)
            .await
            .map_err(|e| StepFailure::new(ErrorKind::SourceFetchFailed, e.to_string()))?;

        let Some(descriptor) = resolve_media(&message.content) else {
            log.warn("source message has no media, sending text only");
            fallbacks.push(Fallback::NoMediaInSource);
            return Ok(text_payload(job));
        };
        log.info(format!(
            "downloading {} file {}",
            descriptor.kind, descriptor.file_id
        ));

        let original = match self
            .fetcher
            .fetch(descriptor.file_id, self.timeouts.download)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                log.warn(format!("{}: {e}, sending text only", ErrorKind::DownloadTimeout));
                fallbacks.push(Fallback::DownloadTimedOut);
                return Ok(text_payload(job));
            },
        };

        let (path, edited) = if job.has_edits() {
            self.apply_edits(job, descriptor.kind, original, scratch_dir, log, fallbacks)
                .await
        } else {
            (original, false)
        };

        Ok(Payload {
            content: media_content(descriptor.kind, path, job.caption()),
            media: Some(descriptor.kind),
            edited,
        })
    }

    /// Edit `original`, or hand it back unchanged when editing is skipped or
    /// fails. Never fails the job.
    async fn apply_edits(
        &self,
        job: &RelayJob,
        kind: MediaKind,
        original: PathBuf,
        scratch_dir: &Path,
        log: &JobLog,
        fallbacks: &mut Vec<Fallback>,
    ) -> (PathBuf, bool) {
        if !kind.is_editable() {
            log.warn(format!("{kind} cannot be edited, sending it unchanged"));
            fallbacks.push(Fallback::EditsSkipped);
            return (original, false);
        }

        let watermark = match job.watermark_uri() {
            Some(uri) => match stage_watermark(uri, scratch_dir).await {
                Ok(path) => Some(WatermarkInput {
                    path,
                    anchor: job.anchor(),
                }),
                Err(e) => {
                    log.warn(format!("watermark dropped: {e}"));
                    fallbacks.push(Fallback::WatermarkDropped);
                    None
                },
            },
            None => None,
        };
        let plan = EditPlan {
            rects: job.rects().to_vec(),
            watermark,
        };
        if plan.is_empty() {
            return (original, false);
        }

        log.info(format!(
            "applying {} blur region(s){}",
            plan.rects.len(),
            if plan.watermark.is_some() {
                " and watermark"
            } else {
                ""
            }
        ));
        match self.editor.apply(&original, kind, &plan, scratch_dir).await {
            Ok(edited) => {
                log.transcript("ffmpeg", &edited.transcript, TRANSCRIPT_TAIL_LINES);
                log.info(format!("edited {kind} written to {}", edited.path.display()));
                (edited.path, true)
            },
            Err(e) => {
                if let Some(transcript) = e.transcript() {
                    log.transcript("ffmpeg", transcript, TRANSCRIPT_TAIL_LINES);
                }
                log.warn(format!(
                    "{}: {e}, sending original",
                    ErrorKind::TransformFailed
                ));
                fallbacks.push(Fallback::OriginalAfterTransformFailure);
                (original, false)
            },
        }
    }

    async fn send(
        &self,
        chat_id: ChatId,
        content: InputMessageContent,
        log: &JobLog,
    ) -> std::result::Result<(), StepFailure> {
        let kind = content.kind_name();
        log.info(format!("sending {kind} to {chat_id}"));
        let response = self
            .bridge
            .call(Request::SendMessage { chat_id, content }, self.timeouts.send)
            .await
            .map_err(|e| StepFailure::new(ErrorKind::SendFailed, e.to_string()))?;
        debug!(chat_id, response = response.name(), "send acknowledged");
        log.info(format!("{kind} sent"));
        Ok(())
    }
}

/// Text-only payload. An empty caption is still sent; the backend decides
/// whether it is acceptable.
fn text_payload(job: &RelayJob) -> Payload {
    Payload {
        content: InputMessageContent::Text {
            text: job.caption().to_string(),
        },
        media: None,
        edited: false,
    }
}

fn media_content(kind: MediaKind, path: PathBuf, caption: &str) -> InputMessageContent {
    let caption = caption.to_string();
    match kind {
        MediaKind::Photo => InputMessageContent::Photo { path, caption },
        MediaKind::Video => InputMessageContent::Video { path, caption },
        MediaKind::Animation => InputMessageContent::Animation { path, caption },
        MediaKind::Document => InputMessageContent::Document { path, caption },
    }
}

/// Copy the watermark into the scratch dir under a unique name and check it
/// is a readable image.
pub async fn stage_watermark(uri: &str, scratch_dir: &Path) -> Result<PathBuf> {
    let source = PathBuf::from(uri.strip_prefix(FILE_URI_PREFIX).unwrap_or(uri));
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_ascii_lowercase();
    tokio::fs::create_dir_all(scratch_dir).await?;
    let staged = artifact_path(scratch_dir, "watermark", &ext);
    tokio::fs::copy(&source, &staged)
        .await
        .map_err(|e| Error::external(format!("copying {}", source.display()), e))?;

    let check = staged.clone();
    tokio::task::spawn_blocking(move || image_ops::image_dimensions(&check))
        .await
        .map_err(|e| Error::external("watermark probe task", e))??;
    Ok(staged)
}
