//! Concurrent job runner over one shared client.

use {
    courier_common::naming::artifact_path,
    courier_config::{CourierConfig, LogsConfig, RelayConfig},
    courier_media::MediaEditor,
    std::{
        path::{Path, PathBuf},
        sync::Arc,
    },
    tokio::{
        sync::{Semaphore, broadcast},
        task::JoinHandle,
    },
    tracing::{debug, info},
};

use crate::{
    client::SharedClient,
    error::{Error, ErrorKind, Result},
    job::RelayJob,
    log::{JobLog, LogLine},
    outcome::PipelineOutcome,
    pipeline::RelayPipeline,
};

/// Runs relay jobs, at most `max_concurrent_jobs` at a time.
///
/// Every run gets its own scratch directory
/// (`<scratch_root>/job-<id>-<unix_millis>-<uuid8>`), removed again once the
/// janitor has emptied it, and a [`JobLog`]. Only the remote client is
/// shared, so two runs of the same job id never touch each other's files.
pub struct RelayService {
    client: Arc<SharedClient>,
    editor: MediaEditor,
    relay: RelayConfig,
    logs: LogsConfig,
    scratch_root: PathBuf,
    log_root: PathBuf,
    permits: Arc<Semaphore>,
}

/// A spawned job: its live log and eventual outcome.
pub struct JobHandle {
    pub job_id: String,
    pub scratch_dir: PathBuf,
    pub logs: broadcast::Receiver<LogLine>,
    task: JoinHandle<PipelineOutcome>,
}

impl JobHandle {
    pub async fn outcome(self) -> Result<PipelineOutcome> {
        self.task
            .await
            .map_err(|e| Error::external(format!("relay job {}", self.job_id), e))
    }
}

impl RelayService {
    pub fn new(client: Arc<SharedClient>, editor: MediaEditor, config: &CourierConfig) -> Self {
        Self {
            client,
            editor,
            scratch_root: config.relay.scratch_root(),
            log_root: config.relay.log_root(),
            relay: config.relay.clone(),
            logs: config.logs.clone(),
            permits: Arc::new(Semaphore::new(config.relay.max_concurrent_jobs.max(1))),
        }
    }

    /// A fresh scratch directory path for one run of `job_id`.
    #[must_use]
    pub fn scratch_dir_for(&self, job_id: &str) -> PathBuf {
        artifact_path(&self.scratch_root, &format!("job-{job_id}"), "")
    }

    /// Run `job` and wait for its outcome.
    pub async fn run(&self, job: RelayJob) -> PipelineOutcome {
        let log = self.open_log(&job);
        let scratch_dir = self.scratch_dir_for(job.id());
        self.execute(job, log, scratch_dir).await
    }

    /// Run `job` on its own task. Log lines can be followed through the
    /// returned handle from the first line on.
    pub fn spawn(self: &Arc<Self>, job: RelayJob) -> JobHandle {
        let log = self.open_log(&job);
        let logs = log.subscribe();
        let job_id = job.id().to_string();
        let scratch_dir = self.scratch_dir_for(&job_id);
        let service = Arc::clone(self);
        let dir = scratch_dir.clone();
        let task = tokio::spawn(async move { service.execute(job, log, dir).await });
        JobHandle {
            job_id,
            scratch_dir,
            logs,
            task,
        }
    }

    /// Run every job concurrently; outcomes come back in input order.
    pub async fn run_all(self: &Arc<Self>, jobs: Vec<RelayJob>) -> Vec<Result<PipelineOutcome>> {
        let handles: Vec<JobHandle> = jobs.into_iter().map(|job| self.spawn(job)).collect();
        futures::future::join_all(handles.into_iter().map(JobHandle::outcome)).await
    }

    fn open_log(&self, job: &RelayJob) -> JobLog {
        JobLog::new(job.id(), &self.log_root, &self.logs)
    }

    async fn execute(&self, job: RelayJob, log: JobLog, scratch_dir: PathBuf) -> PipelineOutcome {
        let Ok(_permit) = self.permits.acquire().await else {
            return failure(&log, ErrorKind::InvalidInput, "job queue closed");
        };

        let bridge = match self.client.bridge().await {
            Ok(bridge) => bridge,
            Err(e) => {
                return failure(
                    &log,
                    ErrorKind::DestinationResolutionFailed,
                    format!("remote client unavailable: {e}"),
                );
            },
        };

        info!(job_id = job.id(), destination = %job.destination(), "relay job started");
        let pipeline = RelayPipeline::from_config(bridge, self.editor.clone(), &self.relay);
        let outcome = pipeline.run(&job, &scratch_dir, &log).await;
        remove_scratch_dir(&scratch_dir).await;
        info!(
            job_id = job.id(),
            success = outcome.is_success(),
            kind = ?outcome.error_kind(),
            "relay job finished"
        );
        outcome
    }
}

/// Remove an emptied per-run scratch directory. Anything the janitor left
/// behind (subdirectories) keeps it in place.
async fn remove_scratch_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir(dir).await {
        debug!(dir = %dir.display(), error = %e, "scratch dir kept");
    }
}

fn failure(log: &JobLog, kind: ErrorKind, message: impl Into<String>) -> PipelineOutcome {
    let message = message.into();
    log.error(format!("{kind}: {message}"));
    log.flush();
    PipelineOutcome::Failure {
        kind,
        message,
        log_tail: log.tail(),
        log_file: log.file_path().to_path_buf(),
    }
}
