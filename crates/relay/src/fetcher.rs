//! Poll-until-ready download of a remote file.

use {
    courier_config::RelayConfig,
    std::{path::PathBuf, time::Duration},
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::{
    bridge::AsyncBridge,
    remote::{FileId, RemoteFile},
};

/// The download never completed within the deadline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("file {file_id} not ready after {}ms ({polls} status queries)", .after.as_millis())]
pub struct FetchTimeout {
    pub file_id: FileId,
    pub after: Duration,
    pub polls: u32,
}

/// Starts a download and polls the file's status until a local copy exists.
#[derive(Clone)]
pub struct FileFetcher {
    bridge: AsyncBridge,
    poll_interval: Duration,
    query_timeout: Duration,
}

impl FileFetcher {
    pub fn new(bridge: AsyncBridge, poll_interval: Duration, query_timeout: Duration) -> Self {
        Self {
            bridge,
            poll_interval,
            query_timeout,
        }
    }

    pub fn from_config(bridge: AsyncBridge, config: &RelayConfig) -> Self {
        Self::new(bridge, config.poll_interval(), config.file_status_timeout())
    }

    /// Fetch `file_id`, giving up after `timeout`.
    ///
    /// Status query failures are logged and polling continues; only the
    /// overall deadline ends the wait.
    pub async fn fetch(&self, file_id: FileId, timeout: Duration) -> Result<PathBuf, FetchTimeout> {
        let started = Instant::now();
        let deadline = started + timeout;
        self.bridge.download_start(file_id);
        debug!(file_id = %file_id, timeout_ms = timeout.as_millis() as u64, "download started");

        let mut polls = 0u32;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let query_timeout = self.query_timeout.min(deadline - now);
            polls += 1;
            match self.bridge.get_file(file_id, query_timeout).await {
                Ok(file) => {
                    if let Some(path) = ready_path(&file).await {
                        info!(
                            file_id = %file_id,
                            path = %path.display(),
                            polls,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "file downloaded"
                        );
                        return Ok(path);
                    }
                },
                Err(e) => {
                    warn!(file_id = %file_id, error = %e, "file status query failed");
                },
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }

        warn!(file_id = %file_id, polls, "download timed out");
        Err(FetchTimeout {
            file_id,
            after: timeout,
            polls,
        })
    }
}

/// The local path, once the client reports completion and the file has data.
async fn ready_path(file: &RemoteFile) -> Option<PathBuf> {
    if !file.local.is_downloading_completed || file.local.path.is_empty() {
        return None;
    }
    let path = PathBuf::from(&file.local.path);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
        _ => None,
    }
}
