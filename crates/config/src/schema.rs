/// Config schema types (relay timeouts, media transform, job logs).
use {
    serde::{Deserialize, Serialize},
    std::{path::PathBuf, time::Duration},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CourierConfig {
    pub relay: RelayConfig,
    pub media: MediaConfig,
    pub logs: LogsConfig,
}

/// Pipeline timing and working directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Upper bound for resolving a public handle to a chat.
    pub resolve_timeout_secs: u64,
    /// Upper bound for fetching the source message.
    pub fetch_message_timeout_secs: u64,
    /// Overall deadline for a file download to complete.
    pub download_timeout_secs: u64,
    /// Upper bound for the final send call.
    pub send_timeout_secs: u64,
    /// Upper bound for each file status query while polling.
    pub file_status_timeout_secs: u64,
    /// Delay between file status queries.
    pub poll_interval_ms: u64,
    /// Parent of the per-job scratch directories. Defaults to the user cache dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
    /// Where per-job log files are written. Defaults to the user cache dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// How many jobs may run at the same time.
    pub max_concurrent_jobs: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: 20,
            fetch_message_timeout_secs: 25,
            download_timeout_secs: 90,
            send_timeout_secs: 30,
            file_status_timeout_secs: 10,
            poll_interval_ms: 250,
            scratch_dir: None,
            log_dir: None,
            max_concurrent_jobs: 2,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    #[must_use]
    pub fn fetch_message_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_message_timeout_secs)
    }

    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    #[must_use]
    pub fn file_status_timeout(&self) -> Duration {
        Duration::from_secs(self.file_status_timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Configured scratch root, or `<cache>/scratch`.
    #[must_use]
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| crate::loader::cache_dir().join("scratch"))
    }

    /// Configured log directory, or `<cache>/logs`.
    #[must_use]
    pub fn log_root(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| crate::loader::cache_dir().join("logs"))
    }
}

/// External transform tool settings and edit parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaConfig {
    /// Explicit `ffmpeg` binary. Looked up in `PATH` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<String>,
    /// Explicit `ffprobe` binary. Looked up in `PATH` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffprobe_path: Option<String>,
    /// Pixel format the input is normalised to before editing.
    pub pixel_format: String,
    /// Box blur radius applied inside each region (clamped for small regions).
    pub blur_radius: u32,
    /// Watermark width as a fraction of the media width.
    pub watermark_width_ratio: f64,
    /// x264 preset for re-encoded video.
    pub video_preset: String,
    /// x264 constant rate factor (0-51, lower is better).
    pub video_crf: u8,
    /// JPEG quality scale for stills (2 is best, 31 worst).
    pub photo_quality: u8,
    /// Upper bound for a single transform run.
    pub transform_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            pixel_format: "yuv420p".into(),
            blur_radius: 20,
            watermark_width_ratio: 0.18,
            video_preset: "veryfast".into(),
            video_crf: 23,
            photo_quality: 2,
            transform_timeout_secs: 300,
        }
    }
}

impl MediaConfig {
    #[must_use]
    pub fn transform_timeout(&self) -> Duration {
        Duration::from_secs(self.transform_timeout_secs)
    }
}

/// Per-job log capture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogsConfig {
    /// Number of most recent lines reported with a failure.
    pub tail_lines: usize,
    /// Each tail line is cut to this many characters.
    pub line_max_chars: usize,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            tail_lines: 40,
            line_max_chars: 300,
        }
    }
}
