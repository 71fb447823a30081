//! Frame-size probing.
//!
//! Sizes are reported as ffmpeg's filters see the frames: a stream tagged
//! with a quarter-turn rotation is autorotated on decode, so its width and
//! height come back swapped.

use {
    async_trait::async_trait,
    courier_config::MediaConfig,
    serde::Deserialize,
    std::{
        collections::HashMap,
        path::{Path, PathBuf},
        process::Stdio,
        time::Duration,
    },
    tokio::process::Command,
    tracing::{debug, warn},
};

use crate::{
    binary::find_binary,
    error::{Context, Error, Result},
    graph::Dimensions,
    image_ops,
    kind::MediaKind,
};

const FFPROBE: &str = "ffprobe";
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Reports the pixel size of a media file's first video stream.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn dimensions(&self, path: &Path, kind: MediaKind) -> Result<Dimensions>;
}

/// Probe backed by image headers for stills and `ffprobe` for the rest.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProbe {
    binary_path: Option<String>,
}

impl FfprobeProbe {
    #[must_use]
    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            binary_path: config.ffprobe_path.clone(),
        }
    }

    async fn ffprobe(&self, path: &Path) -> Result<Dimensions> {
        let binary = find_binary(FFPROBE, self.binary_path.as_deref())
            .ok_or(Error::ToolNotFound { tool: FFPROBE })?;

        let child = Command::new(&binary)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height:stream_side_data=rotation:stream_tags=rotate",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(PROBE_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout {
                tool: FFPROBE,
                after: PROBE_TIMEOUT,
                transcript: String::new(),
            })??;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: FFPROBE,
                status: output.status.code(),
                transcript: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        parse_ffprobe_output(&output.stdout)
            .with_context(|| format!("probing {}", path.display()))
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn dimensions(&self, path: &Path, kind: MediaKind) -> Result<Dimensions> {
        if kind.is_still() {
            let owned: PathBuf = path.to_path_buf();
            let header = tokio::task::spawn_blocking(move || image_ops::image_dimensions(&owned))
                .await
                .map_err(|e| Error::message(format!("image probe task failed: {e}")))?;
            match header {
                Ok(dims) => {
                    debug!(path = %path.display(), dims = %dims, "probed image header");
                    return Ok(dims);
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "image header unreadable, trying ffprobe");
                },
            }
        }
        let dims = self.ffprobe(path).await?;
        debug!(path = %path.display(), dims = %dims, kind = %kind, "probed with ffprobe");
        Ok(dims)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    side_data_list: Vec<SideData>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SideData {
    rotation: Option<f64>,
}

impl ProbeStream {
    /// Rotation in degrees from the display matrix, else the legacy
    /// `rotate` tag.
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| self.tags.get("rotate").and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0)
    }
}

fn is_quarter_turn(degrees: f64) -> bool {
    (degrees.round() as i64).rem_euclid(180) == 90
}

/// Parse `ffprobe -of json` output into the first stream's displayed size.
pub fn parse_ffprobe_output(stdout: &[u8]) -> Result<Dimensions> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout)?;
    let stream = parsed.streams.first().context("no video stream")?;
    let (w, h) = match (stream.width, stream.height) {
        (Some(w), Some(h)) => (w, h),
        _ => return Err(Error::message("video stream has no size")),
    };
    let (w, h) = if is_quarter_turn(stream.rotation()) {
        (h, w)
    } else {
        (w, h)
    };
    Dimensions::new(w, h).with_context(|| format!("video stream has no area: {w}x{h}"))
}
