//! The transform-tool boundary and its `ffmpeg` implementation.

use {
    async_trait::async_trait,
    courier_config::MediaConfig,
    std::{
        ffi::OsString,
        path::{Path, PathBuf},
        process::Stdio,
        time::Duration,
    },
    tokio::process::Command,
    tracing::{debug, info, warn},
};

use crate::{
    binary::find_binary,
    error::{Error, Result},
    graph::FilterGraph,
    kind::MediaKind,
};

const FFMPEG: &str = "ffmpeg";

/// Everything one transform run needs.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub input: PathBuf,
    /// Second input, read by graphs that overlay a watermark.
    pub overlay: Option<PathBuf>,
    pub graph: FilterGraph,
    pub kind: MediaKind,
    pub output: PathBuf,
}

/// Completion status and log transcript of a transform run.
#[derive(Debug, Clone)]
pub struct TransformReport {
    pub status: Option<i32>,
    pub success: bool,
    pub transcript: String,
}

/// External filter-graph transcoder.
#[async_trait]
pub trait TransformTool: Send + Sync {
    /// Run the graph. A non-zero exit is reported in the returned
    /// [`TransformReport`], not as an `Err`; `Err` means the tool could not
    /// be run at all.
    async fn run(&self, request: &TransformRequest) -> Result<TransformReport>;
}

/// Encoder settings applied after the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub video_preset: String,
    pub video_crf: u8,
    pub photo_quality: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        let media = MediaConfig::default();
        Self {
            video_preset: media.video_preset,
            video_crf: media.video_crf,
            photo_quality: media.photo_quality,
        }
    }
}

/// `ffmpeg` subprocess runner.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    binary_path: Option<String>,
    settings: EncodeSettings,
    timeout: Duration,
}

impl FfmpegTool {
    #[must_use]
    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            binary_path: config.ffmpeg_path.clone(),
            settings: EncodeSettings {
                video_preset: config.video_preset.clone(),
                video_crf: config.video_crf,
                photo_quality: config.photo_quality,
            },
            timeout: config.transform_timeout(),
        }
    }

    fn find_binary(&self) -> Option<PathBuf> {
        find_binary(FFMPEG, self.binary_path.as_deref())
    }
}

#[async_trait]
impl TransformTool for FfmpegTool {
    async fn run(&self, request: &TransformRequest) -> Result<TransformReport> {
        let binary = self
            .find_binary()
            .ok_or(Error::ToolNotFound { tool: FFMPEG })?;
        let args = ffmpeg_args(request, &self.settings);
        debug!(
            binary = %binary.display(),
            graph = %request.graph,
            output = %request.output.display(),
            "running ffmpeg"
        );

        let child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    output = %request.output.display(),
                    "ffmpeg timed out, process killed"
                );
                return Err(Error::Timeout {
                    tool: FFMPEG,
                    after: self.timeout,
                    transcript: String::new(),
                });
            },
        };

        let transcript = String::from_utf8_lossy(&output.stderr).into_owned();
        let report = TransformReport {
            status: output.status.code(),
            success: output.status.success(),
            transcript,
        };
        info!(
            status = ?report.status,
            success = report.success,
            kind = %request.kind,
            "ffmpeg finished"
        );
        Ok(report)
    }
}

/// Full argument list for one run.
///
/// Stills become a single re-encoded frame. Video and animation keep any
/// audio stream as-is and re-encode only the picture.
#[must_use]
pub fn ffmpeg_args(request: &TransformRequest, settings: &EncodeSettings) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(request.input.clone().into_os_string());

    if request.graph.uses_overlay_input()
        && let Some(overlay) = &request.overlay
    {
        args.push("-i".into());
        args.push(overlay.clone().into_os_string());
    }

    if request.graph.is_identity() {
        args.extend(["-map".into(), "0:v:0".into()]);
    } else {
        args.extend([
            "-filter_complex".into(),
            request.graph.to_string().into(),
            "-map".into(),
            format!("[{}]", request.graph.output_label()).into(),
        ]);
    }

    if request.kind.is_still() {
        args.extend([
            OsString::from("-frames:v"),
            "1".into(),
            "-q:v".into(),
            settings.photo_quality.to_string().into(),
        ]);
    } else {
        args.extend([
            OsString::from("-map"),
            "0:a?".into(),
            "-c:a".into(),
            "copy".into(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            settings.video_preset.clone().into(),
            "-crf".into(),
            settings.video_crf.to_string().into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-movflags".into(),
            "+faststart".into(),
        ]);
    }

    args.push(request.output.clone().into_os_string());
    args
}

/// Whether `path` names a non-empty regular file.
pub async fn is_non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|m| m.is_file() && m.len() > 0)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{Dimensions, FilterGraphBuilder, WatermarkLayer},
        rect::{Anchor, parse_rects},
    };

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn request(kind: MediaKind, graph: FilterGraph, overlay: Option<&str>) -> TransformRequest {
        TransformRequest {
            input: PathBuf::from("/scratch/in.mp4"),
            overlay: overlay.map(PathBuf::from),
            graph,
            kind,
            output: PathBuf::from("/scratch/out.mp4"),
        }
    }

    #[test]
    fn video_args_copy_audio_and_reencode_video() {
        let graph = FilterGraphBuilder::default().build(
            Dimensions::new(640, 360).unwrap(),
            &parse_rects("0.1,0.1,0.4,0.4"),
            None,
        );
        let args = strings(&ffmpeg_args(
            &request(MediaKind::Video, graph.clone(), None),
            &EncodeSettings::default(),
        ));

        let fc = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[fc + 1], graph.to_string());
        assert_eq!(args[fc + 2..fc + 4], ["-map", "[v1]"]);
        let joined = args.join(" ");
        assert!(joined.contains("-map 0:a? -c:a copy"), "{joined}");
        assert!(joined.contains("-c:v libx264 -preset veryfast -crf 23"), "{joined}");
        assert_eq!(args.last().unwrap(), "/scratch/out.mp4");
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
    }

    #[test]
    fn photo_args_emit_single_frame() {
        let graph = FilterGraphBuilder::default().build(
            Dimensions::new(800, 600).unwrap(),
            &parse_rects("0,0,0.5,0.5"),
            None,
        );
        let args = strings(&ffmpeg_args(
            &request(MediaKind::Photo, graph, None),
            &EncodeSettings::default(),
        ));
        let joined = args.join(" ");
        assert!(joined.contains("-frames:v 1 -q:v 2"), "{joined}");
        assert!(!joined.contains("-c:a"), "{joined}");
    }

    #[test]
    fn watermark_graph_adds_second_input() {
        let layer = WatermarkLayer {
            size: Dimensions::new(100, 50).unwrap(),
            anchor: Anchor::default(),
        };
        let graph = FilterGraphBuilder::default().build(
            Dimensions::new(640, 360).unwrap(),
            &[],
            Some(&layer),
        );
        let args = strings(&ffmpeg_args(
            &request(MediaKind::Animation, graph, Some("/scratch/wm.png")),
            &EncodeSettings::default(),
        ));
        let inputs: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(flag, _)| *flag == "-i")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(inputs, ["/scratch/in.mp4", "/scratch/wm.png"]);
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let config = MediaConfig {
            ffmpeg_path: Some("/nope/definitely-not-ffmpeg".into()),
            ..MediaConfig::default()
        };
        let tool = FfmpegTool {
            binary_path: config.ffmpeg_path.clone(),
            settings: EncodeSettings::default(),
            timeout: Duration::from_secs(1),
        };
        // Only meaningful where ffmpeg itself is not installed either.
        if which::which(FFMPEG).is_ok() {
            return;
        }
        let err = tool
            .run(&request(MediaKind::Video, FilterGraph::identity(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn non_empty_file_check() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.mp4");
        let full = dir.path().join("full.mp4");
        std::fs::write(&empty, b"").unwrap();
        std::fs::write(&full, b"data").unwrap();
        assert!(!is_non_empty_file(&empty).await);
        assert!(is_non_empty_file(&full).await);
        assert!(!is_non_empty_file(&dir.path().join("missing")).await);
        assert!(!is_non_empty_file(dir.path()).await);
    }
}
