//! Applying an [`EditPlan`] to a downloaded file.

use {
    courier_common::naming::artifact_path,
    courier_config::MediaConfig,
    std::{
        path::{Path, PathBuf},
        sync::Arc,
    },
    tracing::{debug, info},
};

use crate::{
    error::{Error, Result},
    graph::{FilterGraph, FilterGraphBuilder, WatermarkLayer},
    image_ops,
    kind::MediaKind,
    probe::{FfprobeProbe, MediaProbe},
    rect::{Anchor, NormalizedRect},
    tool::{FfmpegTool, TransformRequest, TransformTool, is_non_empty_file},
};

/// Local watermark image and where to place it.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkInput {
    pub path: PathBuf,
    pub anchor: Anchor,
}

/// Edits requested for one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditPlan {
    pub rects: Vec<NormalizedRect>,
    pub watermark: Option<WatermarkInput>,
}

impl EditPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty() && self.watermark.is_none()
    }
}

/// Result of a successful edit.
#[derive(Debug, Clone)]
pub struct EditedMedia {
    pub path: PathBuf,
    pub graph: FilterGraph,
    pub transcript: String,
}

/// Probes, builds the graph, and runs the transform tool.
#[derive(Clone)]
pub struct MediaEditor {
    builder: FilterGraphBuilder,
    probe: Arc<dyn MediaProbe>,
    tool: Arc<dyn TransformTool>,
}

impl MediaEditor {
    pub fn new(
        builder: FilterGraphBuilder,
        probe: Arc<dyn MediaProbe>,
        tool: Arc<dyn TransformTool>,
    ) -> Self {
        Self {
            builder,
            probe,
            tool,
        }
    }

    /// Editor using `ffprobe` and `ffmpeg` as configured.
    #[must_use]
    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(
            FilterGraphBuilder::from_config(config),
            Arc::new(FfprobeProbe::from_config(config)),
            Arc::new(FfmpegTool::from_config(config)),
        )
    }

    /// Write an edited copy of `input` into `work_dir`.
    ///
    /// The input file is never modified. Fails for kinds that cannot be
    /// edited, when the tool exits unsuccessfully, or when it leaves no
    /// output behind.
    pub async fn apply(
        &self,
        input: &Path,
        kind: MediaKind,
        plan: &EditPlan,
        work_dir: &Path,
    ) -> Result<EditedMedia> {
        if !kind.is_editable() {
            return Err(Error::NotEditable { kind });
        }

        let frame = self.probe.dimensions(input, kind).await?;
        let layer = match &plan.watermark {
            Some(wm) => {
                let path = wm.path.clone();
                let size = tokio::task::spawn_blocking(move || image_ops::image_dimensions(&path))
                    .await
                    .map_err(|e| Error::message(format!("watermark probe task failed: {e}")))??;
                Some(WatermarkLayer {
                    size,
                    anchor: wm.anchor,
                })
            },
            None => None,
        };

        let graph = self.builder.build(frame, &plan.rects, layer.as_ref());
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("media");
        let output = artifact_path(work_dir, &format!("{stem}-edited"), kind.output_extension());
        debug!(
            input = %input.display(),
            frame = %frame,
            rects = plan.rects.len(),
            watermark = layer.is_some(),
            graph = %graph,
            "applying edits"
        );

        let request = TransformRequest {
            input: input.to_path_buf(),
            overlay: plan.watermark.as_ref().map(|wm| wm.path.clone()),
            graph: graph.clone(),
            kind,
            output: output.clone(),
        };
        let report = self.tool.run(&request).await?;
        if !report.success {
            return Err(Error::ToolFailed {
                tool: "ffmpeg",
                status: report.status,
                transcript: report.transcript,
            });
        }
        if !is_non_empty_file(&output).await {
            return Err(Error::EmptyOutput {
                path: output,
                transcript: report.transcript,
            });
        }

        info!(output = %output.display(), kind = %kind, "edited media written");
        Ok(EditedMedia {
            path: output,
            graph,
            transcript: report.transcript,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{graph::Dimensions, rect::parse_rects, tool::TransformReport},
        async_trait::async_trait,
        std::sync::Mutex,
    };

    struct FixedProbe(Dimensions);

    #[async_trait]
    impl MediaProbe for FixedProbe {
        async fn dimensions(&self, _path: &Path, _kind: MediaKind) -> Result<Dimensions> {
            Ok(self.0)
        }
    }

    /// Records requests and writes `output_bytes` to the requested output.
    struct RecordingTool {
        success: bool,
        output_bytes: &'static [u8],
        requests: Mutex<Vec<TransformRequest>>,
    }

    impl RecordingTool {
        fn new(success: bool, output_bytes: &'static [u8]) -> Arc<Self> {
            Arc::new(Self {
                success,
                output_bytes,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TransformTool for RecordingTool {
        async fn run(&self, request: &TransformRequest) -> Result<TransformReport> {
            self.requests.lock().unwrap().push(request.clone());
            std::fs::write(&request.output, self.output_bytes)?;
            Ok(TransformReport {
                status: Some(if self.success { 0 } else { 1 }),
                success: self.success,
                transcript: "frame=1 fps=0".into(),
            })
        }
    }

    fn editor(tool: Arc<RecordingTool>) -> MediaEditor {
        MediaEditor::new(
            FilterGraphBuilder::default(),
            Arc::new(FixedProbe(Dimensions::new(1280, 720).unwrap())),
            tool,
        )
    }

    fn blur_plan() -> EditPlan {
        EditPlan {
            rects: parse_rects("0.1,0.1,0.4,0.4"),
            watermark: None,
        }
    }

    #[tokio::test]
    async fn writes_new_file_and_leaves_input_alone() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"original").unwrap();
        let tool = RecordingTool::new(true, b"edited");

        let edited = editor(tool.clone())
            .apply(&input, MediaKind::Video, &blur_plan(), dir.path())
            .await
            .unwrap();

        assert_ne!(edited.path, input);
        assert_eq!(edited.path.extension().unwrap(), "mp4");
        assert!(edited.path.starts_with(dir.path()));
        assert_eq!(std::fs::read(&input).unwrap(), b"original");
        assert_eq!(std::fs::read(&edited.path).unwrap(), b"edited");
        assert!(!edited.graph.is_identity());

        let requests = tool.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].input, input);
        assert!(requests[0].overlay.is_none());
    }

    #[tokio::test]
    async fn documents_are_rejected_without_running_tool() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("report.pdf");
        std::fs::write(&input, b"%PDF").unwrap();
        let tool = RecordingTool::new(true, b"x");

        let err = editor(tool.clone())
            .apply(&input, MediaKind::Document, &blur_plan(), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotEditable {
            kind: MediaKind::Document
        }));
        assert!(tool.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tool_failure_carries_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"original").unwrap();

        let err = editor(RecordingTool::new(false, b""))
            .apply(&input, MediaKind::Video, &blur_plan(), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolFailed { status: Some(1), .. }));
        assert_eq!(err.transcript(), Some("frame=1 fps=0"));
    }

    #[tokio::test]
    async fn empty_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"original").unwrap();

        let err = editor(RecordingTool::new(true, b""))
            .apply(&input, MediaKind::Animation, &blur_plan(), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyOutput { .. }));
    }

    #[tokio::test]
    async fn watermark_is_passed_as_overlay_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.jpg");
        std::fs::write(&input, b"jpeg").unwrap();
        let wm = dir.path().join("wm.png");
        image::RgbaImage::new(200, 100).save(&wm).unwrap();
        let tool = RecordingTool::new(true, b"edited");

        let plan = EditPlan {
            rects: Vec::new(),
            watermark: Some(WatermarkInput {
                path: wm.clone(),
                anchor: Anchor::default(),
            }),
        };
        let edited = editor(tool.clone())
            .apply(&input, MediaKind::Photo, &plan, dir.path())
            .await
            .unwrap();

        assert!(edited.graph.uses_overlay_input());
        assert_eq!(edited.path.extension().unwrap(), "jpg");
        assert_eq!(tool.requests.lock().unwrap()[0].overlay.as_deref(), Some(wm.as_path()));
    }

    #[tokio::test]
    async fn unreadable_watermark_fails_edit() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.jpg");
        std::fs::write(&input, b"jpeg").unwrap();
        let plan = EditPlan {
            rects: Vec::new(),
            watermark: Some(WatermarkInput {
                path: dir.path().join("missing.png"),
                anchor: Anchor::default(),
            }),
        };
        let tool = RecordingTool::new(true, b"edited");
        assert!(
            editor(tool.clone())
                .apply(&input, MediaKind::Photo, &plan, dir.path())
                .await
                .is_err()
        );
        assert!(tool.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_plan() {
        assert!(EditPlan::default().is_empty());
        assert!(!blur_plan().is_empty());
    }
}
