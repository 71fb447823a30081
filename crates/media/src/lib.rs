//! Media editing for relayed content: blur regions and watermark overlay.
//!
//! Regions arrive as resolution-independent [`NormalizedRect`]s and are only
//! mapped to pixels by [`FilterGraphBuilder`] once the target frame size is
//! known. The resulting [`FilterGraph`] is serialised for `ffmpeg`'s
//! `-filter_complex` and executed through the [`TransformTool`] boundary.

pub mod binary;
pub mod edit;
pub mod error;
pub mod graph;
pub mod image_ops;
pub mod kind;
pub mod probe;
pub mod rect;
pub mod tool;

pub use {
    edit::{EditPlan, EditedMedia, MediaEditor, WatermarkInput},
    error::{Error, Result},
    graph::{Dimensions, Filter, FilterGraph, FilterGraphBuilder, GraphNode, WatermarkLayer},
    kind::MediaKind,
    probe::{FfprobeProbe, MediaProbe},
    rect::{Anchor, NormalizedRect, parse_rects, serialize_rects},
    tool::{FfmpegTool, TransformReport, TransformRequest, TransformTool},
};
