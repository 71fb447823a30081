//! Filter-graph construction for region blur and watermark overlay.
//!
//! The graph is built as typed [`GraphNode`]s first; all pixel arithmetic
//! happens here against the target frame size. Only [`FilterGraph`]'s
//! `Display` impl knows the `-filter_complex` text syntax.

use {courier_config::MediaConfig, std::fmt};

use crate::rect::{Anchor, NormalizedRect};

/// Label of the primary input's video stream.
pub const MAIN_INPUT: &str = "0:v";
/// Label of the watermark image input.
pub const OVERLAY_INPUT: &str = "1:v";

/// Pixel size of a frame or image. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    width: u32,
    height: u32,
}

impl Dimensions {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One filter with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Format {
        pix_fmt: String,
    },
    Split {
        outputs: u8,
    },
    Crop {
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    },
    BoxBlur {
        luma_radius: u32,
        chroma_radius: u32,
    },
    Scale {
        width: u32,
        height: u32,
    },
    Overlay {
        x: u32,
        y: u32,
    },
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format { pix_fmt } => write!(f, "format=pix_fmts={pix_fmt}"),
            Self::Split { outputs } => write!(f, "split={outputs}"),
            Self::Crop {
                width,
                height,
                x,
                y,
            } => write!(f, "crop=w={width}:h={height}:x={x}:y={y}"),
            Self::BoxBlur {
                luma_radius,
                chroma_radius,
            } => write!(
                f,
                "boxblur=luma_radius={luma_radius}:luma_power=1:chroma_radius={chroma_radius}:chroma_power=1"
            ),
            Self::Scale { width, height } => write!(f, "scale=w={width}:h={height}"),
            Self::Overlay { x, y } => write!(f, "overlay=x={x}:y={y}"),
        }
    }
}

/// A filter chain reading labelled inputs and producing labelled outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub inputs: Vec<String>,
    pub chain: Vec<Filter>,
    pub outputs: Vec<String>,
}

impl GraphNode {
    fn new(inputs: &[&str], chain: Vec<Filter>, outputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(ToString::to_string).collect(),
            chain,
            outputs: outputs.iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{input}]")?;
        }
        for (i, filter) in self.chain.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for output in &self.outputs {
            write!(f, "[{output}]")?;
        }
        Ok(())
    }
}

/// Ordered node declarations plus the label holding the final frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph {
    nodes: Vec<GraphNode>,
    output: String,
    uses_overlay_input: bool,
}

impl FilterGraph {
    /// The pass-through graph: no nodes, output is the raw input stream.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            nodes: Vec::new(),
            output: MAIN_INPUT.to_string(),
            uses_overlay_input: false,
        }
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Label to `-map` for the edited video.
    #[must_use]
    pub fn output_label(&self) -> &str {
        &self.output
    }

    /// Whether the graph reads the second (watermark) input.
    #[must_use]
    pub fn uses_overlay_input(&self) -> bool {
        self.uses_overlay_input
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

/// Watermark image size and where it should sit on the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkLayer {
    pub size: Dimensions,
    pub anchor: Anchor,
}

/// Region of a frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Builds a [`FilterGraph`] for one frame size.
#[derive(Debug, Clone)]
pub struct FilterGraphBuilder {
    pixel_format: String,
    blur_radius: u32,
    watermark_width_ratio: f64,
}

impl Default for FilterGraphBuilder {
    fn default() -> Self {
        Self::from_config(&MediaConfig::default())
    }
}

impl FilterGraphBuilder {
    #[must_use]
    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            pixel_format: config.pixel_format.clone(),
            blur_radius: config.blur_radius,
            watermark_width_ratio: config.watermark_width_ratio,
        }
    }

    /// Build the graph for `frame`. Returns [`FilterGraph::identity`] when
    /// there is nothing to apply.
    ///
    /// Rects are applied in order; each one blurs the output of the previous
    /// step, so overlapping regions compound.
    #[must_use]
    pub fn build(
        &self,
        frame: Dimensions,
        rects: &[NormalizedRect],
        watermark: Option<&WatermarkLayer>,
    ) -> FilterGraph {
        if rects.is_empty() && watermark.is_none() {
            return FilterGraph::identity();
        }

        let mut nodes = vec![GraphNode::new(
            &[MAIN_INPUT],
            vec![Filter::Format {
                pix_fmt: self.pixel_format.clone(),
            }],
            &["v0"],
        )];
        let mut step = 0usize;

        for rect in rects {
            let current = format!("v{step}");
            let base = format!("{current}base");
            let region = format!("{current}region");
            let blurred = format!("{current}blur");
            let next = format!("v{}", step + 1);
            let area = pixel_box(rect, frame);
            let (luma_radius, chroma_radius) = blur_radii(self.blur_radius, area);

            nodes.push(GraphNode::new(
                &[current.as_str()],
                vec![Filter::Split { outputs: 2 }],
                &[base.as_str(), region.as_str()],
            ));
            nodes.push(GraphNode::new(
                &[region.as_str()],
                vec![
                    Filter::Crop {
                        width: area.width,
                        height: area.height,
                        x: area.x,
                        y: area.y,
                    },
                    Filter::BoxBlur {
                        luma_radius,
                        chroma_radius,
                    },
                ],
                &[blurred.as_str()],
            ));
            nodes.push(GraphNode::new(
                &[base.as_str(), blurred.as_str()],
                vec![Filter::Overlay {
                    x: area.x,
                    y: area.y,
                }],
                &[next.as_str()],
            ));
            step += 1;
        }

        if let Some(layer) = watermark {
            let current = format!("v{step}");
            let next = format!("v{}", step + 1);
            let scaled = scaled_watermark(frame, layer.size, self.watermark_width_ratio);
            let (x, y) = overlay_position(frame, scaled, layer.anchor);

            nodes.push(GraphNode::new(
                &[OVERLAY_INPUT],
                vec![
                    Filter::Format {
                        pix_fmt: "rgba".into(),
                    },
                    Filter::Scale {
                        width: scaled.width,
                        height: scaled.height,
                    },
                ],
                &["wm"],
            ));
            nodes.push(GraphNode::new(
                &[current.as_str(), "wm"],
                vec![Filter::Overlay { x, y }],
                &[next.as_str()],
            ));
            step += 1;
        }

        FilterGraph {
            nodes,
            output: format!("v{step}"),
            uses_overlay_input: watermark.is_some(),
        }
    }
}

/// Map a normalized rect onto `frame`, clamped to the frame and at least 1x1.
#[must_use]
pub fn pixel_box(rect: &NormalizedRect, frame: Dimensions) -> PixelBox {
    let (x, width) = pixel_span(rect.left(), rect.right(), frame.width);
    let (y, height) = pixel_span(rect.top(), rect.bottom(), frame.height);
    PixelBox {
        x,
        y,
        width,
        height,
    }
}

fn pixel_span(start: f64, end: f64, extent: u32) -> (u32, u32) {
    let scaled = |v: f64| (v * f64::from(extent)).round() as u32;
    let from = scaled(start).min(extent - 1);
    let to = scaled(end).clamp(from + 1, extent);
    (from, to - from)
}

/// The blur filter rejects radii larger than half the smaller plane side;
/// chroma planes are half size in 4:2:0.
fn blur_radii(radius: u32, area: PixelBox) -> (u32, u32) {
    let short_side = area.width.min(area.height);
    (radius.min(short_side / 2), radius.min(short_side / 4))
}

fn scaled_watermark(frame: Dimensions, image: Dimensions, ratio: f64) -> Dimensions {
    let width = (f64::from(frame.width) * ratio).round().max(1.0) as u32;
    let width = width.min(frame.width);
    let height = (f64::from(width) * f64::from(image.height) / f64::from(image.width))
        .round()
        .max(1.0) as u32;
    Dimensions { width, height }
}

fn overlay_position(frame: Dimensions, overlay: Dimensions, anchor: Anchor) -> (u32, u32) {
    let place = |fraction: f64, main: u32, over: u32| {
        let free = main.saturating_sub(over);
        ((fraction * f64::from(free)).round() as u32).min(free)
    };
    (
        place(anchor.x(), frame.width, overlay.width),
        place(anchor.y(), frame.height, overlay.height),
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::rect::parse_rects};

    fn dims(w: u32, h: u32) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    #[test]
    fn no_edits_is_identity() {
        let graph = FilterGraphBuilder::default().build(dims(640, 480), &[], None);
        assert!(graph.is_identity());
        assert_eq!(graph.output_label(), MAIN_INPUT);
        assert_eq!(graph.to_string(), "");
    }

    #[test]
    fn single_rect_emits_split_blur_overlay_chain() {
        let rects = parse_rects("0.1,0.1,0.4,0.4");
        let graph = FilterGraphBuilder::default().build(dims(1280, 720), &rects, None);

        let nodes = graph.nodes();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].chain, vec![Filter::Format {
            pix_fmt: "yuv420p".into()
        }]);
        let edit_nodes = &nodes[1..];
        assert_eq!(edit_nodes.len(), 3);
        assert!(matches!(edit_nodes[0].chain[..], [Filter::Split { outputs: 2 }]));
        assert!(matches!(edit_nodes[1].chain[..], [
            Filter::Crop { .. },
            Filter::BoxBlur { .. }
        ]));
        assert!(matches!(edit_nodes[2].chain[..], [Filter::Overlay { .. }]));
        assert_eq!(graph.output_label(), "v1");
        assert!(!graph.uses_overlay_input());

        assert_eq!(
            graph.to_string(),
            "[0:v]format=pix_fmts=yuv420p[v0];\
             [v0]split=2[v0base][v0region];\
             [v0region]crop=w=384:h=216:x=128:y=72,\
             boxblur=luma_radius=20:luma_power=1:chroma_radius=20:chroma_power=1[v0blur];\
             [v0base][v0blur]overlay=x=128:y=72[v1]"
        );
    }

    #[test]
    fn rects_chain_through_successive_labels() {
        let rects = parse_rects("0,0,0.5,0.5;0.25,0.25,0.75,0.75;0.5,0.5,1,1");
        let graph = FilterGraphBuilder::default().build(dims(100, 100), &rects, None);
        assert_eq!(graph.nodes().len(), 1 + 3 * 3);
        assert_eq!(graph.output_label(), "v3");
        // Second rect reads what the first produced.
        assert_eq!(graph.nodes()[4].inputs, vec!["v1".to_string()]);
        assert_eq!(graph.nodes()[7].inputs, vec!["v2".to_string()]);
    }

    #[test]
    fn pixel_box_is_clamped_and_non_empty() {
        let frame = dims(10, 10);
        let tiny = NormalizedRect::new(0.99, 0.99, 1.0, 1.0).unwrap();
        assert_eq!(pixel_box(&tiny, frame), PixelBox {
            x: 9,
            y: 9,
            width: 1,
            height: 1
        });

        let sliver = NormalizedRect::new(0.5, 0.5, 0.501, 0.501).unwrap();
        let area = pixel_box(&sliver, frame);
        assert_eq!((area.width, area.height), (1, 1));

        let full = NormalizedRect::new(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(pixel_box(&full, frame), PixelBox {
            x: 0,
            y: 0,
            width: 10,
            height: 10
        });
    }

    #[test]
    fn blur_radius_shrinks_for_small_regions() {
        let area = PixelBox {
            x: 0,
            y: 0,
            width: 12,
            height: 30,
        };
        assert_eq!(blur_radii(20, area), (6, 3));
        let big = PixelBox {
            x: 0,
            y: 0,
            width: 400,
            height: 400,
        };
        assert_eq!(blur_radii(20, big), (20, 20));
    }

    #[test]
    fn watermark_scaled_and_anchored_bottom_right() {
        let layer = WatermarkLayer {
            size: dims(200, 100),
            anchor: Anchor::default(),
        };
        let graph = FilterGraphBuilder::default().build(dims(1000, 500), &[], Some(&layer));

        assert!(graph.uses_overlay_input());
        assert_eq!(graph.output_label(), "v1");
        let nodes = graph.nodes();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].inputs, vec![OVERLAY_INPUT.to_string()]);
        assert!(nodes[1].chain.contains(&Filter::Scale {
            width: 180,
            height: 90
        }));
        assert_eq!(nodes[2].chain, vec![Filter::Overlay { x: 820, y: 410 }]);
    }

    #[test]
    fn watermark_anchor_top_left_and_oversized() {
        let layer = WatermarkLayer {
            size: dims(10, 1000),
            anchor: Anchor::new(0.0, 0.0),
        };
        let graph = FilterGraphBuilder::default().build(dims(100, 100), &[], Some(&layer));
        // 18px wide, 1800px tall: taller than the frame, so y has no room.
        assert_eq!(graph.nodes()[2].chain, vec![Filter::Overlay { x: 0, y: 0 }]);

        let centred = WatermarkLayer {
            size: dims(10, 10),
            anchor: Anchor::new(0.5, 0.5),
        };
        let graph = FilterGraphBuilder::default().build(dims(100, 100), &[], Some(&centred));
        assert_eq!(graph.nodes()[2].chain, vec![Filter::Overlay { x: 41, y: 41 }]);
    }

    #[test]
    fn watermark_follows_blur_chain() {
        let rects = parse_rects("0.1,0.1,0.2,0.2");
        let layer = WatermarkLayer {
            size: dims(50, 50),
            anchor: Anchor::default(),
        };
        let graph = FilterGraphBuilder::default().build(dims(200, 200), &rects, Some(&layer));
        assert_eq!(graph.nodes().len(), 1 + 3 + 2);
        let last = graph.nodes().last().unwrap();
        assert_eq!(last.inputs, vec!["v1".to_string(), "wm".to_string()]);
        assert_eq!(graph.output_label(), "v2");
    }
}
