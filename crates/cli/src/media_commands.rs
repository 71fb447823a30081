use {
    anyhow::{Context, Result},
    clap::{Args, Subcommand},
    courier_config::CourierConfig,
    courier_media::{
        Anchor, Dimensions, EditPlan, FilterGraphBuilder, MediaEditor, MediaKind, WatermarkInput,
        WatermarkLayer, parse_rects, serialize_rects,
    },
    std::path::PathBuf,
    tracing::info,
};

#[derive(Subcommand)]
pub enum RectsAction {
    /// Parse a blur-rect string and print it back, dropping invalid entries.
    Normalize {
        /// Rects as `l,t,r,b;l,t,r,b;...`.
        rects: String,
    },
}

#[derive(Args)]
pub struct GraphArgs {
    /// Media kind: photo, video or animation.
    #[arg(long, default_value = "video")]
    kind: String,
    /// Frame size as `WIDTHxHEIGHT`.
    #[arg(long)]
    size: String,
    /// Blur rects as `l,t,r,b;...`.
    #[arg(long, default_value = "")]
    rects: String,
    /// Watermark image size as `WIDTHxHEIGHT`.
    #[arg(long)]
    watermark_size: Option<String>,
    /// Watermark anchor as `x,y` in `[0,1]`.
    #[arg(long, default_value = "1,1")]
    anchor: String,
}

#[derive(Args)]
pub struct TransformArgs {
    /// File to edit. It is never modified.
    input: PathBuf,
    /// Media kind: photo, video or animation.
    #[arg(long)]
    kind: String,
    /// Blur rects as `l,t,r,b;...`.
    #[arg(long, default_value = "")]
    rects: String,
    /// Watermark image to overlay.
    #[arg(long)]
    watermark: Option<PathBuf>,
    /// Watermark anchor as `x,y` in `[0,1]`.
    #[arg(long, default_value = "1,1")]
    anchor: String,
    /// Directory for the edited file (defaults to the input's directory).
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

pub fn handle_rects(action: RectsAction) -> Result<()> {
    match action {
        RectsAction::Normalize { rects } => {
            let parsed = parse_rects(&rects);
            eprintln!("{} valid rect(s)", parsed.len());
            println!("{}", serialize_rects(&parsed));
            Ok(())
        },
    }
}

pub fn handle_graph(args: GraphArgs, config: &CourierConfig) -> Result<()> {
    let kind: MediaKind = args.kind.parse()?;
    if !kind.is_editable() {
        anyhow::bail!("{kind} media cannot be edited");
    }
    let frame = parse_size(&args.size)?;
    let anchor: Anchor = args.anchor.parse()?;
    let layer = args
        .watermark_size
        .as_deref()
        .map(parse_size)
        .transpose()?
        .map(|size| WatermarkLayer { size, anchor });

    let graph = FilterGraphBuilder::from_config(&config.media).build(
        frame,
        &parse_rects(&args.rects),
        layer.as_ref(),
    );
    if graph.is_identity() {
        eprintln!("no edits; the input would be sent unchanged");
    } else {
        eprintln!(
            "{kind} graph, output label [{}], encoded as .{}",
            graph.output_label(),
            kind.output_extension()
        );
    }
    println!("{graph}");
    Ok(())
}

pub async fn handle_transform(args: TransformArgs, config: &CourierConfig) -> Result<()> {
    let kind: MediaKind = args.kind.parse()?;
    let anchor: Anchor = args.anchor.parse()?;
    let plan = EditPlan {
        rects: parse_rects(&args.rects),
        watermark: args.watermark.map(|path| WatermarkInput { path, anchor }),
    };
    if plan.is_empty() {
        anyhow::bail!("nothing to do: pass --rects and/or --watermark");
    }

    let out_dir = match args.out_dir {
        Some(dir) => dir,
        None => args
            .input
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let editor = MediaEditor::from_config(&config.media);
    let edited = match editor.apply(&args.input, kind, &plan, &out_dir).await {
        Ok(edited) => edited,
        Err(e) => {
            if let Some(transcript) = e.transcript() {
                eprintln!("{transcript}");
            }
            return Err(e.into());
        },
    };
    info!(output = %edited.path.display(), graph = %edited.graph, "transform complete");
    println!("{}", edited.path.display());
    Ok(())
}

fn parse_size(raw: &str) -> Result<Dimensions> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WIDTHxHEIGHT, got {raw:?}"))?;
    let width: u32 = w.trim().parse().with_context(|| format!("bad width {w:?}"))?;
    let height: u32 = h.trim().parse().with_context(|| format!("bad height {h:?}"))?;
    Dimensions::new(width, height).with_context(|| format!("size has no area: {raw}"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes() {
        let d = parse_size("1280x720").unwrap();
        assert_eq!((d.width(), d.height()), (1280, 720));
        assert!(parse_size("1280X 720").is_ok());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("1280").is_err());
        assert!(parse_size("ax1").is_err());
    }
}
