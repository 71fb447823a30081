mod config_commands;
mod media_commands;

use {
    clap::{Parser, Subcommand},
    config_commands::ConfigAction,
    media_commands::{GraphArgs, RectsAction, TransformArgs},
    std::path::PathBuf,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "courier", about = "Courier: relay and edit media between chats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of the discovered one.
    #[arg(long, global = true, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Blur-rect wire format helpers.
    Rects {
        #[command(subcommand)]
        action: RectsAction,
    },
    /// Print the filter graph for a frame size, rects and watermark.
    Graph(GraphArgs),
    /// Blur and/or watermark a local file with ffmpeg.
    Transform(TransformArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_telemetry(&cli);
    debug!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Config { action } => config_commands::handle_config(action, explicit),
        Commands::Rects { action } => media_commands::handle_rects(action),
        Commands::Graph(args) => {
            let config = courier_config::load_or_discover(explicit)?;
            media_commands::handle_graph(args, &config)
        },
        Commands::Transform(args) => {
            let config = courier_config::load_or_discover(explicit)?;
            media_commands::handle_transform(args, &config).await
        },
    }
}
