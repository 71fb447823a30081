use {
    anyhow::Result,
    clap::Subcommand,
    courier_config::validate::{self, Severity},
    std::path::Path,
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as JSON.
    Show,
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the config file path in use (or where one would be created).
    Path,
}

pub fn handle_config(action: ConfigAction, explicit: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = courier_config::load_or_discover(explicit)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        },
        ConfigAction::Check { verbose } => check(explicit, verbose),
        ConfigAction::Path => {
            let path = explicit
                .map(Path::to_path_buf)
                .unwrap_or_else(courier_config::find_or_default_config_path);
            println!("{}", path.display());
            Ok(())
        },
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn severity_style(severity: Severity) -> (&'static str, &'static str) {
    match severity {
        Severity::Error => (RED, "error"),
        Severity::Warning => (YELLOW, "warning"),
        Severity::Info => (CYAN, "info"),
    }
}

fn check(explicit: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate::validate(explicit);
    match &result.config_path {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let visible: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .collect();
    for d in &visible {
        let (color, label) = severity_style(d.severity);
        let location = if d.path.is_empty() {
            String::new()
        } else {
            format!("{}: ", d.path)
        };
        eprintln!("  {BOLD}{color}{label}{RESET} {location}{}", d.message);
    }
    if !visible.is_empty() {
        eprintln!();
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    match (errors, warnings) {
        (0, 0) => eprintln!("No issues found."),
        _ => eprintln!("{errors} error(s), {warnings} warning(s)"),
    }
    if result.has_errors() {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}
