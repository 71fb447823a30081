//! Configuration validation engine.
//!
//! Validates configuration files against the known schema, detects
//! unknown/misspelled fields, and flags values the relay cannot work with.

use std::{collections::HashMap, path::Path};

use crate::schema::CourierConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "range", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "relay.send_timeout_secs"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let relay = Struct(HashMap::from([
        ("resolve_timeout_secs", Leaf),
        ("fetch_message_timeout_secs", Leaf),
        ("download_timeout_secs", Leaf),
        ("send_timeout_secs", Leaf),
        ("file_status_timeout_secs", Leaf),
        ("poll_interval_ms", Leaf),
        ("scratch_dir", Leaf),
        ("log_dir", Leaf),
        ("max_concurrent_jobs", Leaf),
    ]));

    let media = Struct(HashMap::from([
        ("ffmpeg_path", Leaf),
        ("ffprobe_path", Leaf),
        ("pixel_format", Leaf),
        ("blur_radius", Leaf),
        ("watermark_width_ratio", Leaf),
        ("video_preset", Leaf),
        ("video_crf", Leaf),
        ("photo_quality", Leaf),
        ("transform_timeout_secs", Leaf),
    ]));

    let logs = Struct(HashMap::from([
        ("tail_lines", Leaf),
        ("line_max_chars", Leaf),
    ]));

    Struct(HashMap::from([
        ("relay", relay),
        ("media", media),
        ("logs", logs),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
///
/// Unknown-field detection only runs on TOML files; YAML and JSON files get
/// type and range checks.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let is_toml = actual_path
        .extension()
        .and_then(|e| e.to_str())
        .is_none_or(|e| e == "toml");

    if !is_toml {
        let mut diagnostics = Vec::new();
        match crate::loader::load_config(actual_path) {
            Ok(config) => check_semantics(&config, &mut diagnostics),
            Err(e) => diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "type-error",
                path: String::new(),
                message: e.to_string(),
            }),
        }
        return ValidationResult {
            diagnostics,
            config_path,
        };
    }

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let content = crate::env_subst::substitute_env(&content);
            let mut result = validate_toml_str(&content);
            result.config_path = config_path;
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path,
        },
    }
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    let schema = build_schema_map();
    check_unknown_fields(&toml_value, &schema, "", &mut diagnostics);

    match toml::from_str::<CourierConfig>(toml_str) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let message = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message: message.trim().to_string(),
        });
    }
}

fn check_semantics(config: &CourierConfig, diagnostics: &mut Vec<Diagnostic>) {
    let mut push = |severity, path: &str, message: String| {
        diagnostics.push(Diagnostic {
            severity,
            category: "range",
            path: path.to_string(),
            message,
        });
    };

    let relay = &config.relay;
    for (path, value) in [
        ("relay.resolve_timeout_secs", relay.resolve_timeout_secs),
        (
            "relay.fetch_message_timeout_secs",
            relay.fetch_message_timeout_secs,
        ),
        ("relay.download_timeout_secs", relay.download_timeout_secs),
        ("relay.send_timeout_secs", relay.send_timeout_secs),
        (
            "relay.file_status_timeout_secs",
            relay.file_status_timeout_secs,
        ),
        (
            "media.transform_timeout_secs",
            config.media.transform_timeout_secs,
        ),
    ] {
        if value == 0 {
            push(
                Severity::Error,
                path,
                "timeout must be greater than zero".into(),
            );
        }
    }

    if relay.poll_interval_ms == 0 {
        push(
            Severity::Error,
            "relay.poll_interval_ms",
            "poll interval must be greater than zero".into(),
        );
    } else if relay.poll_interval_ms > relay.file_status_timeout_secs.saturating_mul(1000) {
        push(
            Severity::Warning,
            "relay.poll_interval_ms",
            "poll interval is longer than the per-query file status timeout".into(),
        );
    }

    if relay.max_concurrent_jobs == 0 {
        push(
            Severity::Error,
            "relay.max_concurrent_jobs",
            "at least one job must be allowed to run".into(),
        );
    }

    let ratio = config.media.watermark_width_ratio;
    if !(ratio > 0.0 && ratio <= 1.0) {
        push(
            Severity::Error,
            "media.watermark_width_ratio",
            format!("ratio {ratio} must be within (0, 1]"),
        );
    }

    if config.media.video_crf > 51 {
        push(
            Severity::Warning,
            "media.video_crf",
            format!("crf {} is outside 0..=51", config.media.video_crf),
        );
    }

    if !(2..=31).contains(&config.media.photo_quality) {
        push(
            Severity::Warning,
            "media.photo_quality",
            format!(
                "quality {} is outside the 2..=31 JPEG scale",
                config.media.photo_quality
            ),
        );
    }

    if config.logs.tail_lines == 0 {
        push(
            Severity::Warning,
            "logs.tail_lines",
            "failures will be reported without any log lines".into(),
        );
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
