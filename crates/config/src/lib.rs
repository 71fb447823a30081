//! Configuration loading, validation, and env substitution.
//!
//! Config files: `courier.toml`, `courier.yaml`, or `courier.json`
//! Searched in `./` then `~/.config/courier/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        cache_dir, config_dir, discover_and_load, find_or_default_config_path, load_config,
        load_or_discover,
    },
    schema::{CourierConfig, LogsConfig, MediaConfig, RelayConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
