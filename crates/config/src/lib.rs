//! Configuration loading, validation, env substitution and env overrides.
//!
//! Config files: `relay.toml`, `relay.yaml`, `relay.yml` or `relay.json`.
//! Searched in `./` then `~/.config/relay/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod overrides;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load, load_config},
    overrides::{apply_env_overrides, apply_env_overrides_with},
    schema::{
        DeliveryMode, LineConfig, OutboundConfig, ProviderConfig, RelayConfig, ServerConfig,
        SessionsConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_config},
};
