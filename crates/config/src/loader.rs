use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, overrides::apply_env_overrides, schema::RelayConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["relay.toml", "relay.yaml", "relay.yml", "relay.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<RelayConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./relay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/relay/relay.{toml,yaml,yml,json}` (user-global)
///
/// Returns `RelayConfig::default()` if no config file is found or the file
/// found cannot be parsed.
pub fn discover_and_load() -> RelayConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    RelayConfig::default()
}

/// Resolve the effective configuration.
///
/// An explicit `path` must load; otherwise the standard locations are
/// searched. Environment overrides are applied last.
pub fn load(path: Option<&Path>) -> anyhow::Result<RelayConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/relay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "relay").map(|d| d.config_dir().to_path_buf())
}

pub(crate) fn parse_config(raw: &str, path: &Path) -> anyhow::Result<RelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
