//! Configuration validation.
//!
//! Reports syntax errors, unknown/misspelled fields and settings that would
//! make the relay misbehave (missing credentials, limits LINE rejects).

use std::path::{Path, PathBuf};

use crate::{
    env_subst::substitute_env, loader, overrides::apply_env_overrides, schema::RelayConfig,
};

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

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "missing-credential", "range"
    pub category: &'static str,
    /// Dotted path, e.g. "outbound.max_segment_length"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
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

/// Fields accepted in each section.
const KNOWN_FIELDS: &[(&str, &[&str])] = &[
    ("server", &["bind", "port"]),
    ("line", &[
        "channel_access_token",
        "channel_secret",
        "api_base",
        "request_timeout_secs",
    ]),
    ("outbound", &[
        "max_segment_length",
        "dispatch_interval_ms",
        "max_segments_per_call",
        "delivery_mode",
        "max_consecutive_failures",
        "reply_token_max_uses",
        "push_fallback",
        "sentence_terminators",
    ]),
    ("provider", &[
        "api_key",
        "base_url",
        "model",
        "temperature",
        "max_tokens",
        "timeout_secs",
        "apology_text",
        "empty_reply_text",
    ]),
    ("sessions", &["idle_ttl_secs", "sweep_interval_secs"]),
];

/// LINE accepts at most this many message objects per reply/push call.
const LINE_MAX_MESSAGES_PER_CALL: usize = 5;
/// LINE rejects text messages longer than this.
const LINE_MAX_TEXT_LENGTH: usize = 5000;

/// Validate the config file at `path` (or the discovered one), with env
/// overrides applied before the semantic checks.
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(loader::find_config_file);

    let Some(ref actual_path) = config_path else {
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config);
        let mut result = validate_config(&config);
        result.diagnostics.insert(
            0,
            Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            ),
        );
        return result;
    };

    let raw = match std::fs::read_to_string(actual_path) {
        Ok(raw) => substitute_env(&raw),
        Err(e) => {
            return ValidationResult {
                diagnostics: vec![Diagnostic::new(
                    Severity::Error,
                    "file-ref",
                    "",
                    format!("failed to read {}: {e}", actual_path.display()),
                )],
                config_path,
            };
        },
    };

    let mut result = validate_str(&raw, actual_path);
    result.config_path = config_path;
    result
}

/// Validate raw config text; the extension of `path` selects the format.
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value = match parse_value(raw, path) {
        Ok(value) => value,
        Err(message) => {
            diagnostics.push(Diagnostic::new(Severity::Error, "syntax", "", message));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };
    check_unknown_fields(&value, &mut diagnostics);

    let mut config = match loader::parse_config(raw, path) {
        Ok(config) => config,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "type-error",
                "",
                e.to_string(),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };
    apply_env_overrides(&mut config);
    diagnostics.extend(validate_config(&config).diagnostics);

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Semantic checks on an already-parsed config.
pub fn validate_config(config: &RelayConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    let mut push = |severity: Severity,
                    category: &'static str,
                    path: &str,
                    message: String| {
        diagnostics.push(Diagnostic::new(severity, category, path, message));
    };

    if config.line.channel_secret.is_none() {
        push(
            Severity::Error,
            "missing-credential",
            "line.channel_secret",
            "channel secret is required to verify webhook signatures (set CHANNEL_SECRET)".into(),
        );
    }
    if config.line.channel_access_token.is_none() {
        push(
            Severity::Error,
            "missing-credential",
            "line.channel_access_token",
            "channel access token is required to reply (set CHANNEL_ACCESS_TOKEN)".into(),
        );
    }
    if config.provider.api_key.is_none() {
        push(
            Severity::Warning,
            "missing-credential",
            "provider.api_key",
            "no provider API key; generated replies will fall back to the apology text".into(),
        );
    }

    let out = &config.outbound;
    if out.max_segment_length == 0 {
        push(
            Severity::Error,
            "range",
            "outbound.max_segment_length",
            "must be at least 1".into(),
        );
    } else if out.max_segment_length > LINE_MAX_TEXT_LENGTH {
        push(
            Severity::Warning,
            "range",
            "outbound.max_segment_length",
            format!("LINE rejects text messages over {LINE_MAX_TEXT_LENGTH} characters"),
        );
    }
    if out.dispatch_interval_ms == 0 {
        push(
            Severity::Error,
            "range",
            "outbound.dispatch_interval_ms",
            "must be at least 1".into(),
        );
    }
    if !(1..=LINE_MAX_MESSAGES_PER_CALL).contains(&out.max_segments_per_call) {
        push(
            Severity::Error,
            "range",
            "outbound.max_segments_per_call",
            format!("must be between 1 and {LINE_MAX_MESSAGES_PER_CALL}"),
        );
    }
    if out.reply_token_max_uses == 0 {
        push(
            Severity::Error,
            "range",
            "outbound.reply_token_max_uses",
            "must be at least 1".into(),
        );
    }
    if out.max_consecutive_failures == 0 {
        push(
            Severity::Error,
            "range",
            "outbound.max_consecutive_failures",
            "must be at least 1".into(),
        );
    }
    if out.sentence_terminators.contains('\n') {
        push(
            Severity::Warning,
            "range",
            "outbound.sentence_terminators",
            "newline is always a boundary and need not be listed".into(),
        );
    }

    if !(0.0..=2.0).contains(&config.provider.temperature) {
        push(
            Severity::Warning,
            "range",
            "provider.temperature",
            "expected a value between 0.0 and 2.0".into(),
        );
    }
    if config.sessions.sweep_interval_secs == 0 {
        push(
            Severity::Error,
            "range",
            "sessions.sweep_interval_secs",
            "must be at least 1".into(),
        );
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn parse_value(raw: &str, path: &Path) -> Result<serde_json::Value, String> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    match ext {
        "toml" => toml::from_str::<toml::Value>(raw)
            .map_err(|e| format!("TOML syntax error: {e}"))
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str::<serde_yaml::Value>(raw)
            .map_err(|e| format!("YAML syntax error: {e}"))
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| format!("JSON syntax error: {e}")),
        _ => Err(format!("unsupported config format: .{ext}")),
    }
}

fn check_unknown_fields(value: &serde_json::Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(root) = value.as_object() else {
        return;
    };
    for (section, body) in root {
        let Some((_, fields)) = KNOWN_FIELDS.iter().find(|(name, _)| *name == section.as_str()) else {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "unknown-field",
                section.clone(),
                format!("unknown section `{section}`"),
            ));
            continue;
        };
        let Some(body) = body.as_object() else {
            continue;
        };
        for key in body.keys() {
            if !fields.contains(&key.as_str()) {
                diagnostics.push(Diagnostic::new(
                    Severity::Warning,
                    "unknown-field",
                    format!("{section}.{key}"),
                    format!("unknown field `{key}` in [{section}]"),
                ));
            }
        }
    }
}
