//! Environment-variable overrides applied on top of the file config.
//!
//! The variable names are the ones the bot has always been deployed with, so
//! an existing `.env` keeps working without a config file.

use {secrecy::Secret, std::str::FromStr, tracing::warn};

use crate::schema::RelayConfig;

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut RelayConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` instead of the process environment.
///
/// Empty values are ignored. Values that fail to parse are logged and skipped.
pub fn apply_env_overrides_with(
    config: &mut RelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("CHANNEL_ACCESS_TOKEN") {
        config.line.channel_access_token = Some(Secret::new(token));
    }
    if let Some(secret) = get("CHANNEL_SECRET") {
        config.line.channel_secret = Some(Secret::new(secret));
    }
    if let Some(key) = get("OPENAI_API_KEY") {
        config.provider.api_key = Some(Secret::new(key));
    }
    if let Some(model) = get("OPENAI_MODEL_ID") {
        config.provider.model = model;
    }
    if let Some(t) =
        get("OPENAI_MODEL_TEMPERATURE").and_then(|v| parse_var("OPENAI_MODEL_TEMPERATURE", &v))
    {
        config.provider.temperature = t;
    }
    if let Some(n) = get("OPENAI_MAX_TOKENS").and_then(|v| parse_var("OPENAI_MAX_TOKENS", &v)) {
        config.provider.max_tokens = n;
    }
    if let Some(port) = get("PORT").and_then(|v| parse_var("PORT", &v)) {
        config.server.port = port;
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(var = name, value, error = %e, "ignoring invalid environment override");
            None
        },
    }
}
