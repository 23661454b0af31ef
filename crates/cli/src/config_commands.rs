use std::path::Path;

use {anyhow::Result, clap::Subcommand, serde_json::Value};

use relay_config::validate::{self, Severity};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration (file, env overrides, defaults).
    Show,
}

pub fn handle_config(action: ConfigAction, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(path, verbose),
        ConfigAction::Show => show(path),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate::validate(path);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults and environment.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

const SECRET_PATHS: &[(&str, &str)] = &[
    ("line", "channel_access_token"),
    ("line", "channel_secret"),
    ("provider", "api_key"),
];

fn show(path: Option<&Path>) -> Result<()> {
    let config = relay_config::load(path)?;
    let mut value = serde_json::to_value(&config)?;
    redact(&mut value);
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn redact(value: &mut Value) {
    for (section, key) in SECRET_PATHS {
        if let Some(field) = value.get_mut(*section).and_then(|s| s.get_mut(*key))
            && !field.is_null()
        {
            *field = Value::String("********".into());
        }
    }
}
