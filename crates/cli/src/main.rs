mod config_commands;
mod segment_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "relay", about = "Relay: LINE chat bot with paced, segmented replies")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (default: discovered relay.toml/yaml/json).
    #[arg(long, global = true, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config and PORT).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server (default when no subcommand is provided).
    Serve,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Split text the way a reply would be split.
    Segment(segment_commands::SegmentArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
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

    match cli.command {
        // Default: start the server when no subcommand is provided
        None | Some(Commands::Serve) => {
            info!(version = env!("CARGO_PKG_VERSION"), "relay starting");
            let mut config = relay_config::load(cli.config.as_deref())?;

            // CLI args override config values
            if let Some(bind) = cli.bind {
                config.server.bind = bind;
            }
            if let Some(port) = cli.port {
                config.server.port = port;
            }

            let report = relay_config::validate_config(&config);
            for d in &report.diagnostics {
                tracing::warn!(severity = %d.severity, path = %d.path, "{}", d.message);
            }
            if report.has_errors() {
                anyhow::bail!("configuration has errors, run `relay config check` for details");
            }

            relay_gateway::start_server(config).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
        Some(Commands::Segment(args)) => {
            let config = relay_config::load(cli.config.as_deref())?;
            segment_commands::handle_segment(args, &config.outbound)
        },
    }
}
