//! Glimpse CLI - entrypoint for the tracking proxy
//!
//! Parses configuration from flags and GLIMPSE_* environment variables,
//! initializes logging and hands control to the proxy server.

mod commands;

use clap::{Parser, Subcommand};
use commands::ServeCommand;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "GLIMPSE_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full, json
    #[arg(
        long,
        default_value = "compact",
        env = "GLIMPSE_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the tracking proxy server
    Serve(ServeCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.clone();

    // If RUST_LOG is set, use it directly; otherwise use our default filter
    // with the glimpse crates at the requested level and noisy dependencies
    // at warn.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .expect("Invalid RUST_LOG environment variable")
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "glimpse_cli={level},\
             glimpse_core={level},\
             glimpse_analytics={level},\
             glimpse_proxy={level},\
             pingora=warn,\
             pingora_core=warn,\
             pingora_proxy=warn,\
             hyper=warn,\
             reqwest=warn",
            level = log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");

    // Commands are synchronous to be compatible with pingora
    match cli.command {
        Commands::Serve(serve_cmd) => serve_cmd.execute(),
    }
}
