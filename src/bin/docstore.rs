//! docstore server binary
//!
//! # Examples
//!
//! ```bash
//! # Start the HTTP service
//! docstore serve --bind 0.0.0.0 --port 8089
//!
//! # Start with a config file
//! docstore --config docstore.toml serve
//!
//! # Print the effective configuration
//! docstore config
//! ```

use clap::{Args, Parser, Subcommand};
use docstore::config::{AppConfig, LoggingConfig};
use docstore::server::start_server;
use docstore::Storage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// docstore - namespaced document store for agent tools
#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(version = docstore::VERSION)]
#[command(about = "Namespaced in-memory document store for agent tools", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "DOCSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log directory path; enables daily rolling log files
    #[arg(long, global = true, env = "DOCSTORE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP service
    Serve(ServeArgs),

    /// Print the effective configuration as TOML
    Config,

    /// Show version
    Version,
}

/// Server configuration arguments
#[derive(Args, Debug)]
struct ServeArgs {
    /// HTTP bind address
    #[arg(short, long, env = "DOCSTORE_BIND")]
    bind: Option<String>,

    /// HTTP port
    #[arg(short, long, env = "DOCSTORE_PORT")]
    port: Option<u16>,

    /// Disable CORS
    #[arg(long)]
    no_cors: bool,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Maximum request body size (MB)
    #[arg(long)]
    max_body_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Serve(args) => {
            setup_logging(&config.logging)?;
            serve_command(config, args).await
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Version => {
            println!("docstore {}", docstore::VERSION);
            Ok(())
        }
    }
}

/// Load configuration and apply global flags
fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.logging.log_dir = Some(dir.clone());
    }
    if cli.no_color {
        config.logging.ansi = false;
    }
    Ok(config)
}

/// Setup logging with console output and optional rolling files
fn setup_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let log_level = config
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "docstore.log");
            Some(fmt::layer().with_writer(file_appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(config.ansi),
        )
        .with(file_layer)
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// Serve command - build the store and start the HTTP service
async fn serve_command(mut config: AppConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.http_addr = bind;
    }
    if let Some(port) = args.port {
        config.server.http_port = port;
    }
    if args.no_cors {
        config.server.enable_cors = false;
    }
    if let Some(timeout) = args.timeout {
        config.server.timeout_secs = timeout;
    }
    if let Some(mb) = args.max_body_size {
        config.server.max_body_size = mb * 1024 * 1024;
    }

    info!(version = %docstore::VERSION, "docstore starting");

    let storage = Arc::new(Storage::in_memory(config.store.clone())?);
    info!(
        default_query_limit = config.store.default_query_limit,
        max_query_limit = config.store.max_query_limit,
        max_payload_bytes = config.store.max_payload_bytes,
        "In-memory store initialized"
    );

    start_server(config.server, storage).await
}
