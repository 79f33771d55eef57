//! Satchel Web Server
//!
//! Demo server for satchel sessions.

use clap::Parser;
use satchel_core::{init_logging, LoggingConfig};
use satchel_web::server::SatchelServerBuilder;
use satchel_web::WebConfig;
use tracing::{error, info};

/// Satchel Web Server - per-request sessions over cookies and a server-side cache
#[derive(Parser)]
#[command(name = "satchel-web")]
#[command(about = "Demo server for satchel sessions")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Session settings file (TOML)
    #[arg(long)]
    settings: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&LoggingConfig::with_level(&args.log_level)) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut config = WebConfig::from_env();
    config.host = args.host;
    config.port = args.port;
    config.dev_mode = args.dev;
    if args.settings.is_some() {
        config.settings_path = args.settings;
    }

    let server = match SatchelServerBuilder::new().config(config).build() {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }

    info!("Server shut down");
}
