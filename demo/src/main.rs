//! QuickAPI demo - sample catalogue service.
//!
//! CLI entry point that either serves the application or prints its
//! OpenAPI document.

mod app;
mod items;
mod users;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use common::ServerConfig;

#[derive(Parser)]
#[command(name = "quickapi-demo")]
#[command(about = "Sample catalogue service built on QuickAPI")]
#[command(version)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host address to bind
        #[arg(long, env = "SERVER_HOST")]
        host: Option<String>,
        /// Port to listen on
        #[arg(long, env = "SERVER_PORT")]
        port: Option<u16>,
    },
    /// Print the OpenAPI document
    Openapi {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = ServerConfig::from_env();
    init_tracing(cli.verbose, &config.log_level);
    tracing::debug!(service = %config.service_name, "Configuration loaded");

    let result = match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
        Commands::Openapi { pretty } => print_openapi(pretty),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = app::create_app(app::app_config())?;
    tracing::info!("Starting {} on http://{}", config.service_name, config.addr());
    tracing::info!("Swagger UI: http://{}/docs", config.addr());
    app.serve(&config.addr()).await?;
    Ok(())
}

fn print_openapi(pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let app = app::create_app(app::app_config())?;
    let output = if pretty {
        serde_json::to_string_pretty(app.openapi())?
    } else {
        serde_json::to_string(app.openapi())?
    };
    println!("{}", output);
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(verbose: bool, default_level: &str) {
    let filter = if verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("{},tower_http=debug", default_level))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
