//! docextract: document extraction gateway server.

use std::sync::Arc;

use docextract_core::DocExtractConfig;
use docextract_server::{build_router, spawn_batch_sweeper, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("docextract: document extraction gateway");
    println!();
    println!("Usage: docextract [help]");
    println!();
    println!("Environment:");
    println!("  PORT                               Listen port (default 3003)");
    println!("  DOCEXTRACT_UPSTREAM_URL            Upstream extraction endpoint");
    println!("  DOCEXTRACT_UPSTREAM_TIMEOUT_SECS   Upstream request timeout (default 120)");
    println!("  DOCEXTRACT_PROGRESS_INTERVAL_MS    Batch progress log interval (default 500)");
    println!("  DOCEXTRACT_MAX_UPLOAD_MB           Upload size limit (default 50)");
    println!("  DOCEXTRACT_BATCH_TTL_SECS          Keep settled batches this long (default 3600)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'docextract help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let config = DocExtractConfig::from_env()?;
    let port = config.port;
    info!("Upstream endpoint: {}", config.upstream_url);

    let state = Arc::new(AppState::from_config(config)?);
    spawn_batch_sweeper(state.clone());
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("docextract server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
