use clap::Parser;
use dotenvy::dotenv;
use pdf_compress_service::config::ServiceConfig;
use pdf_compress_service::infrastructure::storage;
use pdf_compress_service::services::compressor::GhostscriptCompressor;
use pdf_compress_service::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_compress_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting PDF compression service...");

    // 2. Configuration. Nothing is bound until this succeeds.
    let mut config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    config.ensure_tmp_dir().await?;

    info!(
        "🛡️  Limits: input={}MB, output={}MB, preset={}, tmp={}",
        config.max_input_mb,
        config.max_output_mb,
        config.compression_preset,
        config.tmp_dir.display()
    );

    // 3. Collaborators
    let storage_service = storage::setup_storage(&config.storage).await?;
    let compressor = Arc::new(GhostscriptCompressor::new(config.ghostscript_bin.clone()));
    let port = config.port;
    let state = AppState::new(config, compressor, storage_service);

    // 4. Serve
    let app = create_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ PDF compressor service listening on port {}", port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Service exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
