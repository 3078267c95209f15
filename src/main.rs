use anyhow::Context;
use dotenvy::dotenv;
use image_detect_gateway::config::GatewayConfig;
use image_detect_gateway::services::prediction::HttpPredictionService;
use image_detect_gateway::{AppState, create_app};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_detect_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Image Detect Gateway...");

    let config = GatewayConfig::from_env();
    info!(
        "⚙️  Config: Upload Dir={}, Prediction Service={}, Timeout={:?}, CORS Origin={}",
        config.upload_dir.display(),
        config.prediction_url,
        config.prediction_timeout,
        config.cors_origin
    );

    let predictor = Arc::new(
        HttpPredictionService::new(config.prediction_url.clone(), config.prediction_timeout)
            .context("failed to build prediction client")?,
    );

    let state = AppState::new(config.clone(), predictor);
    state.staging.ensure_dir().await.with_context(|| {
        format!(
            "failed to create upload directory {}",
            config.upload_dir.display()
        )
    })?;
    info!("📁 Staging directory: {}", state.staging.dir().display());

    let app = create_app(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("✅ Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
