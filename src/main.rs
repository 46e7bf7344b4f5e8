use clap::Parser;
use dotenvy::dotenv;
use pastebin_backend::config::AppConfig;
use pastebin_backend::infrastructure::{database, seed, storage};
use pastebin_backend::services::paste_service::PasteService;
use pastebin_backend::services::storage::StorageService;
use pastebin_backend::services::sweeper::ExpirationSweeper;
use pastebin_backend::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Service type to run (api, worker, all)
    #[arg(short, long, default_value = "all")]
    mode: String,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

fn load_config() -> anyhow::Result<AppConfig> {
    Ok(match std::env::var("APP_ENV").as_deref() {
        Ok("production") => AppConfig::production()?,
        Ok("development") => AppConfig::development(),
        _ => AppConfig::from_env(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pastebin_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if !matches!(args.mode.as_str(), "api" | "worker" | "all") {
        anyhow::bail!("unknown mode '{}', expected api, worker or all", args.mode);
    }

    info!("🚀 Starting Pastebin Backend [Mode: {}]...", args.mode);

    let config = load_config()?;

    let db = database::setup_database(&config.database_url).await?;
    seed::seed_default_settings(&db).await?;
    seed::bootstrap_admin(&db).await?;

    let storage_service: Arc<dyn StorageService> = storage::setup_storage(&config.upload_dir).await?;

    let sweeper = if args.mode == "worker" || args.mode == "all" {
        let pastes = Arc::new(PasteService::new(db.clone(), storage_service.clone()));
        let handle = ExpirationSweeper::new(pastes, Duration::from_secs(config.sweep_interval_secs))
            .spawn();
        info!("👷 Expiration sweeper initialized.");
        Some(handle)
    } else {
        None
    };

    if args.mode == "api" || args.mode == "all" {
        let state = AppState::new(db.clone(), storage_service.clone(), config.clone());

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri().path());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            );

        let app = create_app(state).layer(trace_layer);
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("✅ API Server listening on: http://0.0.0.0:{}", args.port);
        info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        {
            error!("❌ Server runtime error: {}", e);
        }
    } else {
        shutdown_signal().await;
    }

    info!("🛑 Shutting down backend services...");

    if let Some(handle) = sweeper {
        handle.stop().await;
    }

    info!("👋 Backend exited cleanly.");
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
