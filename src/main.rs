use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use billing::auth::identity::IdentityProvider;
use billing::config::Config;
use billing::render::Templates;
use billing::store::{self, AppState};
use billing::web;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("BILLING_LOG").unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().json())
        .init();

    let cfg = Config::load();

    // Connect to Postgres and run migrations
    let pool = store::pool::connect(&cfg.database_url).await?;

    let blobs = store::blob_operator(&cfg)?;
    tracing::info!(bucket = %cfg.blob_bucket, dev_mode = cfg.dev_mode, "blob store ready");

    let identity = IdentityProvider::from_config(&cfg)?;
    if cfg.admin_emails.is_empty() {
        tracing::warn!("BILLING_ADMIN_EMAILS is empty, admin pages are unreachable");
    }

    let state = AppState {
        pool,
        blobs,
        templates: Arc::new(Templates::load()),
        identity: Arc::new(identity),
        config: Arc::new(cfg.clone()),
    };

    let app = axum::Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .merge(web::router(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = cfg.listen.parse()?;
    tracing::info!(%addr, "starting billing");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("billing stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
