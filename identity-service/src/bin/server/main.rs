use std::sync::Arc;

use auth::Authenticator;
use identity_service::config::Config;
use identity_service::domain::identity::ports::IdentityRepository;
use identity_service::domain::identity::ports::IdentityServicePort;
use identity_service::domain::identity::service::IdentityService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::repositories;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        storage = if config.uses_database() { "postgresql" } else { "file" },
        access_token_ttl_hours = config.jwt.expiration_hours,
        refresh_token_ttl_hours = config.refresh.ttl_hours,
        "Configuration loaded"
    );

    let repository: Arc<dyn IdentityRepository> = repositories::connect(&config).await?;

    let authenticator = Arc::new(Authenticator::new(
        config.jwt.secret.as_bytes(),
        config.access_token_ttl(),
    ));
    let identity_service = Arc::new(IdentityService::new(
        Arc::clone(&repository),
        authenticator,
        config.refresh_token_ttl(),
    ));

    let sweeper = tokio::spawn(sweep_expired_refresh_tokens(
        Arc::clone(&identity_service),
        config.sweep_interval(),
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(identity_service);
    let served = axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();

    if let Err(e) = repository.close().await {
        tracing::error!(error = %e, "Failed to close storage");
    }

    served?;
    tracing::info!("Server exited successfully");

    Ok(())
}

async fn sweep_expired_refresh_tokens(
    identity_service: Arc<IdentityService<dyn IdentityRepository>>,
    period: std::time::Duration,
) {
    let mut interval = tokio::time::interval(period);
    // First tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        identity_service.sweep_expired_refresh_tokens().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
