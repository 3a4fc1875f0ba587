use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crewline_api::config::ServerConfig;
use crewline_api::router::build_app_router;
use crewline_api::state::AppState;
use crewline_api::storage::LocalStorage;
use crewline_events::{DispatcherConfig, EmailConfig, LogMailer, Mailer, OutboxDispatcher, SmtpMailer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for the outbox dispatcher to finish its batch.
const DISPATCHER_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crewline_api=debug,crewline_events=info,tower_http=debug".into());
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    tracing::info!(host = %config.host, port = config.port, "Loaded server configuration");

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = crewline_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    crewline_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    crewline_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Uploads ---
    tokio::fs::create_dir_all(&config.storage.dir)
        .await
        .with_context(|| format!("Failed to create storage dir {}", config.storage.dir.display()))?;
    let storage = Arc::new(LocalStorage::new(
        config.storage.dir.clone(),
        config.storage.public_base_url.clone(),
    ));

    // --- Outbox dispatcher ---
    let mailer: Arc<dyn Mailer> = match EmailConfig::from_env() {
        Some(email_config) => {
            tracing::info!(host = %email_config.smtp_host, "SMTP delivery enabled");
            Arc::new(SmtpMailer::new(email_config).context("Invalid SMTP configuration")?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, outbound email will only be logged");
            Arc::new(LogMailer)
        }
    };
    let dispatcher = OutboxDispatcher::new(
        pool.clone(),
        mailer,
        DispatcherConfig {
            poll_interval: Duration::from_secs(config.outbox_poll_secs),
            ..DispatcherConfig::default()
        },
    );
    let dispatcher_cancel = CancellationToken::new();
    let dispatcher_token = dispatcher_cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_token).await;
    });
    tracing::info!("Outbox dispatcher started");

    // --- App ---
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        storage,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Graceful shutdown ---
    tracing::info!("Server stopped accepting connections, shutting down background services");

    dispatcher_cancel.cancel();
    match tokio::time::timeout(DISPATCHER_SHUTDOWN_GRACE, dispatcher_handle).await {
        Ok(_) => tracing::info!("Outbox dispatcher stopped"),
        Err(_) => tracing::warn!("Outbox dispatcher did not stop in time"),
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
