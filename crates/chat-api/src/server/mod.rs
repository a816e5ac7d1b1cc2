//! Server setup and initialization
//!
//! Owns the process lifecycle: the event router is spawned while building
//! the state, handed to every writer and to the gateway, and shut down after
//! the HTTP server has stopped accepting requests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use chat_common::{AppConfig, AppError, JwtService};
use chat_core::SnowflakeGenerator;
use chat_db::{
    create_pool, migrations_dir, run_migrations, PgMessageRepository, PgReactionRepository,
};
use chat_realtime::{ConnectionManager, EventRouter, RealtimeState, RouterTask};
use chat_service::ServiceContextBuilder;
use tokio::net::TcpListener;
use tracing::info;

use crate::middleware::{apply_middleware, apply_middleware_with_config};
use crate::routes::{create_router, health_routes};
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let config = state.config();
    let api = apply_middleware_with_config(
        create_router(),
        &config.rate_limit,
        &config.cors,
        config.app.env.is_production(),
    );

    let open = apply_middleware(
        health_routes().merge(chat_realtime::routes(state.realtime().clone())),
    );

    api.merge(open).with_state(state)
}

/// Initialize all dependencies and create AppState.
///
/// The returned [`RouterTask`] must outlive the server; shut it down once
/// the server has returned.
pub async fn create_app_state(config: AppConfig) -> Result<(AppState, RouterTask), AppError> {
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    run_migrations(&pool, &migrations_dir(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    let jwt_service = Arc::new(JwtService::from_config(&config.jwt));
    let snowflake_generator = Arc::new(SnowflakeGenerator::new(config.snowflake.machine_id));

    let (router, router_task) = EventRouter::spawn();
    info!("Event router started");

    let manager = Arc::new(ConnectionManager::new(
        router.clone(),
        config.realtime.max_subscriptions,
    ));
    let realtime = RealtimeState::new(manager, jwt_service, config.realtime.clone());

    let service_context = ServiceContextBuilder::new()
        .message_repo(Arc::new(PgMessageRepository::new(pool.clone())))
        .reaction_repo(Arc::new(PgReactionRepository::new(pool.clone())))
        .publisher(Arc::new(router))
        .snowflake_generator(snowflake_generator)
        .build()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok((AppState::new(service_context, realtime, pool, config), router_task))
}

/// Resolves on Ctrl-C or SIGTERM after asking every live socket to close
pub async fn shutdown_signal(manager: Arc<ConnectionManager>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(
        connections = manager.connection_count(),
        "Shutdown signal received, closing gateway connections"
    );
    manager.close_all();
}

/// Run the HTTP server until `shutdown` resolves
pub async fn run_server<F>(app: Router, addr: SocketAddr, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config.server.address().parse().map_err(|_| {
        chat_common::ConfigError::InvalidValue("SERVER_HOST", config.server.address())
    })?;

    let (state, router_task) = create_app_state(config).await?;
    let shutdown = shutdown_signal(Arc::clone(state.realtime().manager()));

    let app = create_app(state);
    let result = run_server(app, addr, shutdown).await;

    router_task.shutdown().await;
    info!("Event router stopped");

    result
}
