//! Application state
//!
//! Holds the shared state for the Axum application: the service context,
//! the realtime gateway state and configuration.

use std::sync::Arc;

use chat_common::{AppConfig, JwtService};
use chat_db::PgPool;
use chat_realtime::{EventRouter, RealtimeState};
use chat_service::ServiceContext;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    service_context: Arc<ServiceContext>,
    realtime: RealtimeState,
    pool: PgPool,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        service_context: ServiceContext,
        realtime: RealtimeState,
        pool: PgPool,
        config: AppConfig,
    ) -> Self {
        Self {
            service_context: Arc::new(service_context),
            realtime,
            pool,
            config: Arc::new(config),
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Get the gateway state (connection manager, token verifier)
    pub fn realtime(&self) -> &RealtimeState {
        &self.realtime
    }

    /// The process-wide event router
    pub fn event_router(&self) -> &EventRouter {
        self.realtime.manager().router()
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Token verifier shared with the gateway
    pub fn jwt_service(&self) -> &JwtService {
        self.realtime.jwt()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service_context", &"ServiceContext")
            .field("realtime", &self.realtime)
            .field("config", &"AppConfig")
            .finish_non_exhaustive()
    }
}
