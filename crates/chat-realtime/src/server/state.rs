//! Gateway state

use crate::connection::ConnectionManager;
use chat_common::{JwtService, RealtimeConfig};
use std::sync::Arc;

/// Shared dependencies of the `/gateway` handler
#[derive(Clone)]
pub struct RealtimeState {
    manager: Arc<ConnectionManager>,
    jwt: Arc<JwtService>,
    config: Arc<RealtimeConfig>,
}

impl RealtimeState {
    pub fn new(manager: Arc<ConnectionManager>, jwt: Arc<JwtService>, config: RealtimeConfig) -> Self {
        Self {
            manager,
            jwt,
            config: Arc::new(config),
        }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}

impl std::fmt::Debug for RealtimeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeState")
            .field("manager", &self.manager)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
