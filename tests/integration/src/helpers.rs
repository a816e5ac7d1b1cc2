//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, making HTTP requests
//! and opening gateway clients.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chat_api::{create_app, create_app_state};
use chat_client::{ClientConfig, ClientEvent, RealtimeClient, ReconnectPolicy};
use chat_common::{AppConfig, JwtService};
use chat_core::{RealtimeEvent, Snowflake, Topic};
use chat_realtime::{ConnectionManager, RouterTask};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Counter for unique test ports
static PORT_COUNTER: AtomicU16 = AtomicU16::new(19000);

/// Get a unique port for testing
pub fn get_test_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    jwt: JwtService,
    manager: Arc<ConnectionManager>,
    _router_task: RouterTask,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        let config = test_config()?;
        Self::start_with_config(config).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let port = get_test_port();
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let jwt = JwtService::from_config(&config.jwt);

        let (state, router_task) = create_app_state(config).await?;
        let manager = Arc::clone(state.realtime().manager());

        let app = create_app(state);

        let listener = TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        // Wait for server to be ready
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            addr: actual_addr,
            client,
            jwt,
            manager,
            _router_task: router_task,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn gateway_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Access token for `user_id`, signed with the server's secret
    pub fn token_for(&self, user_id: Snowflake) -> Result<String> {
        Ok(self.jwt.issue_access_token(user_id)?)
    }

    /// Close every gateway socket as a shutting-down server would
    pub fn drop_gateway_connections(&self) {
        self.manager.close_all();
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a GET request with auth token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        let url = format!("{}/api/v1{}", self.base_url(), path);
        Ok(self.client.get(&url).bearer_auth(token).send().await?)
    }

    /// Make a POST request with auth token
    pub async fn post_auth<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<Response> {
        let url = format!("{}/api/v1{}", self.base_url(), path);
        Ok(self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    /// Make a DELETE request with auth token
    pub async fn delete_auth(&self, path: &str, token: &str) -> Result<Response> {
        let url = format!("{}/api/v1{}", self.base_url(), path);
        Ok(self.client.delete(&url).bearer_auth(token).send().await?)
    }

    /// Gateway client for `user_id` with a short reconnect delay
    pub fn realtime_client(
        &self,
        user_id: Snowflake,
    ) -> Result<(RealtimeClient, UnboundedReceiver<ClientEvent>)> {
        let config = ClientConfig::new(self.gateway_url(), self.token_for(user_id)?)
            .with_reconnect(ReconnectPolicy::new(5, Duration::from_millis(200)));
        Ok(RealtimeClient::connect(config))
    }
}

/// Create a test configuration
pub fn test_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut config =
        AppConfig::from_env().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    // Tests fire requests faster than the production limit allows
    config.rate_limit.requests_per_second = 1000;
    config.rate_limit.burst = 1000;

    Ok(config)
}

/// Helper to check if test environment is available
pub async fn check_test_env() -> bool {
    dotenvy::dotenv().ok();

    for var in ["DATABASE_URL", "JWT_SECRET"] {
        if std::env::var(var).is_err() {
            eprintln!("Skipping test: {var} not set");
            return false;
        }
    }

    true
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(())
}

async fn next_event(events: &mut UnboundedReceiver<ClientEvent>) -> Result<ClientEvent> {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .map_err(|_| anyhow::anyhow!("No gateway event within 5s"))?
        .ok_or_else(|| anyhow::anyhow!("Gateway client stopped"))
}

/// Next domain event, skipping session bookkeeping
pub async fn next_dispatch(events: &mut UnboundedReceiver<ClientEvent>) -> Result<RealtimeEvent> {
    loop {
        if let ClientEvent::Dispatch(event) = next_event(events).await? {
            return Ok(event);
        }
    }
}

/// Wait for the server to acknowledge a subscription
pub async fn wait_subscribed(events: &mut UnboundedReceiver<ClientEvent>) -> Result<Vec<Topic>> {
    loop {
        if let ClientEvent::Subscribed(topics) = next_event(events).await? {
            return Ok(topics);
        }
    }
}

/// Wait for a session to be established
pub async fn wait_ready(events: &mut UnboundedReceiver<ClientEvent>) -> Result<Snowflake> {
    loop {
        if let ClientEvent::Ready(ready) = next_event(events).await? {
            return Ok(ready.user_id);
        }
    }
}

/// Assert that no domain event arrives within `window`
pub async fn assert_quiet(
    events: &mut UnboundedReceiver<ClientEvent>,
    window: Duration,
) -> Result<()> {
    let deadline = tokio::time::Instant::now() + window;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Err(_) | Ok(None) => return Ok(()),
            Ok(Some(ClientEvent::Dispatch(event))) => {
                anyhow::bail!("Unexpected {} event", event.event_type())
            }
            Ok(Some(_)) => {}
        }
    }
}
