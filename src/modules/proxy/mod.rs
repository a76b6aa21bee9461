pub mod forward;
pub mod supervisor;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{routing::any, routing::get, Router};
use bookstore_kernel::{settings::BackendSettings, InitCtx, Module};
use tokio::{process::Child, sync::Mutex, task::JoinHandle};

use forward::ProxyState;
use supervisor::{BackendHealth, Supervisor};

/// Serves `/api/books` by forwarding to an external implementation of the
/// same API.
///
/// Registered under the `books` name in place of the store-backed module.
pub struct ProxyModule {
    settings: BackendSettings,
    state: ProxyState,
    health: Arc<BackendHealth>,
    supervisor: Supervisor,
    poller: Mutex<Option<JoinHandle<()>>>,
    backend: Mutex<Option<Child>>,
}

impl ProxyModule {
    pub fn new(settings: &BackendSettings) -> anyhow::Result<Self> {
        let health = Arc::new(BackendHealth::default());
        Ok(Self {
            settings: settings.clone(),
            state: ProxyState::new(settings, health.clone())?,
            supervisor: Supervisor::new(settings, health.clone())?,
            health,
            poller: Mutex::new(None),
            backend: Mutex::new(None),
        })
    }

    pub fn health(&self) -> &Arc<BackendHealth> {
        &self.health
    }

    /// Probe the backend once outside the polling schedule.
    pub async fn check_backend(&self) -> bool {
        self.supervisor.poll_once().await
    }
}

#[async_trait]
impl Module for ProxyModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            backend = %self.settings.url,
            "proxy module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", any(forward::forward))
            .route("/{*path}", any(forward::forward))
            .with_state(self.state.clone())
    }

    fn root_routes(&self) -> Router {
        Router::new()
            .route("/api-status", get(forward::api_status))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let mut fragment = super::books::openapi::fragment();
        fragment["root_paths"] = serde_json::json!({
            "/api-status": {
                "get": {
                    "summary": "Backend status",
                    "tags": ["Proxy"],
                    "responses": {
                        "200": {
                            "description": "Whether the backend is reachable",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "status": { "type": "string", "enum": ["running", "starting"] },
                                            "message": { "type": "string" }
                                        },
                                        "required": ["status", "message"]
                                    }
                                }
                            }
                        }
                    }
                }
            }
        });
        Some(fragment)
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        *self.backend.lock().await = supervisor::spawn_backend(&self.settings)?;

        let poller = tokio::spawn(self.supervisor.clone().run());
        *self.poller.lock().await = Some(poller);

        tracing::info!(
            module = self.name(),
            health_url = %format!("{}{}", self.settings.url, self.settings.health_path),
            "backend health polling started"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some(poller) = self.poller.lock().await.take() {
            poller.abort();
        }

        if let Some(mut child) = self.backend.lock().await.take() {
            if let Err(err) = child.kill().await {
                tracing::warn!(error = %err, "failed to kill backend process");
            }
        }

        self.health.set(false);
        tracing::info!(module = self.name(), "proxy module stopped");
        Ok(())
    }
}

/// Create a proxy module for the configured backend
pub fn create_module(settings: &BackendSettings) -> anyhow::Result<Arc<dyn Module>> {
    Ok(Arc::new(ProxyModule::new(settings)?))
}
