//! Backend process launch and health polling.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bookstore_kernel::settings::BackendSettings;
use tokio::process::{Child, Command};

/// Last known reachability of the backend.
#[derive(Debug, Default)]
pub struct BackendHealth {
    healthy: AtomicBool,
}

impl BackendHealth {
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Record a probe result, returning the previous value.
    pub fn set(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::AcqRel)
    }
}

/// Polls the backend's health endpoint and records the result.
#[derive(Clone)]
pub struct Supervisor {
    client: reqwest::Client,
    health_url: String,
    interval: Duration,
    health: Arc<BackendHealth>,
}

impl Supervisor {
    pub fn new(settings: &BackendSettings, health: Arc<BackendHealth>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.probe_timeout_ms))
            .build()
            .context("failed to create health probe client")?;

        Ok(Self {
            client,
            health_url: format!("{}{}", settings.url, settings.health_path),
            interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            health,
        })
    }

    /// One health probe. Any 2xx answer counts as healthy.
    async fn probe(&self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(response) => {
                let healthy = response.status().is_success();
                if !healthy {
                    tracing::debug!(
                        url = %self.health_url,
                        status = %response.status(),
                        "backend answered health probe with an error status"
                    );
                }
                healthy
            }
            Err(err) => {
                tracing::debug!(url = %self.health_url, error = %err, "backend health probe failed");
                false
            }
        }
    }

    /// Probe once and record the result, logging transitions.
    pub async fn poll_once(&self) -> bool {
        let healthy = self.probe().await;
        let was_healthy = self.health.set(healthy);

        match (was_healthy, healthy) {
            (false, true) => tracing::info!(url = %self.health_url, "backend is up"),
            (true, false) => tracing::warn!(url = %self.health_url, "backend went down"),
            _ => {}
        }

        healthy
    }

    /// Poll forever at the configured interval.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}

/// Launch the configured backend command, if any.
///
/// The child is killed when the returned handle is dropped.
pub fn spawn_backend(settings: &BackendSettings) -> anyhow::Result<Option<Child>> {
    let Some(program) = &settings.command else {
        return Ok(None);
    };

    let mut command = Command::new(program);
    command
        .args(&settings.args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    if let Some(workdir) = &settings.workdir {
        command.current_dir(workdir);
    }

    let child = command
        .spawn()
        .with_context(|| format!("failed to launch backend command '{}'", program))?;

    tracing::info!(
        command = %program,
        args = ?settings.args,
        pid = ?child.id(),
        "backend process launched"
    );
    Ok(Some(child))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_set_reports_previous_value() {
        let health = BackendHealth::default();
        assert!(!health.is_healthy());
        assert!(!health.set(true));
        assert!(health.is_healthy());
        assert!(health.set(false));
    }

    #[tokio::test]
    async fn unreachable_backend_is_unhealthy() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let settings = BackendSettings {
            url: format!("http://127.0.0.1:{port}"),
            probe_timeout_ms: 200,
            ..BackendSettings::default()
        };
        let health = Arc::new(BackendHealth::default());
        health.set(true);
        let supervisor = Supervisor::new(&settings, health.clone()).unwrap();

        assert!(!supervisor.poll_once().await);
        assert!(!health.is_healthy());
    }

    #[test]
    fn no_command_means_no_child() {
        assert!(spawn_backend(&BackendSettings::default()).unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_program_fails_to_launch() {
        let settings = BackendSettings {
            command: Some("/nonexistent/bookstore-backend".to_string()),
            ..BackendSettings::default()
        };
        assert!(spawn_backend(&settings).is_err());
    }
}
