//! Process lifecycle: register, init, start, serve, stop.

use anyhow::Context;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build the registry for `settings` and run until Ctrl-C.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let mut registry = ModuleRegistry::new();
    crate::modules::register_all(&mut registry, &settings)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = bookstore_http::start_server(&registry, &settings, shutdown_signal()).await;
    let stopped = registry.stop_all().await;

    served.context("server exited with an error")?;
    stopped
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
