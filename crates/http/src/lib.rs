//! HTTP server facade for bookshelf with Axum, error handling, and OpenAPI support.

use std::future::{Future, IntoFuture};
use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Router};

use bookshelf_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod router;

use router::RouterBuilder;

/// Serve the registry's modules until `shutdown` resolves.
///
/// After the shutdown signal in-flight requests get `server.shutdown_grace_ms`
/// to finish; connections still open after that are dropped.
pub async fn start_server<F>(
    registry: &ModuleRegistry,
    settings: &Settings,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(registry, settings);
    let address = settings.server.bind_address();

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("shutdown signal received, draining connections");
            let _ = signalled_tx.send(());
        })
        .into_future();
    let mut server = std::pin::pin!(server);

    tokio::select! {
        biased;
        result = &mut server => return result.context("HTTP server failed"),
        Ok(()) = signalled_rx => {}
    }

    let grace = Duration::from_millis(settings.server.shutdown_grace_ms);
    match tokio::time::timeout(grace, server).await {
        Ok(result) => result.context("HTTP server failed")?,
        Err(_) => tracing::warn!(
            grace_ms = settings.server.shutdown_grace_ms,
            "shutdown grace period elapsed, dropping open connections"
        ),
    }

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let mut router_builder = RouterBuilder::new()
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .route("/healthz", get(health_check));

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(module = module_name, "mounting module routes under /{}", module_name);
        router_builder = router_builder.mount_module(module_name, module.routes());
    }

    router_builder.with_openapi(registry).build()
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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
}

async fn health_check() -> &'static str {
    "ok"
}
