use async_trait::async_trait;
use axum::Router;

/// Context handed to modules during the init and start phases
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Schema change contributed by a module.
///
/// `up` is executed once per `(module, id)` pair; the id is recorded by the
/// migration runner so a restarted service skips it.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// A self-contained feature plugged into the service
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module, also its route prefix
    fn name(&self) -> &'static str;

    /// Called during startup, after migrations have been applied
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes
    /// Routes will be mounted under `/{module_name}`
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON
    /// Will be merged with other modules' specs
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Return migrations contributed by this module
    /// Migrations are executed in the order returned
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Called once init has completed for every module
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during shutdown, after the HTTP server has drained
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
