//! Bookshelf application library
//!
//! Wires the application modules onto the framework crates: settings from
//! `bookshelf-kernel`, the pool from `bookshelf-db` and the server from
//! `bookshelf-http`.

use std::future::Future;

use anyhow::Context;
use axum::Router;

use bookshelf_db::Pool;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

pub mod modules;

/// A configured service: database pool plus registered modules.
pub struct Application {
    settings: Settings,
    pool: Pool,
    registry: ModuleRegistry,
}

impl Application {
    /// Connect to the database and register every module
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let pool = bookshelf_db::connect(&settings.database)
            .await
            .context("failed to open database")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &settings, pool.clone())
            .context("failed to register modules")?;

        Ok(Self {
            settings,
            pool,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Apply pending migrations, returning how many ran
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let migrations = self.registry.collect_migrations();
        let applied = bookshelf_db::run_migrations(&self.pool, &migrations)
            .await
            .context("failed to run migrations")?;
        tracing::info!(applied, total = migrations.len(), "migrations complete");
        Ok(applied)
    }

    /// The full HTTP router, middlewares included
    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.settings)
    }

    /// Migrate, start the modules and serve until `shutdown` resolves, then
    /// stop the modules and close the pool.
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.migrate().await?;

        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.init_modules(&ctx).await?;
        self.registry.start_modules(&ctx).await?;

        let served = bookshelf_http::start_server(&self.registry, &self.settings, shutdown).await;

        let stopped = self.registry.stop_modules().await;
        self.pool.close().await;
        tracing::info!("database pool closed");

        served?;
        stopped
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
