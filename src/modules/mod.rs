pub mod books;

use std::sync::Arc;

use bookshelf_db::Pool;
use bookshelf_kernel::{settings::Settings, ModuleRegistry};

use books::repository::{SqlBookStore, StockPolicy};

/// Build every application module on top of the shared pool and register it
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
    pool: Pool,
) -> anyhow::Result<()> {
    let store = SqlBookStore::new(pool, StockPolicy::from(&settings.books));
    registry.register(books::create_module(Arc::new(store)))?;
    Ok(())
}
