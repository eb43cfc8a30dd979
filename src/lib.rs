//! Bookstore application library
//!
//! Domain modules (authors, books), their errors, and the bootstrap that wires
//! settings, storage, the module registry, and the HTTP server together.

pub mod error;
pub mod modules;

use anyhow::Context;
use bookstore_db::Database;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build a registry holding every domain module, sharing one storage handle
pub fn build_registry(db: &Database) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, db);
    registry
}

/// Run the service until shutdown
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookstore bootstrap starting"
    );

    let db = Database::connect(&settings.database)
        .await
        .context("failed to open database")?;
    let registry = build_registry(&db);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_modules(&ctx).await?;

    let applied = db
        .migrate(&registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, "schema up to date");

    registry.start_modules(&ctx).await?;
    tracing::info!("bookstore bootstrap complete");

    let served = bookstore_http::start_server(&registry, &settings).await;

    registry.stop_modules().await?;
    db.close().await;

    served
}
