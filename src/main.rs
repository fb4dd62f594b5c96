use std::sync::Arc;

use posts_core::core::database;
use posts_core::{Config, PathIssue, PathMaintenanceService, PgTreeStore, TableNames};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(2);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(
        "Configuration loaded (categories table '{}', posts table '{}')",
        config.posts.tables.categories,
        config.posts.tables.posts
    );

    let pool = database::connect(&config.database).await?;
    if config.posts.tables == TableNames::default() {
        database::migrate(&pool).await?;
    } else {
        tracing::info!("Custom table names configured, skipping bundled migrations");
    }

    let store = Arc::new(PgTreeStore::new(pool, config.posts.tables.clone()));
    let maintenance = PathMaintenanceService::new(store);

    let report = maintenance.verify().await?;
    if report.has_path_issues() {
        let stats = maintenance.rebuild_all().await?;
        tracing::info!(
            "Repaired paths: {} categories and {} posts rewritten",
            stats.categories_updated,
            stats.posts_updated
        );
    }

    for issue in &report.issues {
        match issue {
            PathIssue::DuplicateCategorySlug {
                parent_category_id,
                slug,
            } => tracing::warn!(
                "Duplicate category slug '{}' under parent {:?} needs manual attention",
                slug,
                parent_category_id
            ),
            PathIssue::DuplicatePostSlug { category_id, slug } => tracing::warn!(
                "Duplicate post slug '{}' in category {:?} needs manual attention",
                slug,
                category_id
            ),
            PathIssue::CategoryPath { .. } | PathIssue::PostPath { .. } => {}
        }
    }

    tracing::info!(
        "Checked {} categories and {} posts against {}",
        report.categories_checked,
        report.posts_checked,
        config.posts.app_url
    );

    Ok(())
}
