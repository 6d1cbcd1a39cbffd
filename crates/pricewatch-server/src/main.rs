mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use pricewatch_db::{PgJobStore, PgProductStore};
use pricewatch_scraper::TrackerSettings;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    scheduler::BatchRunner,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pricewatch_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pricewatch_db::PoolConfig::from_app_config(&config);
    let pool = pricewatch_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = pricewatch_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let products = Arc::new(PgProductStore::new(pool.clone()));
    let dispatcher = Arc::new(pricewatch_scraper::build_dispatcher(&config, products));
    let tracker = TrackerSettings::from_app_config(&config);

    let runner = BatchRunner::new(
        Arc::clone(&dispatcher),
        config.tracked_products_path.clone(),
        tracker,
    );
    tracing::info!(
        path = %runner.tracked_products_path().display(),
        "scheduled tracking reads products from file"
    );
    let _scheduler = scheduler::build_scheduler(runner, &config.tracking_schedule).await?;

    let app = build_app(AppState {
        dispatcher,
        jobs: Arc::new(PgJobStore::new(pool.clone())),
        tracker,
        pool: Some(pool),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "pricewatch server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
