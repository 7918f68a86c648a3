//! Standalone curation executor process.
//!
//! Connects to the same database and file store as the API, registers the
//! stock handlers, and drains the job queue until SIGINT/SIGTERM. Any
//! number of executor processes can run side by side.

use std::sync::Arc;

use cohort_executor::{default_registry, CurationLoop, JobDispatcher, PollConfig};
use cohort_storage::StoreConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cohort_executor=debug,cohort_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = cohort_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    cohort_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    cohort_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let store_config = StoreConfig::from_env().expect("Invalid file store configuration");
    let store = store_config.build().await.expect("Failed to initialise file store");

    let dispatcher = Arc::new(JobDispatcher::new(default_registry(pool.clone(), store)));
    let bus = Arc::new(cohort_events::EventBus::default());
    let config = PollConfig::from_env();
    let curation_loop = CurationLoop::new(pool, dispatcher, bus, config);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            cancel.cancel();
        });
    }

    curation_loop.run(cancel).await;
    tracing::info!("Executor stopped");
}

/// Wait for a termination signal to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
