//! Binary entry point for the rental reservation orchestrator.
//!
//! Loads configuration, wires concrete adapters into the runtime and web
//! crates, and runs the HTTP server alongside the outbox dispatcher and
//! reconciliation sweep until a shutdown signal arrives.

mod config;

use anyhow::Context;
use config::Config;
use rental_core::environment::SystemClock;
use rental_gateways::stripe::StripePaymentGateway;
use rental_gateways::supplier::factory::SupplierGatewayFactory;
use rental_postgres::{pool, Conn, PgIdempotencyStore, PgUnitOfWorkFactory};
use rental_runtime::{AvailabilityService, CoordinatorConfig, OutboxDispatcher, ReconciliationSweep, ReservationCommitCoordinator};
use rental_web::{router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env().unwrap_or_else(|err| {
        error!(error = %err, "failed to load configuration");
        std::process::exit(1);
    });

    info!("starting rental reservation orchestrator");

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install prometheus recorder")?;

    let pool = pool::connect(&config.database_url, config.db_pool_size)
        .await
        .context("failed to connect to postgres")?;
    info!(pool_size = config.db_pool_size, "connected to postgres");

    pool::migrate(&pool).await.context("failed to run database migrations")?;
    info!("migrations applied");

    let uow_factory: Arc<dyn rental_core::ports::UnitOfWorkFactory> = Arc::new(PgUnitOfWorkFactory::new(pool.clone()));
    let idempotency: Arc<dyn rental_core::idempotency::IdempotencyStore> =
        Arc::new(PgIdempotencyStore::new(Conn::from_pool(pool.clone())));

    let payment_gateway: Arc<dyn rental_core::ports::PaymentGateway> =
        Arc::new(StripePaymentGateway::new(config.payment_provider_secret_key.clone()));

    let supplier_gateways = Arc::new(SupplierGatewayFactory::new(config.suppliers.clone()));
    info!(supplier_count = config.suppliers.len(), "supplier gateways configured");

    let clock: Arc<dyn rental_core::environment::Clock> = Arc::new(SystemClock);

    let coordinator = Arc::new(ReservationCommitCoordinator::new(
        Arc::clone(&uow_factory),
        Arc::clone(&payment_gateway),
        Arc::clone(&supplier_gateways),
        Arc::clone(&clock),
        CoordinatorConfig { payment_provider_name: "STRIPE".to_string() },
    ));

    let availability = Arc::new(AvailabilityService::new(Arc::clone(&uow_factory), Arc::clone(&supplier_gateways)));

    let state = AppState::new(coordinator, availability, Arc::clone(&uow_factory), Arc::clone(&idempotency));
    let app = router(state);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let dispatcher = OutboxDispatcher::new(Arc::clone(&uow_factory), "rental-orchestrator-1")
        .with_batch_size(config.outbox.batch_size)
        .with_poll_interval(config.outbox.poll_interval);
    let dispatcher_shutdown = shutdown_rx.clone();
    let dispatcher_task = tokio::spawn(async move {
        dispatcher.run(dispatcher_shutdown).await;
    });

    let reconciliation = ReconciliationSweep::new(Arc::clone(&uow_factory), Arc::clone(&clock))
        .with_stuck_threshold(config.reconciliation_stuck_threshold);
    let reconciliation_interval = config.reconciliation_interval;
    let reconciliation_shutdown = shutdown_rx.clone();
    let reconciliation_task = tokio::spawn(async move {
        reconciliation.run(reconciliation_interval, reconciliation_shutdown).await;
    });

    let cleanup_idempotency = Arc::clone(&idempotency);
    let idempotency_ttl = config.idempotency_ttl;
    let cleanup_clock = Arc::clone(&clock);
    let mut cleanup_shutdown = shutdown_rx.clone();
    let cleanup_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                changed = cleanup_shutdown.changed() => {
                    if changed.is_err() || *cleanup_shutdown.borrow() {
                        return;
                    }
                }
                () = tokio::time::sleep(Duration::from_secs(3600)) => {
                    let cutoff = cleanup_clock.now() - chrono::Duration::from_std(idempotency_ttl).unwrap_or(chrono::Duration::days(7));
                    match cleanup_idempotency.cleanup(cutoff).await {
                        Ok(removed) if removed > 0 => info!(removed, "idempotency cleanup swept stale records"),
                        Ok(_) => {}
                        Err(err) => error!(error = %err, "idempotency cleanup failed"),
                    }
                }
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind http listener on {}", config.bind_address))?;
    info!(address = %config.bind_address, "http server listening");

    let mut server_shutdown = shutdown_rx.clone();
    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    let metrics_app =
        axum::Router::new().route("/metrics", axum::routing::get(|| async move { prometheus_handle.render() }));
    let metrics_listener = tokio::net::TcpListener::bind(&config.metrics_address)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", config.metrics_address))?;
    info!(address = %config.metrics_address, "metrics server listening");

    let mut metrics_shutdown = shutdown_rx.clone();
    let metrics_task = tokio::spawn(async move {
        axum::serve(metrics_listener, metrics_app)
            .with_graceful_shutdown(async move {
                let _ = metrics_shutdown.changed().await;
            })
            .await
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining background tasks");
    let _ = shutdown_tx.send(true);

    let _ = server_task.await;
    let _ = metrics_task.await;
    let _ = dispatcher_task.await;
    let _ = reconciliation_task.await;
    let _ = cleanup_task.await;

    info!("shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler, falling back to SIGINT only");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "rental_app=info,rental_runtime=info,rental_web=info".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
