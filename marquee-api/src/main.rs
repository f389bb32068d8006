use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use marquee_api::{app, AppState, AuthConfig};
use marquee_core::{InMemoryPenaltyLedger, PenaltyLedger, SettlementGateway, Show, ShowRepository};
use marquee_engine::{
    run_expiry_sweeper, CircuitBreaker, GuardedSettlement, MockSettlementGateway, ReservationEngine,
    ReservationPolicy,
};
use marquee_store::app_config::{Config, SettlementMode, StorageBackend};
use marquee_store::{DbClient, InMemoryShowRepository, PostgresShowRepository, RedisClient, RedisPenaltyLedger};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_api=debug,marquee_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Marquee API on port {}", config.server.port);

    let redis = match &config.storage.redis_url {
        Some(url) => Some(
            RedisClient::new(url)
                .await
                .context("Failed to connect to Redis")?,
        ),
        None => None,
    };

    let shows: Arc<dyn ShowRepository> = match config.storage.backend {
        StorageBackend::Memory => Arc::new(InMemoryShowRepository::new()),
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .as_deref()
                .context("storage.database_url is required for the postgres backend")?;
            let db = DbClient::new(url).await.context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PostgresShowRepository::new(db.pool.clone()))
        }
    };

    let ledger: Arc<dyn PenaltyLedger> = match &redis {
        Some(client) => Arc::new(RedisPenaltyLedger::new(client.clone())),
        None => {
            tracing::warn!("No redis_url configured, fines are kept in memory");
            Arc::new(InMemoryPenaltyLedger::new())
        }
    };

    let gateway = match config.settlement.mode {
        SettlementMode::Approve => MockSettlementGateway::approving(),
        SettlementMode::Decline => MockSettlementGateway::declining(),
    };
    let settlement: Arc<dyn SettlementGateway> = Arc::new(GuardedSettlement::new(
        Arc::new(gateway),
        CircuitBreaker::new(
            "settlement",
            config.settlement.circuit_failure_threshold,
            Duration::from_secs(config.settlement.circuit_reset_seconds),
        ),
    ));

    let rules = &config.business_rules;
    let policy = ReservationPolicy {
        hold_duration: chrono::Duration::seconds(rules.seat_hold_seconds as i64),
        abandon_fine: rules.abandon_fine,
        fine_threshold: rules.fine_threshold,
        fine_policy: rules.fine_policy,
        allow_direct_booking: rules.allow_direct_booking,
        max_write_attempts: rules.max_write_attempts,
        currency: rules.currency.clone(),
        ..ReservationPolicy::default()
    };

    let engine = Arc::new(ReservationEngine::new(shows, ledger, settlement, policy));

    for seed in &config.seed_shows {
        let rows: Vec<&str> = seed.rows.iter().map(String::as_str).collect();
        let mut show = Show::new(&seed.venue_name, &seed.show_time, seed.price).with_grid(&rows, seed.cols);
        if let Some(id) = seed.id {
            show.id = id;
        }
        match engine.show(show.id).await {
            Ok(_) => {
                tracing::debug!("Seed show {} already present", show.id);
                continue;
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        let show = engine.create_show(show).await?;
        tracing::info!("Seeded show {} ({} at {})", show.id, show.venue_name, show.show_time);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(run_expiry_sweeper(
        engine.clone(),
        Duration::from_secs(rules.sweep_interval_seconds),
        shutdown_rx,
    ));

    let app_state = AppState {
        engine,
        redis: redis.map(Arc::new),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    sweeper.await?;

    Ok(())
}
