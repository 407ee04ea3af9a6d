use std::{sync::Arc, time::Duration as StdDuration};

use anyhow::{Context, Result};
use brokerage_dashboard::{
    account::repo::AccountRepository,
    auth::jwt::decoding_key,
    config::Config,
    dashboard::{service::DashboardService, session::SessionRegistry},
    db::Database,
    server::Server,
};
use chrono::Duration;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("Failed to load config")?;
    let pool = Database::new_pool(&config)
        .await
        .context("Failed to create DB pool")?;
    let key = decoding_key(&config.jwt_public_key).context("Failed to read JWT public key")?;

    let idle_ttl = Duration::seconds(i64::from(config.session_idle_secs));
    let registry = SessionRegistry::new(Arc::new(AccountRepository::new(pool)), idle_ttl);
    let dashboard_svc = Arc::new(
        DashboardService::new(registry, key, config.locale)
            .with_session_records(config.accept_session_records),
    );

    let sweeper = Arc::clone(&dashboard_svc);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = sweeper.registry().sweep();
            if removed > 0 {
                info!(removed, remaining = sweeper.registry().len(), "expired sessions swept");
            }
        }
    });

    let server = Server::new(dashboard_svc);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    server.start(&config.addr, shutdown_rx).await
}
