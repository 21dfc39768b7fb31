use std::sync::Arc;

use contract_expiry_server::{
    config::Config,
    dates::SystemClock,
    db::{self, SqliteContractStore},
    handlers::{self, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contract_expiry_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = db::init_db_pool(&config.database_url).await?;
    let store = Arc::new(SqliteContractStore::new(pool));

    let addr = config.server_addr();
    let state = AppState::new(config, store, Arc::new(SystemClock));
    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting contract expiry server on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
