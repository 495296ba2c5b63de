use std::sync::Arc;

use anyhow::Context;
use api::{gateway_router, AppConfig, AuthConfig, DiscordOAuth, GatewayState};
use store::{MongoSessionStore, MongoStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (config, settings) = AppConfig::load().context("Invalid configuration")?;
    let auth = AuthConfig::from_settings(&settings).context("Invalid OAuth configuration")?;
    let config = Arc::new(config);

    let provider =
        DiscordOAuth::new(auth.oauth.clone()).context("Failed to build Discord client")?;

    let db = api::db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database {}", config.database.name);

    let sessions = MongoSessionStore::new(&db);
    let store = Arc::new(MongoStore::new(db));
    let state = GatewayState {
        config: config.clone(),
        auth: Arc::new(auth),
        users: store.clone(),
        states: store,
        provider: Arc::new(provider),
    };

    api::server::serve(gateway_router(state, sessions), config.server.auth_port).await?;
    Ok(())
}
