use std::sync::Arc;

use anyhow::Context;
use api::{notes_router, AppConfig, NotesState};
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

    let (config, _) = AppConfig::load().context("Invalid configuration")?;
    let config = Arc::new(config);

    let db = api::db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database {}", config.database.name);

    let sessions = MongoSessionStore::new(&db);
    let state = NotesState {
        config: config.clone(),
        documents: Arc::new(MongoStore::new(db)),
    };

    api::server::serve(notes_router(state, sessions), config.server.notes_port).await?;
    Ok(())
}
