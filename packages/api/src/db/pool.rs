//! MongoDB client construction.

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, Database};
use store::{MongoSessionStore, MongoStore, StoreError};
use tracing::{error, info};

use crate::config::DatabaseConfig;

/// Driver options: short selection timeout, a warm pool, stable API v1.
pub async fn client_options(config: &DatabaseConfig) -> Result<ClientOptions, StoreError> {
    let mut options = ClientOptions::parse(&config.uri).await.map_err(|_| {
        // The URI embeds credentials; never echo it.
        StoreError::Backend("MongoDB configuration error".to_string())
    })?;

    options.app_name = Some(config.app_name.clone());
    options.server_selection_timeout = Some(Duration::from_millis(3000));
    options.connect_timeout = Some(Duration::from_millis(5000));
    options.max_pool_size = Some(100);
    options.min_pool_size = Some(20);
    options.max_idle_time = Some(Duration::from_millis(60000));
    options.retry_writes = Some(false);
    options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());

    Ok(options)
}

/// Connect, ping and prepare indexes.
pub async fn connect(config: &DatabaseConfig) -> Result<Database, StoreError> {
    let options = client_options(config).await?;
    let client = Client::with_options(options)?;
    let db = client.database(&config.name);

    if db.run_command(doc! { "ping": 1 }).await.is_err() {
        // Selection errors list the topology; keep addresses out of the logs.
        error!("MongoDB ping failed");
        return Err(StoreError::Backend("Connection failure".to_string()));
    }
    info!("Successfully connected to MongoDB");

    MongoStore::new(db.clone()).ensure_indexes().await?;
    MongoSessionStore::new(&db).ensure_indexes().await?;

    Ok(db)
}
