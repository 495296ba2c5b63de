//! # MongoDB session store for `tower-sessions`
//!
//! Each session is one document in the `sessions` collection:
//!
//! | Field | Content |
//! |-------|---------|
//! | `_id` | the session id (as rendered by [`Id`]'s `Display`) |
//! | `data` | the session's key/value map, JSON encoded |
//! | `expiry_date` | BSON date; loads ignore records past it and a TTL index deletes them |
//!
//! Deleting the document is how a session is revoked, so a signed cookie that still
//! verifies is useless once logout has run.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};

use crate::error::StoreResult;

pub const SESSIONS: &str = "sessions";

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    #[serde(rename = "_id")]
    id: String,
    data: String,
    expiry_date: BsonDateTime,
}

fn to_bson_date(dt: OffsetDateTime) -> BsonDateTime {
    BsonDateTime::from_millis((dt.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn from_bson_date(dt: BsonDateTime) -> session_store::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(dt.timestamp_millis() as i128 * 1_000_000)
        .map_err(|e| session_store::Error::Decode(e.to_string()))
}

/// Session store backed by the `sessions` collection.
#[derive(Clone, Debug)]
pub struct MongoSessionStore {
    collection: Collection<SessionRecord>,
}

impl MongoSessionStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(SESSIONS),
        }
    }

    /// Install the TTL index on `expiry_date`.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        self.collection
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "expiry_date": 1 })
                    .options(
                        IndexOptions::builder()
                            .name("ttl_session".to_string())
                            .expire_after(Duration::ZERO)
                            .build(),
                    )
                    .build(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MongoSessionStore {
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let data = serde_json::to_string(&record.data)
            .map_err(|e| session_store::Error::Encode(e.to_string()))?;
        let stored = SessionRecord {
            id: record.id.to_string(),
            data,
            expiry_date: to_bson_date(record.expiry_date),
        };

        self.collection
            .replace_one(doc! { "_id": stored.id.as_str() }, &stored)
            .upsert(true)
            .await
            .map_err(|e| session_store::Error::Backend(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let found = self
            .collection
            .find_one(doc! {
                "_id": session_id.to_string(),
                "expiry_date": { "$gt": BsonDateTime::now() },
            })
            .await
            .map_err(|e| session_store::Error::Backend(e.to_string()))?;

        let Some(stored) = found else {
            return Ok(None);
        };

        Ok(Some(Record {
            id: *session_id,
            data: serde_json::from_str(&stored.data)
                .map_err(|e| session_store::Error::Decode(e.to_string()))?,
            expiry_date: from_bson_date(stored.expiry_date)?,
        }))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.collection
            .delete_one(doc! { "_id": session_id.to_string() })
            .await
            .map_err(|e| session_store::Error::Backend(e.to_string()))?;
        Ok(())
    }
}
