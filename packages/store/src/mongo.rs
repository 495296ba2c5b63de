//! # MongoDB backend
//!
//! [`MongoStore`] implements every storage trait on top of a MongoDB [`Database`].
//!
//! Collections map to documents like this:
//!
//! | Collection | `_id` | Other fields |
//! |------------|-------|--------------|
//! | `notes`, `pages` | UUID v4 string | `kind`, `owner_id`, `title`, `content`, `created_at`, `updated_at` |
//! | `user_notes` | Discord id | `content`, `created_at`, `updated_at` |
//! | `users` | Discord id | profile fields, `token`, `created_at`, `updated_at` |
//! | `oauth_states` | state token | `pkce_verifier`, `continue`, `created_at`, `expires_at` |
//!
//! Upserts use `$set` + `$setOnInsert` so `created_at` survives updates. The state
//! token is consumed with `find_one_and_delete`, which is atomic on the server, and
//! [`MongoStore::ensure_indexes`] installs TTL indexes so expired states disappear
//! without a sweeper task.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, DateTime as BsonDateTime, Document as BsonDocument};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    DiscordProfile, Document, DocumentKind, DocumentPatch, DocumentQuery, NewDocument,
    OAuthState, ProviderToken, UserNote, UserProfile,
};
use crate::repo::{DocumentStore, StateStore, UserStore};

pub const USER_NOTES: &str = "user_notes";
pub const USERS: &str = "users";
pub const OAUTH_STATES: &str = "oauth_states";

pub(crate) fn to_bson_date(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

pub(crate) fn from_bson_date(dt: BsonDateTime) -> StoreResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
        .ok_or_else(|| StoreError::Serialization(format!("timestamp out of range: {dt}")))
}

#[derive(Debug, Serialize, Deserialize)]
struct DocumentRecord {
    #[serde(rename = "_id")]
    id: String,
    kind: DocumentKind,
    owner_id: String,
    title: Option<String>,
    content: String,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl DocumentRecord {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            kind: doc.kind,
            owner_id: doc.owner_id.clone(),
            title: doc.title.clone(),
            content: doc.content.clone(),
            created_at: to_bson_date(doc.created_at),
            updated_at: to_bson_date(doc.updated_at),
        }
    }

    fn into_document(self) -> StoreResult<Document> {
        Ok(Document {
            id: self.id,
            kind: self.kind,
            owner_id: self.owner_id,
            title: self.title,
            content: self.content,
            created_at: from_bson_date(self.created_at)?,
            updated_at: from_bson_date(self.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserNoteRecord {
    #[serde(rename = "_id")]
    user_id: String,
    content: String,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl UserNoteRecord {
    fn into_note(self) -> StoreResult<UserNote> {
        Ok(UserNote {
            user_id: self.user_id,
            content: self.content,
            created_at: from_bson_date(self.created_at)?,
            updated_at: from_bson_date(self.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    #[serde(rename = "_id")]
    discord_id: String,
    username: String,
    global_name: Option<String>,
    avatar: Option<String>,
    discriminator: Option<String>,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl UserRecord {
    fn into_profile(self) -> StoreResult<UserProfile> {
        Ok(UserProfile {
            discord_id: self.discord_id,
            username: self.username,
            global_name: self.global_name,
            avatar: self.avatar,
            discriminator: self.discriminator,
            created_at: from_bson_date(self.created_at)?,
            updated_at: from_bson_date(self.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
    #[serde(rename = "_id")]
    state: String,
    pkce_verifier: String,
    #[serde(rename = "continue")]
    continue_to: Option<String>,
    created_at: BsonDateTime,
    expires_at: BsonDateTime,
}

impl StateRecord {
    fn into_state(self) -> StoreResult<OAuthState> {
        Ok(OAuthState {
            state: self.state,
            pkce_verifier: self.pkce_verifier,
            continue_to: self.continue_to,
            created_at: from_bson_date(self.created_at)?,
            expires_at: from_bson_date(self.expires_at)?,
        })
    }
}

/// MongoDB implementation of [`DocumentStore`], [`UserStore`] and [`StateStore`].
#[derive(Clone, Debug)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn documents(&self, kind: DocumentKind) -> Collection<DocumentRecord> {
        self.db.collection(kind.collection())
    }

    fn user_notes(&self) -> Collection<UserNoteRecord> {
        self.db.collection(USER_NOTES)
    }

    fn users(&self) -> Collection<UserRecord> {
        self.db.collection(USERS)
    }

    fn states(&self) -> Collection<StateRecord> {
        self.db.collection(OAUTH_STATES)
    }

    /// Create the unique, sort and TTL indexes every collection relies on.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        for kind in [DocumentKind::Note, DocumentKind::Page] {
            self.documents(kind)
                .create_index(
                    IndexModel::builder()
                        .keys(doc! { "owner_id": 1, "updated_at": -1 })
                        .options(
                            IndexOptions::builder()
                                .name("idx_owner_updated_desc".to_string())
                                .build(),
                        )
                        .build(),
                )
                .await?;
        }

        self.user_notes()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "updated_at": -1 })
                    .options(
                        IndexOptions::builder()
                            .name("idx_updated_at_desc".to_string())
                            .build(),
                    )
                    .build(),
            )
            .await?;

        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "updated_at": -1 })
                    .options(
                        IndexOptions::builder()
                            .name("idx_user_updated_desc".to_string())
                            .build(),
                    )
                    .build(),
            )
            .await?;

        self.states()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "expires_at": 1 })
                    .options(
                        IndexOptions::builder()
                            .name("ttl_state".to_string())
                            .expire_after(Duration::ZERO)
                            .build(),
                    )
                    .build(),
            )
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn create_document(
        &self,
        kind: DocumentKind,
        new: NewDocument,
        now: DateTime<Utc>,
    ) -> StoreResult<Document> {
        let doc = Document::create(kind, new, now);
        self.documents(kind)
            .insert_one(DocumentRecord::from_document(&doc))
            .await?;
        Ok(doc)
    }

    async fn get_document(&self, kind: DocumentKind, id: &str) -> StoreResult<Option<Document>> {
        self.documents(kind)
            .find_one(doc! { "_id": id })
            .await?
            .map(DocumentRecord::into_document)
            .transpose()
    }

    async fn list_documents(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> StoreResult<Vec<Document>> {
        let mut filter = BsonDocument::new();
        if let Some(owner) = &query.owner_id {
            filter.insert("owner_id", owner.as_str());
        }

        let records: Vec<DocumentRecord> = self
            .documents(kind)
            .find(filter)
            .sort(doc! { "updated_at": -1 })
            .limit(query.limit as i64)
            .await?
            .try_collect()
            .await?;

        records
            .into_iter()
            .map(DocumentRecord::into_document)
            .collect()
    }

    async fn update_document(
        &self,
        kind: DocumentKind,
        id: &str,
        patch: DocumentPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Document>> {
        let mut set = doc! { "updated_at": to_bson_date(now) };
        if let Some(title) = patch.title {
            set.insert("title", title);
        }
        if let Some(content) = patch.content {
            set.insert("content", content);
        }

        self.documents(kind)
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?
            .map(DocumentRecord::into_document)
            .transpose()
    }

    async fn delete_document(&self, kind: DocumentKind, id: &str) -> StoreResult<bool> {
        let result = self.documents(kind).delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn set_user_note(
        &self,
        user_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<UserNote> {
        let now = to_bson_date(now);
        let update = doc! {
            "$set": { "content": content, "updated_at": now },
            "$setOnInsert": { "created_at": now },
        };

        self.user_notes()
            .find_one_and_update(doc! { "_id": user_id }, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| StoreError::Backend("upsert returned no document".into()))?
            .into_note()
    }

    async fn get_user_note(&self, user_id: &str) -> StoreResult<Option<UserNote>> {
        self.user_notes()
            .find_one(doc! { "_id": user_id })
            .await?
            .map(UserNoteRecord::into_note)
            .transpose()
    }

    async fn delete_user_note(&self, user_id: &str) -> StoreResult<bool> {
        let result = self.user_notes().delete_one(doc! { "_id": user_id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn upsert_discord_user(
        &self,
        profile: &DiscordProfile,
        token: &ProviderToken,
        now: DateTime<Utc>,
    ) -> StoreResult<UserProfile> {
        let token =
            bson::to_bson(token).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let now = to_bson_date(now);
        let update = doc! {
            "$set": {
                "username": profile.username.as_str(),
                "global_name": profile.global_name.clone(),
                "avatar": profile.avatar.clone(),
                "discriminator": profile.discriminator.clone(),
                "token": token,
                "updated_at": now,
            },
            "$setOnInsert": { "created_at": now },
        };

        self.users()
            .find_one_and_update(doc! { "_id": profile.id.as_str() }, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| StoreError::Backend("upsert returned no document".into()))?
            .into_profile()
    }

    async fn find_user(&self, discord_id: &str) -> StoreResult<Option<UserProfile>> {
        self.users()
            .find_one(doc! { "_id": discord_id })
            .await?
            .map(UserRecord::into_profile)
            .transpose()
    }
}

#[async_trait]
impl StateStore for MongoStore {
    async fn save_state(&self, state: &OAuthState) -> StoreResult<()> {
        let record = StateRecord {
            state: state.state.clone(),
            pkce_verifier: state.pkce_verifier.clone(),
            continue_to: state.continue_to.clone(),
            created_at: to_bson_date(state.created_at),
            expires_at: to_bson_date(state.expires_at),
        };
        self.states().insert_one(record).await?;
        Ok(())
    }

    async fn consume_state(
        &self,
        state: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<OAuthState>> {
        self.states()
            .find_one_and_delete(doc! {
                "_id": state,
                "expires_at": { "$gt": to_bson_date(now) },
            })
            .await?
            .map(StateRecord::into_state)
            .transpose()
    }
}
