//! # Storage traits — the seam between HTTP handlers and the database
//!
//! Handlers never talk to MongoDB directly. They hold `Arc<dyn ...>` handles to the
//! traits below, so the same routes run against [`crate::MemoryStore`] in tests and
//! against [`crate::MongoStore`] in production.
//!
//! | Trait | Collections | Used by |
//! |-------|-------------|---------|
//! | [`DocumentStore`] | `notes`, `pages`, `user_notes` | notes service |
//! | [`UserStore`] | `users` | auth gateway (upsert on callback) and session check |
//! | [`StateStore`] | `oauth_states` | auth gateway (login / callback) |
//!
//! Timestamps are passed in by the caller (`now`) rather than read inside the store,
//! which keeps expiry checks deterministic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::models::{
    DiscordProfile, Document, DocumentKind, DocumentPatch, DocumentQuery, NewDocument,
    OAuthState, ProviderToken, UserNote, UserProfile,
};

/// CRUD over note and page documents plus the per-user note.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        kind: DocumentKind,
        new: NewDocument,
        now: DateTime<Utc>,
    ) -> StoreResult<Document>;

    async fn get_document(&self, kind: DocumentKind, id: &str) -> StoreResult<Option<Document>>;

    /// Newest `updated_at` first.
    async fn list_documents(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> StoreResult<Vec<Document>>;

    /// Returns the updated document, or `None` if the id is unknown.
    async fn update_document(
        &self,
        kind: DocumentKind,
        id: &str,
        patch: DocumentPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Document>>;

    /// Returns `true` if a document was removed.
    async fn delete_document(&self, kind: DocumentKind, id: &str) -> StoreResult<bool>;

    /// Insert or replace the user's note, keeping the original `created_at`.
    async fn set_user_note(
        &self,
        user_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<UserNote>;

    async fn get_user_note(&self, user_id: &str) -> StoreResult<Option<UserNote>>;

    async fn delete_user_note(&self, user_id: &str) -> StoreResult<bool>;
}

/// Discord user profiles.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert or refresh a user from a fresh Discord profile and token.
    async fn upsert_discord_user(
        &self,
        profile: &DiscordProfile,
        token: &ProviderToken,
        now: DateTime<Utc>,
    ) -> StoreResult<UserProfile>;

    async fn find_user(&self, discord_id: &str) -> StoreResult<Option<UserProfile>>;
}

/// Single-use OAuth state tokens.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_state(&self, state: &OAuthState) -> StoreResult<()>;

    /// Remove and return the state if it exists and has not expired at `now`.
    ///
    /// Must be atomic: two concurrent calls with the same token can never both
    /// return `Some`.
    async fn consume_state(&self, state: &str, now: DateTime<Utc>)
        -> StoreResult<Option<OAuthState>>;
}
