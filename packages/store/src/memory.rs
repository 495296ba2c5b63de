use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    DiscordProfile, Document, DocumentKind, DocumentPatch, DocumentQuery, NewDocument,
    OAuthState, ProviderToken, UserNote, UserProfile,
};
use crate::repo::{DocumentStore, StateStore, UserStore};

/// In-memory store for tests and local development.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<HashMap<(DocumentKind, String), Document>>>,
    user_notes: Arc<Mutex<HashMap<String, UserNote>>>,
    users: Arc<Mutex<HashMap<String, (UserProfile, ProviderToken)>>>,
    states: Arc<Mutex<HashMap<String, OAuthState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every state that has expired at `now`. Returns how many were removed.
    pub fn sweep_expired_states(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut states = lock(&self.states)?;
        let before = states.len();
        states.retain(|_, s| !s.is_expired_at(now));
        Ok(before - states.len())
    }

    /// Number of pending states, expired or not.
    pub fn pending_states(&self) -> StoreResult<usize> {
        Ok(lock(&self.states)?.len())
    }

    /// Token stored for a user, if any.
    pub fn stored_token(&self, discord_id: &str) -> StoreResult<Option<ProviderToken>> {
        Ok(lock(&self.users)?
            .get(discord_id)
            .map(|(_, token)| token.clone()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> StoreResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(
        &self,
        kind: DocumentKind,
        new: NewDocument,
        now: DateTime<Utc>,
    ) -> StoreResult<Document> {
        let doc = Document::create(kind, new, now);
        lock(&self.documents)?.insert((kind, doc.id.clone()), doc.clone());
        Ok(doc)
    }

    async fn get_document(&self, kind: DocumentKind, id: &str) -> StoreResult<Option<Document>> {
        Ok(lock(&self.documents)?.get(&(kind, id.to_string())).cloned())
    }

    async fn list_documents(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
    ) -> StoreResult<Vec<Document>> {
        let documents = lock(&self.documents)?;
        let mut found: Vec<Document> = documents
            .values()
            .filter(|d| d.kind == kind)
            .filter(|d| match &query.owner_id {
                Some(owner) => &d.owner_id == owner,
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        found.truncate(query.limit);
        Ok(found)
    }

    async fn update_document(
        &self,
        kind: DocumentKind,
        id: &str,
        patch: DocumentPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Document>> {
        let mut documents = lock(&self.documents)?;
        Ok(documents.get_mut(&(kind, id.to_string())).map(|doc| {
            doc.apply(patch, now);
            doc.clone()
        }))
    }

    async fn delete_document(&self, kind: DocumentKind, id: &str) -> StoreResult<bool> {
        Ok(lock(&self.documents)?
            .remove(&(kind, id.to_string()))
            .is_some())
    }

    async fn set_user_note(
        &self,
        user_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<UserNote> {
        let mut notes = lock(&self.user_notes)?;
        let note = notes
            .entry(user_id.to_string())
            .and_modify(|n| {
                n.content = content.to_string();
                n.updated_at = now;
            })
            .or_insert_with(|| UserNote {
                user_id: user_id.to_string(),
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            });
        Ok(note.clone())
    }

    async fn get_user_note(&self, user_id: &str) -> StoreResult<Option<UserNote>> {
        Ok(lock(&self.user_notes)?.get(user_id).cloned())
    }

    async fn delete_user_note(&self, user_id: &str) -> StoreResult<bool> {
        Ok(lock(&self.user_notes)?.remove(user_id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_discord_user(
        &self,
        profile: &DiscordProfile,
        token: &ProviderToken,
        now: DateTime<Utc>,
    ) -> StoreResult<UserProfile> {
        let mut users = lock(&self.users)?;
        let created_at = users
            .get(&profile.id)
            .map(|(existing, _)| existing.created_at)
            .unwrap_or(now);
        let user = UserProfile {
            discord_id: profile.id.clone(),
            username: profile.username.clone(),
            global_name: profile.global_name.clone(),
            avatar: profile.avatar.clone(),
            discriminator: profile.discriminator.clone(),
            created_at,
            updated_at: now,
        };
        users.insert(profile.id.clone(), (user.clone(), token.clone()));
        Ok(user)
    }

    async fn find_user(&self, discord_id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(lock(&self.users)?
            .get(discord_id)
            .map(|(user, _)| user.clone()))
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save_state(&self, state: &OAuthState) -> StoreResult<()> {
        lock(&self.states)?.insert(state.state.clone(), state.clone());
        Ok(())
    }

    async fn consume_state(
        &self,
        state: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<OAuthState>> {
        // Removed even when expired so a stale token cannot linger.
        let removed = lock(&self.states)?.remove(state);
        Ok(removed.filter(|s| !s.is_expired_at(now)))
    }
}
