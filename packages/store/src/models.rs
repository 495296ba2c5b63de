//! # Domain models for documents, users and OAuth state
//!
//! Defines the records the storage traits in [`crate::repo`] read and write. Every
//! type here is `Serialize + Deserialize` so the HTTP layer can return it as JSON
//! directly; MongoDB-specific record shapes (with `_id` and BSON dates) live in
//! [`crate::mongo`] and convert to and from these types.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`Document`] | A note or a page. Keyed by a UUID v4 `id`, carries the `owner_id`, an optional `title`, the body `content` and audit timestamps. [`DocumentKind`] selects the collection. |
//! | [`NewDocument`] / [`DocumentPatch`] | Validated create and update payloads. |
//! | [`UserNote`] | The single free-form note each Discord user owns, keyed by `user_id`. |
//! | [`DiscordProfile`] | The `/users/@me` response from Discord, used as upsert input. |
//! | [`ProviderToken`] | Token response from the Discord token endpoint. Persisted, never returned. |
//! | [`UserProfile`] | A stored Discord user. |
//! | [`OAuthState`] | A pending login: anti-forgery state token, PKCE verifier and the post-login destination. |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which collection a [`Document`] lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Note,
    Page,
}

impl DocumentKind {
    /// Collection name in the database.
    pub fn collection(&self) -> &'static str {
        match self {
            DocumentKind::Note => "notes",
            DocumentKind::Page => "pages",
        }
    }

    /// Human readable singular, used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Note => "note",
            DocumentKind::Page => "page",
        }
    }
}

/// A note or page document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub kind: DocumentKind,
    pub owner_id: String,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Build a fresh document with a new id, stamped with `now`.
    pub fn create(kind: DocumentKind, new: NewDocument, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            owner_id: new.owner_id,
            title: new.title,
            content: new.content,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch in place and bump `updated_at`.
    pub fn apply(&mut self, patch: DocumentPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        self.updated_at = now;
    }
}

/// Fields required to create a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub owner_id: String,
    pub title: Option<String>,
    pub content: String,
}

/// Partial update of a document. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Filter for listing documents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentQuery {
    pub owner_id: Option<String>,
    pub limit: usize,
}

/// Per-user note, one per Discord account.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserNote {
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Discord user info from the `/users/@me` endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscordProfile {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub discriminator: Option<String>,
}

/// Token material returned by the provider's token endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    pub token_type: String,
}

/// Stored Discord user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub discord_id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub discriminator: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pending OAuth login.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OAuthState {
    pub state: String,
    pub pkce_verifier: String,
    pub continue_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OAuthState {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
