//! # Store crate — persistence for the notes API and the auth gateway
//!
//! Everything the two services keep in the database goes through this crate.
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`models`] | — | Documents, user notes, Discord profiles, OAuth state records |
//! | [`repo`] | — | The `DocumentStore`, `UserStore` and `StateStore` traits |
//! | [`MemoryStore`] | — | In-process implementation of all three traits (tests, local runs) |
//! | [`mongo`] | `mongo` | `MongoStore`, the MongoDB implementation |
//! | [`sessions`] | `mongo` | `MongoSessionStore`, a `tower_sessions::SessionStore` on MongoDB |

pub mod error;
pub mod models;
pub mod repo;

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "mongo")]
pub mod mongo;
#[cfg(feature = "mongo")]
pub mod sessions;

#[cfg(feature = "mongo")]
pub use mongo::MongoStore;
#[cfg(feature = "mongo")]
pub use sessions::MongoSessionStore;

pub use error::{StoreError, StoreResult};
pub use models::{
    DiscordProfile, Document, DocumentKind, DocumentPatch, DocumentQuery, NewDocument,
    OAuthState, ProviderToken, UserNote, UserProfile,
};
pub use repo::{DocumentStore, StateStore, UserStore};
