//! # Public user projection
//!
//! [`store::UserProfile`] is the full stored record. [`UserInfo`] is the subset the
//! gateway is willing to send back from the session check: the Discord id, username,
//! global name and avatar hash. Timestamps and the provider token never leave the
//! server.

use serde::{Deserialize, Serialize};
use store::UserProfile;

/// User information safe to send to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub discord_id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
}

impl From<&UserProfile> for UserInfo {
    fn from(user: &UserProfile) -> Self {
        Self {
            discord_id: user.discord_id.clone(),
            username: user.username.clone(),
            global_name: user.global_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_projection_drops_timestamps() {
        let now = Utc::now();
        let profile = UserProfile {
            discord_id: "80351110224678912".into(),
            username: "nelly".into(),
            global_name: Some("Nelly".into()),
            avatar: Some("8342729096ea3675442027381ff50dfe".into()),
            discriminator: Some("0".into()),
            created_at: now,
            updated_at: now,
        };

        let info = UserInfo::from(&profile);
        assert_eq!(info.discord_id, "80351110224678912");
        assert_eq!(info.global_name.as_deref(), Some("Nelly"));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 4);
        assert!(json.get("created_at").is_none());
    }
}
