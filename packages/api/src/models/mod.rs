//! Data models returned to clients.

mod user;

pub use user::UserInfo;
