//! # Database module — MongoDB connection
//!
//! [`connect`] turns a [`DatabaseConfig`](crate::config::DatabaseConfig) into a
//! ready [`mongodb::Database`]: it parses the decoded connection string, applies the
//! pool and timeout options both services use, pings the server so a bad URI fails
//! at startup rather than on the first request, and installs the indexes the stores
//! rely on.
//!
//! The handle is created once in `main` and handed to the stores; there is no
//! process-wide singleton.

mod pool;

pub use pool::{client_options, connect};
