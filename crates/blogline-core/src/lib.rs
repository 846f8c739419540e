//! Blogline core library.
//!
//! A client for a REST blog backend: token storage, a session client that
//! keeps bearer tokens fresh, and typed access to posts, comments, likes,
//! bookmarks, follows, categories and tags.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, SessionClient};
pub use auth::{guard, Access, Session, SessionStatus, SessionWatcher};
pub use config::Config;
