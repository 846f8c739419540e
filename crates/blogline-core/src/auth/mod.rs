//! Authentication module for managing tokens and session state.
//!
//! This module provides:
//! - `TokenStore`: Persistent token storage (OS keychain, JSON file, memory)
//! - `TokenVault`: Keeps the access/refresh pair consistent
//! - `Session`, `SessionWatcher`: Observable session state
//! - `guard`: Route guarding for protected screens

pub mod guard;
pub mod session;
pub mod tokens;
pub mod vault;

pub use guard::{guard, Access};
pub use session::{EndReason, Session, SessionStatus, SessionWatcher};
pub(crate) use session::SessionPublisher;
pub use tokens::{
    FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenKey, TokenStore,
    DEFAULT_KEYRING_SERVICE,
};
pub use vault::{CredentialPair, TokenVault};
