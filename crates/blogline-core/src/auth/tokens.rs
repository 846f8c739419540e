use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};

/// Default keychain service name
pub const DEFAULT_KEYRING_SERVICE: &str = "blogline";

/// Token file name in the data directory
const TOKEN_FILE: &str = "tokens.json";

/// The two persisted token slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub const ALL: [TokenKey; 2] = [TokenKey::Access, TokenKey::Refresh];

    /// Storage key, shared by every backend
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKey::Access => "access_token",
            TokenKey::Refresh => "refresh_token",
        }
    }
}

/// Persistent key-value storage for opaque token strings.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Result<Option<String>>;
    fn set(&self, key: TokenKey, value: &str) -> Result<()>;
    /// Removing a key that is not present is not an error.
    fn clear(&self, key: TokenKey) -> Result<()>;
}

// ============================================================================
// OS keychain
// ============================================================================

pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: TokenKey) -> Result<Entry> {
        Entry::new(&self.service, key.as_str()).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_KEYRING_SERVICE)
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn clear(&self, key: TokenKey) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

// ============================================================================
// JSON file
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    tokens: BTreeMap<String, String>,
    saved_at: Option<DateTime<Utc>>,
}

/// Tokens kept in `tokens.json` under a data directory.
///
/// The file is re-read on every access so several processes see each other's
/// writes.
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(TOKEN_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<TokenFile> {
        if !self.path.exists() {
            return Ok(TokenFile::default());
        }
        let contents = std::fs::read_to_string(&self.path).context("Failed to read token file")?;
        serde_json::from_str(&contents).context("Failed to parse token file")
    }

    fn write(&self, file: &TokenFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token directory")?;
        }
        let contents = serde_json::to_string_pretty(file)?;
        std::fs::write(&self.path, contents).context("Failed to write token file")?;
        restrict_permissions(&self.path)
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Token file lock poisoned"))?;
        let mut file = self.read()?;
        apply(&mut file.tokens);
        file.saved_at = Some(Utc::now());
        self.write(&file)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .context("Failed to restrict token file permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        Ok(self.read()?.tokens.remove(key.as_str()))
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.update(|tokens| {
            tokens.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn clear(&self, key: TokenKey) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|tokens| {
            tokens.remove(key.as_str());
        })
    }
}

// ============================================================================
// In memory
// ============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<TokenKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the given values.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let mut tokens = HashMap::new();
        if let Some(access) = access {
            tokens.insert(TokenKey::Access, access.to_string());
        }
        if let Some(refresh) = refresh {
            tokens.insert(TokenKey::Refresh, refresh.to_string());
        }
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<TokenKey, String>>> {
        self.tokens
            .lock()
            .map_err(|_| anyhow!("Token store lock poisoned"))
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        Ok(self.lock()?.get(&key).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.lock()?.insert(key, value.to_string());
        Ok(())
    }

    fn clear(&self, key: TokenKey) -> Result<()> {
        self.lock()?.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(TokenKey::Access.as_str(), "access_token");
        assert_eq!(TokenKey::Refresh.as_str(), "refresh_token");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::with_tokens(Some("a"), None);
        assert_eq!(store.get(TokenKey::Access).unwrap().as_deref(), Some("a"));
        assert_eq!(store.get(TokenKey::Refresh).unwrap(), None);

        store.set(TokenKey::Refresh, "r").unwrap();
        assert_eq!(store.get(TokenKey::Refresh).unwrap().as_deref(), Some("r"));

        store.clear(TokenKey::Access).unwrap();
        store.clear(TokenKey::Access).unwrap();
        assert_eq!(store.get(TokenKey::Access).unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path());
        assert_eq!(store.get(TokenKey::Access).unwrap(), None);

        store.set(TokenKey::Access, "access-1").unwrap();
        store.set(TokenKey::Refresh, "refresh-1").unwrap();

        let reopened = FileTokenStore::new(dir.path());
        assert_eq!(reopened.get(TokenKey::Access).unwrap().as_deref(), Some("access-1"));
        assert_eq!(reopened.get(TokenKey::Refresh).unwrap().as_deref(), Some("refresh-1"));

        reopened.clear(TokenKey::Access).unwrap();
        assert_eq!(store.get(TokenKey::Access).unwrap(), None);
        assert_eq!(store.get(TokenKey::Refresh).unwrap().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_file_store_clear_without_file_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(&dir.path().join("nested"));
        store.clear(TokenKey::Refresh).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(TOKEN_FILE), "{not json").unwrap();
        let store = FileTokenStore::new(dir.path());
        assert!(store.get(TokenKey::Access).is_err());
    }
}
