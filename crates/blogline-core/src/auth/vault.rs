use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use tracing::warn;

use super::tokens::{TokenKey, TokenStore};

/// Access and refresh token, always stored and cleared together.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Pair-aware view over a [`TokenStore`].
///
/// A store holding only one of the two tokens is treated as empty and is
/// wiped on the next read of the pair.
///
/// Every write that starts or ends a session bumps a generation counter.
/// A refreshed access token is only written while the generation it was
/// requested under is still current.
#[derive(Clone)]
pub struct TokenVault {
    store: Arc<dyn TokenStore>,
    generation: Arc<Mutex<u64>>,
}

impl TokenVault {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            generation: Arc::new(Mutex::new(0)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, u64>> {
        self.generation
            .lock()
            .map_err(|_| anyhow!("Token vault lock poisoned"))
    }

    /// Current write generation. Read it before `load_pair` and hand it back
    /// to `store_refreshed`.
    pub fn generation(&self) -> Result<u64> {
        Ok(*self.lock()?)
    }

    pub fn load_pair(&self) -> Result<Option<CredentialPair>> {
        let access = self.store.get(TokenKey::Access)?;
        let refresh = self.store.get(TokenKey::Refresh)?;
        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(Some(CredentialPair { access, refresh })),
            (None, None) => Ok(None),
            (access, _) => {
                warn!(
                    has_access = access.is_some(),
                    "Found a partial token pair, clearing both tokens"
                );
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn store_pair(&self, pair: &CredentialPair) -> Result<()> {
        let mut generation = self.lock()?;
        *generation += 1;
        self.store.set(TokenKey::Access, &pair.access)?;
        if let Err(e) = self.store.set(TokenKey::Refresh, &pair.refresh) {
            // Don't leave a lone access token behind
            if let Err(rollback) = self.store.clear(TokenKey::Access) {
                warn!(error = %rollback, "Failed to roll back access token");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Replace the access token after a refresh, and the refresh token too when
    /// the backend rotated it.
    ///
    /// Returns `false` without writing when the pair was cleared or replaced
    /// since `expected` was read.
    pub fn store_refreshed(
        &self,
        expected: u64,
        access: &str,
        rotated_refresh: Option<&str>,
    ) -> Result<bool> {
        let generation = self.lock()?;
        if *generation != expected {
            return Ok(false);
        }
        self.store.set(TokenKey::Access, access)?;
        if let Some(refresh) = rotated_refresh {
            self.store.set(TokenKey::Refresh, refresh)?;
        }
        Ok(true)
    }

    /// Remove both tokens. Both removals are attempted even if one fails.
    pub fn clear(&self) -> Result<()> {
        let mut generation = self.lock()?;
        *generation += 1;
        let mut first_error = None;
        for key in TokenKey::ALL {
            if let Err(e) = self.store.clear(key) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;

    fn vault_with(access: Option<&str>, refresh: Option<&str>) -> (Arc<MemoryTokenStore>, TokenVault) {
        let store = Arc::new(MemoryTokenStore::with_tokens(access, refresh));
        (store.clone(), TokenVault::new(store))
    }

    #[test]
    fn test_full_pair_loads() {
        let (_, vault) = vault_with(Some("A"), Some("R"));
        let pair = vault.load_pair().unwrap().expect("pair");
        assert_eq!(pair.access, "A");
        assert_eq!(pair.refresh, "R");
    }

    #[test]
    fn test_partial_pair_is_cleared() {
        let (store, vault) = vault_with(Some("A"), None);
        assert!(vault.load_pair().unwrap().is_none());
        assert_eq!(store.get(TokenKey::Access).unwrap(), None);

        let (store, vault) = vault_with(None, Some("R"));
        assert!(vault.load_pair().unwrap().is_none());
        assert_eq!(store.get(TokenKey::Refresh).unwrap(), None);
    }

    #[test]
    fn test_store_refreshed_keeps_refresh_unless_rotated() {
        let (store, vault) = vault_with(Some("A"), Some("R"));
        let generation = vault.generation().unwrap();
        assert!(vault.store_refreshed(generation, "A2", None).unwrap());
        assert_eq!(store.get(TokenKey::Access).unwrap().as_deref(), Some("A2"));
        assert_eq!(store.get(TokenKey::Refresh).unwrap().as_deref(), Some("R"));

        assert!(vault.store_refreshed(generation, "A3", Some("R3")).unwrap());
        assert_eq!(store.get(TokenKey::Refresh).unwrap().as_deref(), Some("R3"));
    }

    #[test]
    fn test_store_refreshed_after_clear_writes_nothing() {
        let (store, vault) = vault_with(Some("A"), Some("R"));
        let generation = vault.generation().unwrap();
        vault.clear().unwrap();

        assert!(!vault.store_refreshed(generation, "A2", None).unwrap());
        assert_eq!(store.get(TokenKey::Access).unwrap(), None);
        assert_eq!(store.get(TokenKey::Refresh).unwrap(), None);
    }

    #[test]
    fn test_store_refreshed_after_new_login_keeps_new_pair() {
        let (store, vault) = vault_with(Some("A"), Some("R"));
        let generation = vault.generation().unwrap();
        vault
            .store_pair(&CredentialPair {
                access: "B".into(),
                refresh: "RB".into(),
            })
            .unwrap();

        assert!(!vault.store_refreshed(generation, "A2", Some("R2")).unwrap());
        assert_eq!(store.get(TokenKey::Access).unwrap().as_deref(), Some("B"));
        assert_eq!(store.get(TokenKey::Refresh).unwrap().as_deref(), Some("RB"));
    }

    /// Memory store whose refresh slot refuses writes.
    struct RefreshWriteFails(MemoryTokenStore);

    impl TokenStore for RefreshWriteFails {
        fn get(&self, key: TokenKey) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: TokenKey, value: &str) -> Result<()> {
            match key {
                TokenKey::Refresh => Err(anyhow!("keychain locked")),
                TokenKey::Access => self.0.set(key, value),
            }
        }

        fn clear(&self, key: TokenKey) -> Result<()> {
            self.0.clear(key)
        }
    }

    #[test]
    fn test_failed_pair_write_rolls_back_access() {
        let store = Arc::new(RefreshWriteFails(MemoryTokenStore::new()));
        let vault = TokenVault::new(store.clone());

        let result = vault.store_pair(&CredentialPair {
            access: "A".into(),
            refresh: "R".into(),
        });

        assert!(result.is_err());
        assert_eq!(store.get(TokenKey::Access).unwrap(), None);
        assert!(vault.load_pair().unwrap().is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = CredentialPair {
            access: "secret-access".into(),
            refresh: "secret-refresh".into(),
        };
        let printed = format!("{:?}", pair);
        assert!(!printed.contains("secret"));
    }
}
