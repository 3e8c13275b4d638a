use std::fmt;

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::models::User;

use super::backend::{CredentialBackend, Slots};

/// The signed-in session: an access token, an optional refresh token and
/// the user they belong to. A token never exists without its user.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: User,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>, user: User) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            user,
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    fn to_slots(&self) -> Result<Slots> {
        let user = serde_json::to_string(&self.user).context("Failed to serialize user profile")?;
        Ok(Slots {
            access_token: Some(self.access_token.clone()),
            refresh_token: self.refresh_token.clone(),
            user: Some(user),
        })
    }

    /// Rebuild a credential from persisted slots. `Ok(None)` means the
    /// slots are empty, `Err` means they are inconsistent.
    fn from_slots(slots: Slots) -> std::result::Result<Option<Self>, String> {
        match (slots.access_token, slots.user) {
            (None, None) => Ok(None),
            (Some(access_token), Some(user_json)) => {
                let user: User = serde_json::from_str(&user_json)
                    .map_err(|e| format!("unreadable user profile: {}", e))?;
                Ok(Some(Self {
                    access_token,
                    refresh_token: slots.refresh_token,
                    user,
                }))
            }
            (Some(_), None) => Err("access token without user profile".to_string()),
            (None, Some(_)) => Err("user profile without access token".to_string()),
        }
    }
}

// Tokens stay out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

/// Single source of truth for who is signed in.
///
/// Reads are synchronous snapshots so route checks never wait on I/O.
/// Writes go to the backend first and only then replace the in-memory
/// snapshot, so other readers see either the old credential or the new one.
pub struct CredentialStore {
    backend: Box<dyn CredentialBackend>,
    current: RwLock<Option<Credential>>,
    writer: Mutex<()>,
}

impl CredentialStore {
    /// Open the store, loading whatever the backend holds.
    ///
    /// Inconsistent slots are discarded and erased so the store never
    /// starts out holding half a session.
    pub fn open(backend: Box<dyn CredentialBackend>) -> Result<Self> {
        let slots = backend
            .read()
            .with_context(|| format!("Failed to read credentials from {}", backend.name()))?;

        let current = match Credential::from_slots(slots) {
            Ok(credential) => {
                debug!(
                    backend = backend.name(),
                    authenticated = credential.is_some(),
                    "Credential store opened"
                );
                credential
            }
            Err(reason) => {
                warn!(backend = backend.name(), %reason, "Discarding inconsistent stored credentials");
                backend
                    .erase()
                    .context("Failed to erase inconsistent credentials")?;
                None
            }
        };

        Ok(Self {
            backend,
            current: RwLock::new(current),
            writer: Mutex::new(()),
        })
    }

    /// Persist a credential, replacing any previous one wholesale.
    pub fn save(&self, credential: Credential) -> Result<()> {
        let _guard = self.writer.lock();
        let slots = credential.to_slots()?;
        self.backend
            .write(&slots)
            .with_context(|| format!("Failed to save credentials to {}", self.backend.name()))?;

        info!(user_id = credential.user.id, role = credential.user.role.as_str(), "Session saved");
        *self.current.write() = Some(credential);
        Ok(())
    }

    /// The current credential, if any.
    pub fn load(&self) -> Option<Credential> {
        self.current.read().clone()
    }

    /// Remove the session. Clearing an empty store is a no-op.
    ///
    /// The in-memory snapshot is dropped even if the backend fails to
    /// erase, so the process stops using a dead session either way.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.writer.lock();
        let had_session = self.current.write().take().is_some();
        self.backend
            .erase()
            .with_context(|| format!("Failed to erase credentials from {}", self.backend.name()))?;

        if had_session {
            info!("Session cleared");
        }
        Ok(())
    }

    /// Swap in a refreshed access token, keeping the user and, unless the
    /// server rotated it, the refresh token.
    ///
    /// `spent_refresh_token` is the token the refresh was made with. Nothing
    /// is written and `false` is returned unless the current credential
    /// still holds it: the session was cleared or replaced by another
    /// sign-in while the refresh was in flight.
    pub fn replace_access_token(
        &self,
        spent_refresh_token: &str,
        access_token: String,
        rotated_refresh_token: Option<String>,
    ) -> Result<bool> {
        let _guard = self.writer.lock();
        let Some(mut credential) = self.current.read().clone() else {
            return Ok(false);
        };
        if credential.refresh_token.as_deref() != Some(spent_refresh_token) {
            return Ok(false);
        }

        credential.access_token = access_token;
        if let Some(refresh_token) = rotated_refresh_token {
            credential.refresh_token = Some(refresh_token);
        }

        let slots = credential.to_slots()?;
        self.backend
            .write(&slots)
            .with_context(|| format!("Failed to save refreshed token to {}", self.backend.name()))?;

        debug!(user_id = credential.user.id, "Access token refreshed");
        *self.current.write() = Some(credential);
        Ok(true)
    }

    /// Clear the session only if it still holds `refresh_token`. Returns
    /// whether anything was cleared.
    pub fn clear_if_refresh_token(&self, refresh_token: &str) -> Result<bool> {
        let _guard = self.writer.lock();
        {
            let mut current = self.current.write();
            match current.as_ref() {
                Some(c) if c.refresh_token.as_deref() == Some(refresh_token) => {
                    *current = None;
                }
                _ => return Ok(false),
            }
        }
        self.backend
            .erase()
            .with_context(|| format!("Failed to erase credentials from {}", self.backend.name()))?;

        info!("Session cleared after failed refresh");
        Ok(true)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn has_admin_role(&self) -> bool {
        self.current
            .read()
            .as_ref()
            .map(|c| c.user.is_admin())
            .unwrap_or(false)
    }

    /// The bearer token for the next request.
    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|c| c.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current
            .read()
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.current.read().as_ref().map(|c| c.user.clone())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::backend::MemoryBackend;
    use crate::models::Role;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            role,
        }
    }

    fn memory_store() -> CredentialStore {
        CredentialStore::open(Box::new(MemoryBackend::new())).unwrap()
    }

    #[test]
    fn test_save_then_load_returns_same_credential() {
        let store = memory_store();
        let credential = Credential::new("a1", None, user(1, Role::Standard));

        store.save(credential.clone()).unwrap();

        assert_eq!(store.load(), Some(credential));
        assert!(store.is_authenticated());
        assert!(!store.has_admin_role());
    }

    #[test]
    fn test_clear_then_load_is_empty() {
        let store = memory_store();
        store
            .save(Credential::new("a1", None, user(1, Role::Standard)))
            .unwrap();

        store.clear().unwrap();

        assert_eq!(store.load(), None);
        assert!(!store.is_authenticated());
        assert!(!store.has_admin_role());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = memory_store();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_last_write_wins_over_save_clear_sequences() {
        let store = memory_store();
        let first = Credential::new("a1", Some("r1".to_string()), user(1, Role::Standard));
        let second = Credential::new("a2", None, user(2, Role::Admin));

        store.save(first).unwrap();
        store.clear().unwrap();
        store.save(second.clone()).unwrap();
        assert_eq!(store.load(), Some(second));
        // The dropped refresh token must not leak from the first session
        assert_eq!(store.refresh_token(), None);

        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_admin_role() {
        let store = memory_store();
        store
            .save(Credential::new("a1", None, user(9, Role::Admin)))
            .unwrap();
        assert!(store.has_admin_role());
    }

    #[test]
    fn test_replace_access_token_keeps_user_and_refresh_token() {
        let store = memory_store();
        store
            .save(Credential::new("old", Some("r1".to_string()), user(1, Role::Standard)))
            .unwrap();

        assert!(store.replace_access_token("r1", "new".to_string(), None).unwrap());

        let credential = store.load().unwrap();
        assert_eq!(credential.access_token, "new");
        assert_eq!(credential.refresh_token.as_deref(), Some("r1"));
        assert_eq!(credential.user, user(1, Role::Standard));
    }

    #[test]
    fn test_replace_access_token_applies_rotation() {
        let store = memory_store();
        store
            .save(Credential::new("old", Some("r1".to_string()), user(1, Role::Standard)))
            .unwrap();

        store
            .replace_access_token("r1", "new".to_string(), Some("r2".to_string()))
            .unwrap();
        assert_eq!(store.refresh_token().as_deref(), Some("r2"));
    }

    #[test]
    fn test_replace_access_token_on_empty_store_is_noop() {
        let store = memory_store();
        assert!(!store.replace_access_token("r1", "new".to_string(), None).unwrap());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_replace_access_token_ignores_other_session() {
        let store = memory_store();
        let bob = Credential::new("bob-a1", Some("bob-r1".to_string()), user(2, Role::Admin));
        store.save(bob.clone()).unwrap();

        // A refresh started with another session's refresh token
        assert!(!store
            .replace_access_token("alice-r1", "alice-a2".to_string(), None)
            .unwrap());
        assert_eq!(store.load(), Some(bob));
    }

    #[test]
    fn test_clear_if_refresh_token() {
        let store = memory_store();
        store
            .save(Credential::new("a1", Some("r1".to_string()), user(1, Role::Standard)))
            .unwrap();

        assert!(!store.clear_if_refresh_token("other").unwrap());
        assert!(store.is_authenticated());

        assert!(store.clear_if_refresh_token("r1").unwrap());
        assert!(!store.is_authenticated());
        assert!(!store.clear_if_refresh_token("r1").unwrap());
    }

    #[test]
    fn test_open_restores_persisted_credential() {
        let backend = MemoryBackend::new();
        let credential = Credential::new("a1", Some("r1".to_string()), user(3, Role::Standard));
        backend.write(&credential.to_slots().unwrap()).unwrap();

        let store = CredentialStore::open(Box::new(backend)).unwrap();
        assert_eq!(store.load(), Some(credential));
    }

    #[test]
    fn test_open_discards_token_without_user() {
        let backend = MemoryBackend::with_slots(Slots {
            access_token: Some("orphan".to_string()),
            refresh_token: None,
            user: None,
        });
        let store = CredentialStore::open(Box::new(backend)).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_open_discards_unreadable_user() {
        let backend = MemoryBackend::with_slots(Slots {
            access_token: Some("a1".to_string()),
            refresh_token: None,
            user: Some("{not json".to_string()),
        });
        let store = CredentialStore::open(Box::new(backend)).unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let credential = Credential::new("secret-access", Some("secret-refresh".to_string()), user(1, Role::Standard));
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("<redacted>"));
    }
}
