//! Durable storage for the three credential slots.
//!
//! A backend only moves raw slots in and out of storage; consistency
//! between them is checked by [`super::CredentialStore`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use keyring::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Keychain service name shared by all slots
const SERVICE_NAME: &str = "interviewiq";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

const ACCESS_TOKEN_SLOT: &str = "access_token";
const REFRESH_TOKEN_SLOT: &str = "refresh_token";
const USER_SLOT: &str = "user";

/// Raw persisted state. `user` holds the profile as JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slots {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

impl Slots {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }
}

pub trait CredentialBackend: Send + Sync {
    /// Read all slots. Missing storage reads as empty slots.
    fn read(&self) -> Result<Slots>;

    /// Replace all slots.
    fn write(&self, slots: &Slots) -> Result<()>;

    /// Remove all slots. Erasing empty storage succeeds.
    fn erase(&self) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Slots kept as a JSON file in the cache directory.
///
/// Writes land in a sibling temp file that is renamed over the session
/// file, so readers never see a partially written session.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl CredentialBackend for FileBackend {
    fn read(&self) -> Result<Slots> {
        if !self.path.exists() {
            return Ok(Slots::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn write(&self, slots: &Slots) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(slots)?;
        let temp = self.temp_path();
        std::fs::write(&temp, contents).context("Failed to write session file")?;
        std::fs::rename(&temp, &self.path).context("Failed to replace session file")?;
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Slots kept as separate entries in the OS keychain.
pub struct KeyringBackend;

impl KeyringBackend {
    fn entry(slot: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, slot).context("Failed to create keyring entry")
    }

    fn get(slot: &str) -> Result<Option<String>> {
        match Self::entry(slot)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {} from keychain", slot)),
        }
    }

    fn set(slot: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => Self::entry(slot)?
                .set_password(value)
                .with_context(|| format!("Failed to store {} in keychain", slot)),
            None => Self::delete(slot),
        }
    }

    fn delete(slot: &str) -> Result<()> {
        match Self::entry(slot)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {} from keychain", slot)),
        }
    }
}

/// Write slots one at a time. The stored access token is removed first and
/// the new one written last, so an interrupted write leaves either no token
/// or a token next to the user it was issued for. The store discards a user
/// without a token on the next open.
fn write_slots_in_order(
    slots: &Slots,
    mut set: impl FnMut(&str, Option<&str>) -> Result<()>,
) -> Result<()> {
    set(ACCESS_TOKEN_SLOT, None)?;
    set(USER_SLOT, slots.user.as_deref())?;
    set(REFRESH_TOKEN_SLOT, slots.refresh_token.as_deref())?;
    set(ACCESS_TOKEN_SLOT, slots.access_token.as_deref())
}

impl CredentialBackend for KeyringBackend {
    fn read(&self) -> Result<Slots> {
        Ok(Slots {
            access_token: Self::get(ACCESS_TOKEN_SLOT)?,
            refresh_token: Self::get(REFRESH_TOKEN_SLOT)?,
            user: Self::get(USER_SLOT)?,
        })
    }

    fn write(&self, slots: &Slots) -> Result<()> {
        write_slots_in_order(slots, Self::set)
    }

    fn erase(&self) -> Result<()> {
        Self::delete(ACCESS_TOKEN_SLOT)?;
        Self::delete(REFRESH_TOKEN_SLOT)?;
        Self::delete(USER_SLOT)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "keyring"
    }
}

/// Non-durable slots, for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryBackend {
    slots: Mutex<Slots>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots(slots: Slots) -> Self {
        Self {
            slots: Mutex::new(slots),
        }
    }
}

impl CredentialBackend for MemoryBackend {
    fn read(&self) -> Result<Slots> {
        Ok(self.slots.lock().clone())
    }

    fn write(&self, slots: &Slots) -> Result<()> {
        *self.slots.lock() = slots.clone();
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        *self.slots.lock() = Slots::default();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
