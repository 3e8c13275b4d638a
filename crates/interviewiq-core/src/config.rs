//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API location, endpoint paths, where credentials are kept and the
//! last email used to sign in.
//!
//! Configuration is stored at `~/.config/interviewiq/config.json`.
//! `INTERVIEWIQ_API_URL` and `INTERVIEWIQ_STORAGE` override the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{CredentialBackend, FileBackend, KeyringBackend, MemoryBackend};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "interviewiq";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default API location, the development server's address.
const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "INTERVIEWIQ_API_URL";
pub const ENV_STORAGE: &str = "INTERVIEWIQ_STORAGE";

/// Where the credential slots live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Keyring,
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageKind::File),
            "keyring" | "keychain" => Ok(StorageKind::Keyring),
            "memory" => Ok(StorageKind::Memory),
            other => Err(anyhow::anyhow!("Unknown storage kind: {}", other)),
        }
    }
}

/// Endpoint paths, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub refresh: String,
    pub profile: String,
    pub interviews: String,
    pub submissions: String,
    pub admin_users: String,
    pub admin_applications: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/api/auth/login".to_string(),
            register: "/api/auth/register".to_string(),
            refresh: "/api/auth/refresh".to_string(),
            profile: "/api/users/profile".to_string(),
            interviews: "/api/interviews".to_string(),
            submissions: "/api/submissions".to_string(),
            admin_users: "/api/admin/users".to_string(),
            admin_applications: "/api/admin/applications".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub endpoints: Endpoints,
    pub storage: StorageKind,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            endpoints: Endpoints::default(),
            storage: StorageKind::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent) and apply environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(storage) = var(ENV_STORAGE) {
            match storage.parse() {
                Ok(kind) => self.storage = kind,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_STORAGE),
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Absolute URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// The storage backend this config asks for.
    pub fn credential_backend(&self) -> Result<Box<dyn CredentialBackend>> {
        Ok(match self.storage {
            StorageKind::File => Box::new(FileBackend::new(&self.cache_dir()?)),
            StorageKind::Keyring => Box::new(KeyringBackend),
            StorageKind::Memory => Box::new(MemoryBackend::new()),
        })
    }
}
