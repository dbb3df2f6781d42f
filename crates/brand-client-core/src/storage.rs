use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::session::UserRef;

const STORE_SCHEMA_VERSION: u32 = 1;

pub const KEY_TOKEN: &str = "brand_console.token";
pub const KEY_USER: &str = "brand_console.user";
pub const KEY_API_BASE_URL: &str = "brand_console.api_base_url";
pub const KEY_ONBOARDING_COMPLETE: &str = "brand_console.onboarding_complete";

const AUTH_KEYS: [&str; 2] = [KEY_TOKEN, KEY_USER];
const ALL_KEYS: [&str; 4] = [
    KEY_TOKEN,
    KEY_USER,
    KEY_API_BASE_URL,
    KEY_ONBOARDING_COMPLETE,
];

/// Durable string-valued key-value persistence.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Writes every entry or none. Stores that can commit several keys in one
    /// write override this; the default writes in order and restores the
    /// previous values on failure.
    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let previous = entries
            .iter()
            .map(|(key, _)| (*key, self.get(key)))
            .collect::<Vec<_>>();
        for (written, (key, value)) in entries.iter().enumerate() {
            if let Err(error) = self.set(key, value) {
                for (key, value) in previous.iter().take(written) {
                    let restored = match value {
                        Some(value) => self.set(key, value),
                        None => self.remove(key),
                    };
                    if let Err(rollback) = restored {
                        tracing::warn!(key, error = %rollback, "failed to roll back credential write");
                    }
                }
                return Err(error);
            }
        }
        Ok(())
    }

    fn stored_token(&self) -> Option<String> {
        self.get(KEY_TOKEN).filter(|token| !token.is_empty())
    }

    /// A stored user that fails to decode reads as absent.
    fn stored_user(&self) -> Option<UserRef> {
        let raw = self.get(KEY_USER)?;
        serde_json::from_str::<UserRef>(raw.as_str()).ok()
    }

    fn stored_api_base_url(&self) -> Option<String> {
        self.get(KEY_API_BASE_URL).filter(|value| !value.is_empty())
    }

    fn set_api_base_url(&mut self, base_url: &str) -> Result<(), StoreError> {
        self.set(KEY_API_BASE_URL, base_url)
    }

    fn onboarding_complete(&self) -> bool {
        self.get(KEY_ONBOARDING_COMPLETE).as_deref() == Some("true")
    }

    fn set_onboarding_complete(&mut self, complete: bool) -> Result<(), StoreError> {
        self.set(
            KEY_ONBOARDING_COMPLETE,
            if complete { "true" } else { "false" },
        )
    }

    /// Writes token and user as one unit.
    fn persist_credentials(&mut self, token: &str, user: &UserRef) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(user).map_err(|error| StoreError::Encode {
            message: error.to_string(),
        })?;
        self.set_many(&[(KEY_TOKEN, token), (KEY_USER, encoded.as_str())])
    }

    fn clear_auth(&mut self) -> Result<(), StoreError> {
        for key in AUTH_KEYS {
            self.remove(key)?;
        }
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), StoreError> {
        for key in ALL_KEYS {
            self.remove(key)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    entries: BTreeMap<String, String>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CredentialDocument {
    version: u32,
    updated_at: String,
    entries: BTreeMap<String, String>,
}

/// JSON file on disk, replaced wholesale on every mutation. The file is
/// written beside its destination and renamed into place, owner-only on unix.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileCredentialStore {
    /// Opens the store at `path`. A missing, unreadable or foreign-version
    /// file opens as empty.
    pub fn open(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<CredentialDocument>(raw.as_str()).ok())
            .filter(|document| document.version == STORE_SCHEMA_VERSION)
            .map(|document| document.entries)
            .unwrap_or_default();
        if !entries.is_empty() {
            tracing::debug!(path = %path.display(), keys = entries.len(), "credential store loaded");
        }
        Self { path, entries }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| StoreError::Io {
                message: format!("mkdir failed: {error}"),
            })?;
        }
        let encoded = serde_json::to_string_pretty(&CredentialDocument {
            version: STORE_SCHEMA_VERSION,
            updated_at: Utc::now().to_rfc3339(),
            entries: self.entries.clone(),
        })
        .map_err(|error| StoreError::Encode {
            message: error.to_string(),
        })?;
        let tmp_path = temporary_store_path(&self.path);
        fs::write(&tmp_path, encoded).map_err(|error| StoreError::Io {
            message: format!("write failed: {error}"),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600)).map_err(
                |error| StoreError::Io {
                    message: format!("chmod failed: {error}"),
                },
            )?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|error| StoreError::Io {
            message: format!("commit failed: {error}"),
        })
    }
}

fn temporary_store_path(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let previous = self.entries.clone();
        for (key, value) in entries {
            self.entries.insert((*key).to_string(), (*value).to_string());
        }
        if let Err(error) = self.flush() {
            self.entries = previous;
            return Err(error);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush()
    }
}
