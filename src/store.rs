//! Persistence for the session token. The token lives under one fixed key; a
//! missing entry means no session was attempted. Stored values are opaque and
//! are never logged.

use crate::error::StoreError;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::RwLock,
};
use tracing::{debug, warn};

/// Key under which the token is persisted.
pub const TOKEN_KEY: &str = "doit-token";

/// Key-value capability holding the single session token.
pub trait TokenStore {
    /// Reads the token, `None` when absent.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self) -> Result<Option<SecretString>, StoreError>;

    /// Replaces the token.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, token: &SecretString) -> Result<(), StoreError>;

    /// Removes the token. Removing an absent token succeeds.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

impl<T: TokenStore + ?Sized> TokenStore for &T {
    fn get(&self) -> Result<Option<SecretString>, StoreError> {
        (**self).get()
    }

    fn set(&self, token: &SecretString) -> Result<(), StoreError> {
        (**self).set(token)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}

/// Blank values count as absent; anything else is returned byte for byte.
fn non_empty(value: &str) -> Option<SecretString> {
    if value.trim().is_empty() {
        None
    } else {
        Some(SecretString::from(value.to_string()))
    }
}

/// In-process store, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self {
            token: RwLock::new(Some(token.to_string())),
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::Io(io::Error::other("token store lock poisoned"))
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<SecretString>, StoreError> {
        let guard = self.token.read().map_err(|_| poisoned())?;
        Ok(guard.as_deref().and_then(non_empty))
    }

    fn set(&self, token: &SecretString) -> Result<(), StoreError> {
        let mut guard = self.token.write().map_err(|_| poisoned())?;
        *guard = Some(token.expose_secret().to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.token.write().map_err(|_| poisoned())?;
        *guard = None;
        Ok(())
    }
}

/// Durable store backed by a JSON object file. Keys other than [`TOKEN_KEY`]
/// are preserved across writes.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `doit/session.json` under the platform config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("doit").join("session.json"))
    }

    fn read_entries(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(entries) => Ok(entries),
            _ => Err(StoreError::NotAnObject(self.path.display().to_string())),
        }
    }

    /// Entries to rewrite. An unreadable file is replaced rather than
    /// blocking the write; the flag reports that it was discarded.
    fn entries_for_write(&self) -> Result<(Map<String, Value>, bool), StoreError> {
        match self.read_entries() {
            Ok(entries) => Ok((entries, false)),
            Err(err @ (StoreError::Format(_) | StoreError::NotAnObject(_))) => {
                warn!(path = %self.path.display(), "discarding corrupt token store: {err}");
                Ok((Map::new(), true))
            }
            Err(err) => Err(err),
        }
    }

    /// Writes to a sibling temp file and renames it over the target.
    fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_vec_pretty(entries)?;
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "session".into(), |name| name.to_string_lossy());
        let tmp_path = self
            .path
            .with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

        let result = write_private(&tmp_path, &contents).and_then(|()| fs::rename(&tmp_path, &self.path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result?;

        debug!(path = %self.path.display(), "token store updated");
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<SecretString>, StoreError> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .and_then(non_empty))
    }

    fn set(&self, token: &SecretString) -> Result<(), StoreError> {
        let (mut entries, _) = self.entries_for_write()?;
        entries.insert(
            TOKEN_KEY.to_string(),
            Value::String(token.expose_secret().to_string()),
        );
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let (mut entries, discarded) = self.entries_for_write()?;
        if entries.remove(TOKEN_KEY).is_none() && !discarded {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}
