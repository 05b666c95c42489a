//! Persistent storage for the session token.
//!
//! The dashboard keeps exactly one value across runs: the bearer token. Its
//! presence is the only signal used to attempt session restoration.
//!
//! [`FileStorage`] keeps it as a JSON file in the platform config directory:
//! - Linux: `~/.config/groupwatch/`
//! - macOS: `~/Library/Application Support/groupwatch/`
//! - Windows: `%APPDATA%\groupwatch\`

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Where the session token lives between runs.
pub trait TokenStorage: Send + Sync {
    fn load_token(&self) -> Option<String>;

    /// Returns `true` if the operation succeeded.
    fn save_token(&self, token: &str) -> bool;

    fn remove_token(&self);
}

/// JSON files in a directory, one per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage rooted in the platform config directory.
    pub fn in_config_dir() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        Some(Self::new(config_dir.join("groupwatch")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a value to persistent storage.
    ///
    /// Returns `true` if the operation succeeded.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.save_raw(key, &json),
            Err(_) => false,
        }
    }

    /// Load a value from persistent storage.
    ///
    /// Returns `None` if the key doesn't exist or deserialization fails.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = self.load_raw(key)?;
        serde_json::from_str(&json).ok()
    }

    /// Remove a value from persistent storage.
    pub fn remove(&self, key: &str) {
        if let Some(path) = self.file_path(key) {
            let _ = std::fs::remove_file(path);
        }
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        // Ensure the directory exists
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).ok()?;
        }
        // Sanitize key to be a valid filename
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        Some(self.dir.join(format!("{}.json", safe_key)))
    }

    fn save_raw(&self, key: &str, value: &str) -> bool {
        let Some(path) = self.file_path(key) else {
            return false;
        };
        std::fs::write(path, value).is_ok()
    }

    fn load_raw(&self, key: &str) -> Option<String> {
        let path = self.file_path(key)?;
        std::fs::read_to_string(path).ok()
    }
}

impl TokenStorage for FileStorage {
    fn load_token(&self) -> Option<String> {
        self.load::<String>(TOKEN_KEY)
            .filter(|token| !token.trim().is_empty())
    }

    fn save_token(&self, token: &str) -> bool {
        self.save(TOKEN_KEY, &token)
    }

    fn remove_token(&self) {
        self.remove(TOKEN_KEY);
    }
}

/// Process-local storage, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    token: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStorage for MemoryStorage {
    fn load_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn save_token(&self, token: &str) -> bool {
        match self.token.lock() {
            Ok(mut slot) => {
                *slot = Some(token.to_string());
                true
            }
            Err(_) => false,
        }
    }

    fn remove_token(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}
