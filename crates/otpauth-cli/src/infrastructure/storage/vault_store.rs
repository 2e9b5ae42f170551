//! JSON-backed persistence for the secret vault.
//!
//! The vault lives as a flat `{ "account": "secret" }` object in
//! `secrets.json` under the platform config directory. Every operation is
//! load-modify-save over the whole file; the vault is small and the simple
//! scheme makes the file trivially inspectable and recoverable.
//!
//! The store owns the merge policy for received secret sets: incoming
//! entries overwrite same-named local ones. The sync protocol itself never
//! interprets secrets; it hands a [`SecretSet`] to [`VaultStore::merge`] and
//! the decision ends here.

use std::path::{Path, PathBuf};

use otpauth_core::SecretSet;
use thiserror::Error;
use tracing::debug;

use super::config::platform_config_dir;

/// Error type for vault persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing vault at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The vault file content is not valid JSON.
    #[error("failed to parse vault JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// `add` was called with a name that already exists.
    #[error("an entry named '{0}' already exists")]
    DuplicateName(String),

    /// `rename` or `delete` was called with a name that does not exist.
    #[error("no entry named '{0}'")]
    UnknownName(String),
}

/// The on-disk vault of account secrets.
pub struct VaultStore {
    path: PathBuf,
}

impl VaultStore {
    /// Opens the vault at its platform-default location.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoPlatformConfigDir`] when the platform config
    /// base directory cannot be determined from the environment.
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = platform_config_dir().ok_or(StoreError::NoPlatformConfigDir)?;
        Ok(Self {
            path: dir.join("secrets.json"),
        })
    }

    /// Opens a vault at an explicit path. Used by tests and by anything that
    /// wants an isolated vault file.
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// The vault file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the full secret set. A missing file is an empty vault.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for file-system errors other than "not
    /// found", and [`StoreError::Parse`] if the JSON is malformed.
    pub fn load(&self) -> Result<SecretSet, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SecretSet::new()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Persists the full secret set, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for file-system failures.
    pub fn save(&self, secrets: &SecretSet) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(secrets)?;
        std::fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("saved {} entries to {}", secrets.len(), self.path.display());
        Ok(())
    }

    /// Adds a new entry, refusing to replace an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateName`] when `name` is already stored.
    pub fn add(&self, name: &str, secret: &str) -> Result<(), StoreError> {
        let mut secrets = self.load()?;
        if secrets.contains(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        secrets.insert(name, secret);
        self.save(&secrets)
    }

    /// Renames an entry, keeping its secret.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownName`] when `old` does not exist.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), StoreError> {
        let mut secrets = self.load()?;
        if !secrets.rename(old, new) {
            return Err(StoreError::UnknownName(old.to_string()));
        }
        self.save(&secrets)
    }

    /// Deletes an entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownName`] when `name` does not exist.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut secrets = self.load()?;
        if secrets.remove(name).is_none() {
            return Err(StoreError::UnknownName(name.to_string()));
        }
        self.save(&secrets)
    }

    /// Merges a received secret set into the vault. Incoming entries
    /// overwrite same-named local ones. Returns the number of entries
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] / [`StoreError::Parse`] on load or save
    /// failure; on failure the vault file is left unchanged.
    pub fn merge(&self, incoming: SecretSet) -> Result<usize, StoreError> {
        let mut secrets = self.load()?;
        let applied = secrets.merge(incoming);
        self.save(&secrets)?;
        Ok(applied)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
