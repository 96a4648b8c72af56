//! Per-user playground preferences

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

use crate::types::{PlaygroundSettings, RustChannel, RustEdition, RustMode};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("settings file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Stored preferences of one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsEntry {
    pub user_id: u64,
    #[serde(default)]
    pub rust_channel: RustChannel,
    #[serde(default)]
    pub rust_edition: RustEdition,
    #[serde(default)]
    pub rust_mode: RustMode,
}

impl SettingsEntry {
    /// Defaults: nightly, 2018 edition, debug
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            rust_channel: RustChannel::default(),
            rust_edition: RustEdition::default(),
            rust_mode: RustMode::default(),
        }
    }

    pub fn playground_settings(&self) -> PlaygroundSettings {
        PlaygroundSettings {
            channel: self.rust_channel,
            edition: self.rust_edition,
            mode: self.rust_mode,
        }
    }
}

/// Partial update of the Rust preferences; `None` leaves a value alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RustSettingsUpdate {
    pub channel: Option<RustChannel>,
    pub edition: Option<RustEdition>,
    pub mode: Option<RustMode>,
}

impl RustSettingsUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channel.is_none() && self.edition.is_none() && self.mode.is_none()
    }

    /// Apply to `entry`, returning whether anything changed
    pub fn apply(&self, entry: &mut SettingsEntry) -> bool {
        let before = *entry;
        if let Some(channel) = self.channel {
            entry.rust_channel = channel;
        }
        if let Some(edition) = self.edition {
            entry.rust_edition = edition;
        }
        if let Some(mode) = self.mode {
            entry.rust_mode = mode;
        }
        before != *entry
    }
}

/// Storage for user preferences
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Preferences of `user_id`, defaults if none are stored
    async fn get(&self, user_id: u64) -> Result<SettingsEntry, SettingsError>;

    /// Change the Rust preferences of `user_id`
    ///
    /// Storage is only written when a value actually changes.
    async fn update_rust(
        &self,
        user_id: u64,
        update: RustSettingsUpdate,
    ) -> Result<SettingsEntry, SettingsError>;
}

/// In-memory store, lost on exit
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    entries: RwLock<HashMap<u64, SettingsEntry>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, user_id: u64) -> Result<SettingsEntry, SettingsError> {
        if let Some(entry) = self.entries.read().await.get(&user_id) {
            return Ok(*entry);
        }
        let mut entries = self.entries.write().await;
        Ok(*entries
            .entry(user_id)
            .or_insert_with(|| SettingsEntry::new(user_id)))
    }

    async fn update_rust(
        &self,
        user_id: u64,
        update: RustSettingsUpdate,
    ) -> Result<SettingsEntry, SettingsError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(user_id)
            .or_insert_with(|| SettingsEntry::new(user_id));
        update.apply(entry);
        Ok(*entry)
    }
}

/// Store backed by one JSON file keyed by user id
///
/// The file is read on first access and rewritten whenever a preference
/// changes. A missing file is treated as empty. Defaults handed out by
/// [`get`](SettingsStore::get) are not persisted.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<u64, SettingsEntry>>>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read(&self) -> Result<BTreeMap<u64, SettingsEntry>, SettingsError> {
        match tokio::fs::read(&self.path).await {
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn write(&self, entries: &BTreeMap<u64, SettingsEntry>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let content = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), users = entries.len(), "wrote settings");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, user_id: u64) -> Result<SettingsEntry, SettingsError> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.read().await?);
        }
        Ok(guard
            .as_ref()
            .and_then(|entries| entries.get(&user_id).copied())
            .unwrap_or_else(|| SettingsEntry::new(user_id)))
    }

    #[instrument(skip(self))]
    async fn update_rust(
        &self,
        user_id: u64,
        update: RustSettingsUpdate,
    ) -> Result<SettingsEntry, SettingsError> {
        let mut guard = self.entries.lock().await;
        let mut entries = match guard.take() {
            Some(entries) => entries,
            None => self.read().await?,
        };

        let mut entry = entries
            .get(&user_id)
            .copied()
            .unwrap_or_else(|| SettingsEntry::new(user_id));

        let previous = entries.get(&user_id).copied();
        let result = if update.apply(&mut entry) {
            entries.insert(user_id, entry);
            let written = self.write(&entries).await;
            if written.is_err() {
                // Keep the cache in step with what is on disk
                match previous {
                    Some(previous) => entries.insert(user_id, previous),
                    None => entries.remove(&user_id),
                };
            }
            written
        } else {
            Ok(())
        };

        *guard = Some(entries);
        result.map(|()| entry)
    }
}
