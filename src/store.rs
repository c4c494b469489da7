//! Rating Store
//!
//! JSON file holding the designated subject's global rating plus per-user
//! ratings. The whole file is read and rewritten on every call.
//!
//! File format:
//! ```json
//! { "rating": -20, "users": { "123456": 30 } }
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Whose rating is being read or changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    /// The single designated subject
    Global,
    /// Any chat member, by Telegram user id
    User(i64),
}

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct RatingFile {
    #[serde(default)]
    rating: i64,
    #[serde(default)]
    users: BTreeMap<i64, i64>,
}

impl RatingFile {
    fn get(&self, subject: Subject) -> i64 {
        match subject {
            Subject::Global => self.rating,
            Subject::User(id) => self.users.get(&id).copied().unwrap_or(0),
        }
    }

    fn slot(&mut self, subject: Subject) -> &mut i64 {
        match subject {
            Subject::Global => &mut self.rating,
            Subject::User(id) => self.users.entry(id).or_insert(0),
        }
    }
}

/// File-backed rating store
pub struct RatingStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl RatingStore {
    /// Open a store at the given path. The file is created on first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Rating store: {:?}", path);
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current score, 0 if never set
    pub fn score(&self, subject: Subject) -> Result<i64, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.get(subject))
    }

    /// Add `delta` to the subject's score, persist, return the new score
    pub fn adjust(&self, subject: Subject, delta: i64) -> Result<i64, StoreError> {
        let _guard = self.lock.lock();
        let mut data = self.load()?;
        let slot = data.slot(subject);
        *slot = slot.saturating_add(delta);
        let updated = *slot;
        self.save(&data)?;
        debug!("Rating {:?} {:+} -> {}", subject, delta, updated);
        Ok(updated)
    }

    /// Zero the global score. Per-user scores are kept.
    pub fn reset_global(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut data = self.load()?;
        data.rating = 0;
        self.save(&data)?;
        info!("Global rating reset");
        Ok(())
    }

    fn load(&self) -> Result<RatingFile, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RatingFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, data: &RatingFile) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
