//! Disk backed [`KeyValueStore`] using sled.
//!
//! Every entry lives in a single tree so the client state can share a sled
//! database with other data.

use chain_governance::{KeyValueStore, StoreError};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const DEFAULT_TREE: &str = "governance-client";

#[derive(Debug, Error)]
pub enum SledStoreError {
    #[error("cannot open the store")]
    Open(#[from] sled::Error),
}

#[derive(Clone)]
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SledStoreError> {
        let db = sled::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened governance store");
        Self::with_db(&db, DEFAULT_TREE)
    }

    /// Store removed from disk once the last handle is dropped.
    pub fn temporary() -> Result<Self, SledStoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(&db, DEFAULT_TREE)
    }

    pub fn with_db(db: &sled::Db, tree: &str) -> Result<Self, SledStoreError> {
        Ok(Self {
            tree: db.open_tree(tree)?,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush().map(|_| ()).map_err(backend)
    }
}

fn backend(error: sled::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.tree.get(key.as_bytes()).map_err(backend)? {
            Some(raw) => String::from_utf8(raw.to_vec())
                .map(Some)
                .map_err(|_| StoreError::InvalidValue {
                    key: key.to_owned(),
                }),
            None => Ok(None),
        }
    }

    /// Durability is left to sled's background flush, call
    /// [`SledStore::flush`] to force it.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.tree
            .insert(key.as_bytes(), value.as_bytes())
            .map(|_| ())
            .map_err(backend)
    }
}
