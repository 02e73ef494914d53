pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub weak_points: sled::Tree,
    pub weak_point_digests: sled::Tree,
    pub modules: sled::Tree,
    pub lessons: sled::Tree,
    pub lesson_module_index: sled::Tree,
    pub meta: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl StoreError {
    pub fn not_found(entity: &str, key: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }

    pub fn conflict(entity: &str, key: &str) -> Self {
        Self::Conflict {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let weak_points = db.open_tree(trees::WEAK_POINTS)?;
        let weak_point_digests = db.open_tree(trees::WEAK_POINT_DIGESTS)?;
        let modules = db.open_tree(trees::MODULES)?;
        let lessons = db.open_tree(trees::LESSONS)?;
        let lesson_module_index = db.open_tree(trees::LESSON_MODULE_INDEX)?;
        let meta = db.open_tree(trees::META)?;

        Ok(Self {
            db,
            weak_points,
            weak_point_digests,
            modules,
            lessons,
            lesson_module_index,
            meta,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn raw_db(&self) -> &Db {
        &self.db
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
