//! File-based storage for ingested datasets
//!
//! One directory per dataset under `data/datasets/<id>/`:
//! - `records.json`: the classified record rows (the blob)
//! - `metadata.json`: id, filename, timestamp, summary (the index entry)
//!
//! The metadata file is written last so a half-written directory is never
//! visible as a retained dataset.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::data_paths::DataPaths;
use crate::errors::PersistenceError;
use crate::ingest::stats::Summary;
use crate::types::{Dataset, EquipmentRecord};

const RECORDS_FILE: &str = "records.json";
const METADATA_FILE: &str = "metadata.json";

/// Reference to one locally persisted dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetHandle {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct DatasetMetadata {
    id: Uuid,
    filename: String,
    created_at: DateTime<Utc>,
    summary: Summary,
}

pub struct FileStore {
    paths: DataPaths,
}

impl FileStore {
    pub fn new(paths: DataPaths) -> Result<Self, PersistenceError> {
        paths
            .ensure_directories()
            .map_err(|e| PersistenceError::Write {
                path: paths.datasets(),
                source: e,
            })?;
        Ok(Self { paths })
    }

    /// Persist a dataset. On any failure the partially written directory is
    /// removed before the error is returned, leaving no orphaned state.
    pub fn save(&self, dataset: &Dataset) -> Result<DatasetHandle, PersistenceError> {
        let dir = self.paths.datasets().join(dataset.id.to_string());

        let result = self.write_dataset(&dir, dataset);
        if let Err(e) = result {
            if dir.exists() {
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    warn!(path = %dir.display(), error = %cleanup, "failed to clean up partial dataset");
                }
            }
            return Err(e);
        }

        debug!(id = %dataset.id, path = %dir.display(), "dataset persisted");
        Ok(DatasetHandle {
            id: dataset.id,
            filename: dataset.filename.clone(),
            created_at: dataset.created_at,
            path: dir,
        })
    }

    fn write_dataset(&self, dir: &PathBuf, dataset: &Dataset) -> Result<(), PersistenceError> {
        fs::create_dir_all(dir).map_err(|e| PersistenceError::Write {
            path: dir.clone(),
            source: e,
        })?;

        let records_path = dir.join(RECORDS_FILE);
        let records_json = serde_json::to_string_pretty(&dataset.records).map_err(|e| {
            PersistenceError::Corrupt {
                path: records_path.clone(),
                source: e,
            }
        })?;
        fs::write(&records_path, records_json).map_err(|e| PersistenceError::Write {
            path: records_path,
            source: e,
        })?;

        // Index entry last
        let metadata = DatasetMetadata {
            id: dataset.id,
            filename: dataset.filename.clone(),
            created_at: dataset.created_at,
            summary: dataset.summary.clone(),
        };
        let metadata_path = dir.join(METADATA_FILE);
        let metadata_json =
            serde_json::to_string_pretty(&metadata).map_err(|e| PersistenceError::Corrupt {
                path: metadata_path.clone(),
                source: e,
            })?;
        fs::write(&metadata_path, metadata_json).map_err(|e| PersistenceError::Write {
            path: metadata_path,
            source: e,
        })
    }

    /// Delete a dataset: blob first, index entry second. A blob that will
    /// not delete is logged and the index removal still proceeds.
    pub fn delete(&self, handle: &DatasetHandle) -> Result<(), PersistenceError> {
        let records_path = handle.path.join(RECORDS_FILE);
        if records_path.exists() {
            if let Err(e) = fs::remove_file(&records_path) {
                warn!(path = %records_path.display(), error = %e, "failed to delete dataset blob");
            }
        }

        fs::remove_dir_all(&handle.path).map_err(|e| PersistenceError::Delete {
            path: handle.path.clone(),
            source: e,
        })
    }

    /// Handles of all persisted datasets, newest first.
    pub fn list_recent(&self) -> Result<Vec<DatasetHandle>, PersistenceError> {
        let datasets_dir = self.paths.datasets();
        let entries = fs::read_dir(&datasets_dir).map_err(|e| PersistenceError::Read {
            path: datasets_dir.clone(),
            source: e,
        })?;

        let mut handles = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            match self.read_metadata(&dir) {
                Ok(metadata) => handles.push(DatasetHandle {
                    id: metadata.id,
                    filename: metadata.filename,
                    created_at: metadata.created_at,
                    path: dir,
                }),
                Err(e) => {
                    // A directory without readable metadata is not part of
                    // the retained set
                    warn!(path = %dir.display(), error = %e, "skipping unreadable dataset directory");
                }
            }
        }

        handles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(handles)
    }

    /// Load the full dataset behind a handle.
    pub fn load(&self, handle: &DatasetHandle) -> Result<Dataset, PersistenceError> {
        let metadata = self.read_metadata(&handle.path)?;

        let records_path = handle.path.join(RECORDS_FILE);
        let records_json = fs::read_to_string(&records_path).map_err(|e| PersistenceError::Read {
            path: records_path.clone(),
            source: e,
        })?;
        let records: Vec<EquipmentRecord> =
            serde_json::from_str(&records_json).map_err(|e| PersistenceError::Corrupt {
                path: records_path,
                source: e,
            })?;

        Ok(Dataset {
            id: metadata.id,
            filename: metadata.filename,
            created_at: metadata.created_at,
            records,
            summary: metadata.summary,
        })
    }

    fn read_metadata(&self, dir: &PathBuf) -> Result<DatasetMetadata, PersistenceError> {
        let metadata_path = dir.join(METADATA_FILE);
        let contents = fs::read_to_string(&metadata_path).map_err(|e| PersistenceError::Read {
            path: metadata_path.clone(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| PersistenceError::Corrupt {
            path: metadata_path,
            source: e,
        })
    }
}
