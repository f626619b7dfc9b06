//! Static crag catalog backed by precomputed distance datasets
//!
//! `origins.json` in the data directory maps an origin city to the
//! distance dataset files covering it; each dataset is a JSON array of
//! catalog entries produced offline by the distance fetcher. The catalog
//! is never mutated at runtime.

use std::collections::HashMap;
use std::path::PathBuf;

use shared::Crag;

use crate::error::{AppError, AppResult};

/// Catalog of crags reachable from known origin cities
#[derive(Clone)]
pub struct CatalogStore {
    data_dir: PathBuf,
}

impl CatalogStore {
    /// Create a catalog store over a data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load all catalog entries for an origin city, preserving file order
    /// and entry order.
    ///
    /// An unknown origin yields an empty catalog. An unreadable or corrupt
    /// dataset file is logged and skipped; the remaining files still load.
    pub fn load_for_origin(&self, origin: &str) -> AppResult<Vec<Crag>> {
        let index_path = self.data_dir.join("origins.json");
        let raw = std::fs::read_to_string(&index_path).map_err(|e| {
            AppError::Configuration(format!(
                "cannot read catalog index {}: {}",
                index_path.display(),
                e
            ))
        })?;

        let filenames = origin_datasets(&raw, origin).map_err(|e| {
            AppError::Configuration(format!(
                "invalid catalog index {}: {}",
                index_path.display(),
                e
            ))
        })?;

        let mut crags = Vec::new();
        for filename in filenames {
            let path = self.data_dir.join("distances").join(&filename);
            match std::fs::read_to_string(&path) {
                Ok(contents) => match parse_dataset(&contents) {
                    Ok(mut entries) => crags.append(&mut entries),
                    Err(e) => {
                        tracing::warn!("Skipping corrupt dataset {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Skipping unreadable dataset {}: {}", path.display(), e);
                }
            }
        }

        Ok(crags)
    }
}

/// Resolve the dataset filenames for an origin from the index JSON
pub fn origin_datasets(index_json: &str, origin: &str) -> Result<Vec<String>, serde_json::Error> {
    let index: HashMap<String, Vec<String>> = serde_json::from_str(index_json)?;
    Ok(index.get(origin).cloned().unwrap_or_default())
}

/// Parse one distance dataset (a JSON array of crag entries)
pub fn parse_dataset(contents: &str) -> Result<Vec<Crag>, serde_json::Error> {
    serde_json::from_str(contents)
}
