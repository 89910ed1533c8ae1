//! Hazard set loading and replace-on-reload

use crate::record::{HazardRecord, RawHazard};
use crate::StoreError;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Where the hazard database is read from.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Downloaded cache file; preferred when present and readable
    pub cache_path: PathBuf,
    /// Bundled default shipped with the application
    pub bundled_path: PathBuf,
}

/// In-memory hazard set with wholesale reload.
///
/// The loaded set is handed out as an `Arc` snapshot so a reload never
/// invalidates a scan already in flight.
pub struct HazardStore {
    config: StoreConfig,
    hazards: Mutex<Arc<Vec<HazardRecord>>>,
}

impl HazardStore {
    /// Load the database from the cache file if present, else the bundled
    /// default. A present-but-unreadable cache falls back to the bundled
    /// default; per-record validation failures skip the record only.
    pub fn load(config: StoreConfig) -> Result<Self, StoreError> {
        let hazards = match Self::read_set(&config.cache_path) {
            Ok(set) => {
                info!(count = set.len(), path = %config.cache_path.display(), "Loaded cached hazard database");
                set
            }
            Err(e) => {
                if config.cache_path.exists() {
                    warn!(error = %e, "Cached hazard database unreadable, using bundled default");
                }
                let set = Self::read_set(&config.bundled_path)
                    .map_err(|_| StoreError::NoDatabase)?;
                info!(count = set.len(), "Loaded bundled hazard database");
                set
            }
        };

        Ok(Self {
            config,
            hazards: Mutex::new(Arc::new(hazards)),
        })
    }

    /// Replace the hazard set wholesale from the cache file. On failure the
    /// previously loaded set is retained.
    pub fn reload(&self) -> Result<usize, StoreError> {
        match Self::read_set(&self.config.cache_path) {
            Ok(set) => {
                let count = set.len();
                if let Ok(mut hazards) = self.hazards.lock() {
                    *hazards = Arc::new(set);
                }
                info!(count, "Hazard database reloaded");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "Hazard database reload failed, retaining previous set");
                Err(e)
            }
        }
    }

    /// Snapshot of the current hazard set.
    pub fn snapshot(&self) -> Arc<Vec<HazardRecord>> {
        match self.hazards.lock() {
            Ok(hazards) => Arc::clone(&hazards),
            Err(e) => {
                warn!(error = %e, "Hazard set lock poisoned, reporting empty set");
                Arc::default()
            }
        }
    }

    fn read_set(path: &std::path::Path) -> Result<Vec<HazardRecord>, StoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_set(&text)
    }

    /// Parse a JSON array of raw records, skipping the invalid ones.
    pub fn parse_set(text: &str) -> Result<Vec<HazardRecord>, StoreError> {
        let raw: Vec<RawHazard> = serde_json::from_str(text)?;
        let total = raw.len();
        let hazards: Vec<HazardRecord> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(i, r)| r.validate(i))
            .collect();
        if hazards.len() < total {
            warn!(
                skipped = total - hazards.len(),
                total, "Some hazard records were malformed and skipped"
            );
        }
        Ok(hazards)
    }
}
