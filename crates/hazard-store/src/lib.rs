//! Hazard Database
//!
//! Speed-enforcement camera records for the proximity alert engine:
//! - Closed category/road-class enums validated at load time
//! - JSON loading that skips malformed records instead of aborting
//! - Cache-file vs. bundled-default resolution at startup
//! - Wholesale replace-on-reload; an unreadable replacement keeps the
//!   previous set

pub mod record;
pub mod store;

pub use record::{HazardCategory, HazardKey, HazardRecord, RoadClass};
pub use store::{HazardStore, StoreConfig};

use thiserror::Error;

/// Hazard store error types
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read hazard database: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse hazard database: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No hazard database available (no cache file, no bundled default)")]
    NoDatabase,
}
