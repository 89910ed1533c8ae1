//! Alert Service
//!
//! The single owning task of the proximity alert engine. Consumes the
//! position-fix stream and the control-signal channel, runs the per-fix
//! pipeline in arrival order, drives the periodic burst probe, and
//! broadcasts a status event per processed fix for the external display
//! collaborator.

mod engine;

pub use engine::{AlertEngine, EngineCommand, EngineConfig, EngineHandle};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Location read permission missing, engine not started")]
    PermissionDenied,

    #[error("Fix source error: {0}")]
    Fix(#[from] location_capture::FixError),
}

/// Install the global tracing subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
