//! Location Capture
//!
//! The position-fix input capability for the alert engine:
//! - `PositionFix`: one immutable GPS sample
//! - `FixSource`: reconfigure the fix interval (or suspend), request bounded
//!   burst sub-sessions, and expose permission state
//! - `ChannelFixSource`: channel-backed implementation for tests and
//!   simulation
//!
//! The engine never talks to a platform location API directly; the platform
//! layer implements `FixSource` and feeds fixes through a channel.

pub mod fix;
pub mod source;

pub use fix::PositionFix;
pub use source::{ChannelFixSource, FixSource, SourceState};

use thiserror::Error;

/// Fix input error types
#[derive(Error, Debug)]
pub enum FixError {
    #[error("Location read permission denied")]
    PermissionDenied,

    #[error("Fix source closed")]
    SourceClosed,

    #[error("Reconfiguration failed: {0}")]
    Reconfigure(String),
}
