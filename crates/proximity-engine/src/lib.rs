//! Proximity Alert Engine Core
//!
//! Per-fix decision pipeline for speed-enforcement camera alerts:
//! - Candidate selection with directional filtering (`selector`)
//! - Approach/alarm/pass state machine over a single tracked hazard
//!   (`tracker`)
//! - Per-hazard per-threshold notification dedup with geographic eviction
//!   (`memory`)
//!
//! The tracker is a synchronous decision function: the owning task feeds it
//! one fix (plus the selected candidate) at a time and acts on the returned
//! alert commands, so no locking is needed around session state.

pub mod memory;
pub mod selector;
pub mod session;
pub mod tracker;

pub use memory::{Marker, NotificationMemory};
pub use selector::{select_candidate, SelectorConfig};
pub use session::TrackingSession;
pub use tracker::{AlertCommand, FixOutcome, ProximityTracker, StatusEvent, TrackerConfig};
