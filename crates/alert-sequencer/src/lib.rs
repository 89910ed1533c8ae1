//! Alert Sequencer
//!
//! Plays ordered chains of audio cues with haptic escalation:
//! - Starting a new cue always truncates the current one (no queueing)
//! - The closest-threshold chain escalates into a looping alarm cue with
//!   haptics and a 30 s auto-stop timer
//! - Playback needs the audio-focus arbitration token; denial skips the cue
//! - A generation counter makes every timer and completion cancellable, so a
//!   stale continuation can never act after a newer cue has started
//!
//! Platform audio/haptic access sits behind the `AudioSink`, `AudioFocus`
//! and `Haptics` traits; the engine only ever talks to `AlertSequencer`.

pub mod cue;
pub mod sequencer;

pub use cue::CueId;
pub use sequencer::{AlertSequencer, AudioFocus, AudioSink, Haptics, SequencerConfig};

use thiserror::Error;

/// Audio playback error types
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio asset missing: {0}")]
    AssetMissing(&'static str),

    #[error("Playback failed: {0}")]
    Playback(String),
}
