//! Chain playback driver

use crate::cue::{notification_chain, CueId};
use crate::AudioError;
use proximity_engine::AlertCommand;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Platform audio playback capability. `play` starts the cue and returns a
/// completion signal; looping cues never complete.
pub trait AudioSink: Send + Sync {
    fn play(&self, cue: CueId, looping: bool) -> Result<oneshot::Receiver<()>, AudioError>;
    fn stop(&self);
}

/// Exclusive audio-output arbitration token.
pub trait AudioFocus: Send + Sync {
    /// Try to acquire the token. `false` means another output holds it.
    fn acquire(&self) -> bool;
    fn release(&self);
}

/// Haptic feedback capability.
pub trait Haptics: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Sequencer configuration
#[derive(Debug, Clone, Copy)]
pub struct SequencerConfig {
    /// Hard bound on the looping alarm cue
    pub alarm_auto_stop: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            alarm_auto_stop: Duration::from_secs(30),
        }
    }
}

/// Ordered, cancellable cue playback.
///
/// Every chain start bumps the generation counter; spawned continuations
/// (the chain driver and the alarm auto-stop timer) re-check the counter
/// before touching state, so a superseded chain or a cancelled timer can
/// never act after a newer cue has started.
#[derive(Clone)]
pub struct AlertSequencer {
    audio: Arc<dyn AudioSink>,
    focus: Arc<dyn AudioFocus>,
    haptics: Arc<dyn Haptics>,
    config: SequencerConfig,
    alarm_active: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl AlertSequencer {
    pub fn new(
        audio: Arc<dyn AudioSink>,
        focus: Arc<dyn AudioFocus>,
        haptics: Arc<dyn Haptics>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            audio,
            focus,
            haptics,
            config,
            alarm_active: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether the continuous alarm cue is currently running.
    pub fn alarm_active(&self) -> bool {
        self.alarm_active.load(Ordering::SeqCst)
    }

    /// Act on one state-machine command.
    pub fn handle(&self, command: &AlertCommand) {
        match command {
            AlertCommand::Notify {
                threshold_m,
                category,
                road_class,
                lowest,
            } => {
                let chain = notification_chain(*threshold_m, *category, *road_class);
                self.start_chain(chain, *lowest);
            }
            AlertCommand::HazardPassed => {
                // Alarm and haptics stop immediately, then the passed cue
                self.stop();
                self.start_chain(vec![CueId::Passed], false);
            }
        }
    }

    /// Stop playback and haptics, clear the alarm, cancel pending timers,
    /// and release the focus token. Safe on every exit path.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.audio.stop();
        self.haptics.stop();
        if self.alarm_active.swap(false, Ordering::SeqCst) {
            info!("Alarm stopped");
        }
        self.focus.release();
    }

    fn start_chain(&self, chain: Vec<CueId>, escalate: bool) {
        let this = self.clone();
        tokio::spawn(async move { this.run_chain(chain, escalate).await });
    }

    async fn run_chain(self, chain: Vec<CueId>, escalate: bool) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // A new cue always truncates whatever is playing
        self.audio.stop();

        if !self.focus.acquire() {
            warn!("Audio focus denied, cue chain skipped");
            return;
        }

        for cue in chain {
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("Cue chain superseded");
                self.focus.release();
                return;
            }
            match self.audio.play(cue, false) {
                // A dropped sender also counts as completion
                Ok(done) => {
                    let _ = done.await;
                }
                // Proceed as if the cue completed so the chain is never stuck
                Err(e) => warn!(cue = cue.asset_name(), error = %e, "Cue playback failed"),
            }
        }

        if self.generation.load(Ordering::SeqCst) != generation {
            self.focus.release();
            return;
        }

        if escalate && !self.alarm_active.load(Ordering::SeqCst) {
            self.start_alarm(generation);
        } else {
            self.focus.release();
        }
    }

    /// Start the looping alarm cue and haptics, holding focus until the
    /// alarm stops, and arm the auto-stop timer.
    fn start_alarm(&self, generation: u64) {
        if let Err(e) = self.audio.play(CueId::AlarmLoop, true) {
            warn!(error = %e, "Alarm cue failed to start");
        }
        self.haptics.start();
        self.alarm_active.store(true, Ordering::SeqCst);
        info!("Alarm started");

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.config.alarm_auto_stop).await;
            // A newer chain or a manual stop has already bumped the
            // generation; this timer is then stale and must not fire
            if this.generation.load(Ordering::SeqCst) == generation {
                info!("Alarm auto-stop timeout");
                this.stop();
            }
        });
    }
}
