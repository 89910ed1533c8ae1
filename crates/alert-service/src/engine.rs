//! Engine task and handle

use crate::EngineError;
use alert_sequencer::AlertSequencer;
use hazard_store::HazardStore;
use location_capture::{FixSource, PositionFix};
use proximity_engine::{select_candidate, ProximityTracker, StatusEvent, TrackerConfig};
use sampling_control::{collect_burst_speeds, SamplingConfig, SamplingController};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Control signals consumed by the engine task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// The observer-facing surface came to the foreground
    ForegroundEntered,
    /// The observer-facing surface went to the background
    BackgroundEntered,
    /// The hazard database cache file was replaced
    DatabaseReloaded,
    Shutdown,
}

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub sampling: SamplingConfig,
    pub tracker: TrackerConfig,
}

/// Handle to a running engine: control signals in, status events out.
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    status_tx: broadcast::Sender<StatusEvent>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// Send a control signal. Dropped silently if the engine has stopped.
    pub async fn command(&self, command: EngineCommand) {
        if self.commands.send(command).await.is_err() {
            warn!(?command, "Engine already stopped, command dropped");
        }
    }

    /// Subscribe to per-fix status events.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.status_tx.subscribe()
    }

    /// Stop the engine and wait for teardown to complete.
    pub async fn shutdown(self) {
        let _ = self.commands.send(EngineCommand::Shutdown).await;
        let _ = self.task.await;
    }
}

/// The proximity alert engine.
///
/// Single logical owner of the tracking session, the sampling state and the
/// notification memory: every mutation happens on the engine task, driven by
/// fix arrivals and control signals, so the state machine needs no locking.
pub struct AlertEngine {
    config: EngineConfig,
    source: Arc<dyn FixSource>,
    fixes: mpsc::Receiver<PositionFix>,
    commands: mpsc::Receiver<EngineCommand>,
    store: HazardStore,
    tracker: ProximityTracker,
    controller: SamplingController,
    sequencer: AlertSequencer,
    status_tx: broadcast::Sender<StatusEvent>,
    burst_tx: mpsc::Sender<Option<Vec<f64>>>,
    burst_rx: mpsc::Receiver<Option<Vec<f64>>>,
    burst_in_flight: bool,
}

impl AlertEngine {
    /// Start the engine. Fails without the location read permission; no
    /// hazard processing occurs in that case.
    pub fn start(
        source: Arc<dyn FixSource>,
        fixes: mpsc::Receiver<PositionFix>,
        store: HazardStore,
        sequencer: AlertSequencer,
        config: EngineConfig,
    ) -> Result<EngineHandle, EngineError> {
        if !source.permission_granted() {
            error!("Location permission missing, engine not started");
            return Err(EngineError::PermissionDenied);
        }

        let (command_tx, command_rx) = mpsc::channel(16);
        let (status_tx, _) = broadcast::channel(64);
        let (burst_tx, burst_rx) = mpsc::channel(4);

        let mut controller = SamplingController::new(config.sampling.clone());
        controller.apply(source.as_ref());

        let engine = Self {
            tracker: ProximityTracker::new(config.tracker.clone()),
            config,
            source,
            fixes,
            commands: command_rx,
            store,
            controller,
            sequencer,
            status_tx: status_tx.clone(),
            burst_tx,
            burst_rx,
            burst_in_flight: false,
        };

        info!("Alert engine started");
        let task = tokio::spawn(engine.run());

        Ok(EngineHandle {
            commands: command_tx,
            status_tx,
            task,
        })
    }

    async fn run(mut self) {
        let mut burst_timer = tokio::time::interval(self.controller.burst_period());
        burst_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval fires immediately on creation; the first probe is driven
        // by the background-entered signal instead
        burst_timer.tick().await;

        loop {
            tokio::select! {
                maybe_fix = self.fixes.recv() => match maybe_fix {
                    Some(fix) => self.handle_fix(fix).await,
                    None => {
                        info!("Fix stream closed");
                        break;
                    }
                },
                Some(command) = self.commands.recv() => {
                    if self.handle_command(command) {
                        break;
                    }
                }
                _ = burst_timer.tick() => self.maybe_start_burst(),
                Some(result) = self.burst_rx.recv() => {
                    self.burst_in_flight = false;
                    if let Some(speeds) = result {
                        self.controller.finish_burst(&speeds, self.source.as_ref());
                    }
                }
            }
        }

        self.teardown();
    }

    /// Process one fix end to end. Fixes are handled strictly in arrival
    /// order; the candidate scan runs on a blocking worker and rejoins this
    /// task before any state is mutated.
    async fn handle_fix(&mut self, fix: PositionFix) {
        let bearing = self.tracker.update_bearing(&fix);
        let hazards = self.store.snapshot();
        let selector = self.tracker.config().selector.clone();

        let candidate = match tokio::task::spawn_blocking(move || {
            select_candidate(&fix, bearing, &hazards, &selector)
        })
        .await
        {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(error = %e, "Candidate scan failed");
                None
            }
        };

        let outcome = self
            .tracker
            .process_fix(&fix, candidate, self.sequencer.alarm_active());
        for command in &outcome.commands {
            self.sequencer.handle(command);
        }

        // No receivers is fine; the display collaborator may not be attached
        let _ = self.status_tx.send(outcome.status);
    }

    /// Returns true when the engine should stop.
    fn handle_command(&mut self, command: EngineCommand) -> bool {
        debug!(?command, "Control signal");
        match command {
            EngineCommand::ForegroundEntered => {
                self.controller.set_foreground(true, self.source.as_ref());
            }
            EngineCommand::BackgroundEntered => {
                self.controller.set_foreground(false, self.source.as_ref());
                // Probe once right away; the periodic timer takes over after
                self.maybe_start_burst();
            }
            EngineCommand::DatabaseReloaded => {
                // Failure keeps the previous set; already logged by the store
                let _ = self.store.reload();
            }
            EngineCommand::Shutdown => return true,
        }
        false
    }

    /// Kick off a burst probe unless foregrounded or one is outstanding.
    fn maybe_start_burst(&mut self) {
        if self.controller.foreground() || self.burst_in_flight {
            return;
        }
        self.burst_in_flight = true;

        let source = Arc::clone(&self.source);
        let config = self.config.sampling.clone();
        let result_tx = self.burst_tx.clone();
        tokio::spawn(async move {
            let result = collect_burst_speeds(source.as_ref(), &config).await;
            let _ = result_tx.send(result).await;
        });
    }

    fn teardown(&mut self) {
        self.sequencer.stop();
        if self.source.configure(None).is_err() {
            debug!("Fix source already unavailable at teardown");
        }
        info!("Alert engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_sequencer::{AudioError, AudioFocus, AudioSink, CueId, Haptics, SequencerConfig};
    use hazard_store::StoreConfig;
    use location_capture::ChannelFixSource;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    const METERS_PER_DEG_LAT: f64 = 111_195.0;

    const ONE_FIXED_HAZARD: &str = r#"[
        {"decLatitude": 35.0, "decLongitude": 135.0, "intSystemType": 1, "intDirection": 180, "intRoadType": 1}
    ]"#;

    #[derive(Default)]
    struct InstantSink {
        plays: Mutex<Vec<CueId>>,
    }

    impl AudioSink for InstantSink {
        fn play(&self, cue: CueId, looping: bool) -> Result<oneshot::Receiver<()>, AudioError> {
            self.plays.lock().unwrap().push(cue);
            let (tx, rx) = oneshot::channel();
            if !looping {
                let _ = tx.send(());
            } else {
                // Leak the sender so the loop never "completes"
                std::mem::forget(tx);
            }
            Ok(rx)
        }

        fn stop(&self) {}
    }

    struct OpenFocus;
    impl AudioFocus for OpenFocus {
        fn acquire(&self) -> bool {
            true
        }
        fn release(&self) {}
    }

    struct NoHaptics;
    impl Haptics for NoHaptics {
        fn start(&self) {}
        fn stop(&self) {}
    }

    fn temp_store(name: &str, contents: &str) -> (HazardStore, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "alert-service-test-{}-{}.json",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        let store = HazardStore::load(StoreConfig {
            cache_path: path.clone(),
            bundled_path: path.clone(),
        })
        .unwrap();
        (store, path)
    }

    fn test_rig(
        name: &str,
    ) -> (
        Arc<ChannelFixSource>,
        mpsc::Receiver<PositionFix>,
        HazardStore,
        AlertSequencer,
        Arc<InstantSink>,
        PathBuf,
    ) {
        let (source, fixes) = ChannelFixSource::new();
        let (store, path) = temp_store(name, ONE_FIXED_HAZARD);
        let sink = Arc::new(InstantSink::default());
        let sequencer = AlertSequencer::new(
            Arc::clone(&sink) as Arc<dyn AudioSink>,
            Arc::new(OpenFocus),
            Arc::new(NoHaptics),
            SequencerConfig::default(),
        );
        (Arc::new(source), fixes, store, sequencer, sink, path)
    }

    /// Fix `distance_m` south of the hazard, heading north at speed.
    fn approach_fix(distance_m: f64) -> PositionFix {
        PositionFix::new(35.0 - distance_m / METERS_PER_DEG_LAT, 135.0, 40.0, 5.0)
    }

    #[tokio::test]
    async fn test_start_fails_without_permission() {
        let (source, fixes, store, sequencer, _sink, path) = test_rig("no-permission");
        source.set_permission(false);

        let result = AlertEngine::start(
            source,
            fixes,
            store,
            sequencer,
            EngineConfig::default(),
        );
        assert!(matches!(result, Err(EngineError::PermissionDenied)));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_approach_drive_alerts_and_escalates() {
        let (source, fixes, store, sequencer, sink, path) = test_rig("approach");
        let seq_probe = sequencer.clone();

        let handle = AlertEngine::start(
            Arc::clone(&source) as Arc<dyn FixSource>,
            fixes,
            store,
            sequencer,
            EngineConfig::default(),
        )
        .unwrap();
        // Foreground start applies the 1 Hz interval
        assert_eq!(source.state().interval_ms, Some(1000));

        let mut status_rx = handle.subscribe();
        for distance in [2100.0, 1900.0, 900.0, 400.0] {
            source.push_fix(approach_fix(distance)).await;
            let status = timeout(Duration::from_secs(2), status_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert!((status.distance_to_hazard_m - distance).abs() < 5.0);
            // Let the spawned cue chain finish before the next fix
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        // Let the lowest-threshold chain run to its alarm escalation
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(seq_probe.alarm_active());
        let plays = sink.plays.lock().unwrap().clone();
        assert!(plays.contains(&CueId::Distance2000));
        assert!(plays.contains(&CueId::Distance1000));
        assert!(plays.contains(&CueId::Distance500));
        assert_eq!(plays.last(), Some(&CueId::AlarmLoop));

        handle.shutdown().await;
        assert!(!seq_probe.alarm_active());
        assert_eq!(source.state().interval_ms, None);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_background_probe_controls_interval() {
        let config = EngineConfig {
            sampling: SamplingConfig {
                burst_timeout: Duration::from_millis(100),
                ..Default::default()
            },
            ..Default::default()
        };
        let (source, fixes, store, sequencer, _sink, path) = test_rig("background");

        let handle = AlertEngine::start(
            Arc::clone(&source) as Arc<dyn FixSource>,
            fixes,
            store,
            sequencer,
            config,
        )
        .unwrap();

        // Backgrounding with a stationary probe suspends fixes
        handle.command(EngineCommand::BackgroundEntered).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        source.push_burst_fix(PositionFix::new(35.0, 135.0, 2.0, 5.0));
        source.push_burst_fix(PositionFix::new(35.0, 135.0, 3.0, 5.0));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(source.state().interval_ms, None);

        // Foreground always samples
        handle.command(EngineCommand::ForegroundEntered).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(source.state().interval_ms, Some(1000));

        handle.shutdown().await;
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_burst_probe_not_reentered_while_outstanding() {
        // A long timeout holds the first probe open for the whole test
        let config = EngineConfig {
            sampling: SamplingConfig {
                burst_timeout: Duration::from_secs(30),
                ..Default::default()
            },
            ..Default::default()
        };
        let (source, fixes, store, sequencer, _sink, path) = test_rig("burst-guard");

        let handle = AlertEngine::start(
            Arc::clone(&source) as Arc<dyn FixSource>,
            fixes,
            store,
            sequencer,
            config,
        )
        .unwrap();

        handle.command(EngineCommand::BackgroundEntered).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(source.state().burst_request_count, 1);

        // Another background transition while the probe is still collecting
        // must not start a second sub-session
        handle.command(EngineCommand::ForegroundEntered).await;
        handle.command(EngineCommand::BackgroundEntered).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(source.state().burst_request_count, 1);

        handle.shutdown().await;
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_engine_running() {
        let (source, fixes, store, sequencer, _sink, path) = test_rig("reload");

        let handle = AlertEngine::start(
            Arc::clone(&source) as Arc<dyn FixSource>,
            fixes,
            store,
            sequencer,
            EngineConfig::default(),
        )
        .unwrap();
        let mut status_rx = handle.subscribe();

        std::fs::write(&path, "definitely not json").unwrap();
        handle.command(EngineCommand::DatabaseReloaded).await;

        // The previous hazard set is retained and processing continues
        source.push_fix(approach_fix(1900.0)).await;
        let status = timeout(Duration::from_secs(2), status_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(status.distance_to_hazard_m > 0.0);

        handle.shutdown().await;
        let _ = std::fs::remove_file(path);
    }
}
