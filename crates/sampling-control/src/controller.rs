//! Sampling controller implementation

use location_capture::{FixError, FixSource};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Motion regime derived from a burst probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    Vehicle,
    #[default]
    Stationary,
}

/// Configuration for the sampling controller
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Mean burst speed at or above which the observer is in a vehicle (km/h)
    pub vehicle_speed_threshold_kmh: f64,
    /// Period between burst probes while backgrounded
    pub burst_period: Duration,
    /// Fixes requested per burst probe
    pub burst_max_fixes: u32,
    /// Burst fix interval in milliseconds
    pub burst_interval_ms: u64,
    /// Hard bound on a burst probe regardless of how many fixes arrive
    pub burst_timeout: Duration,
    /// Live fix interval while active (milliseconds)
    pub active_interval_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            vehicle_speed_threshold_kmh: 15.0,
            burst_period: Duration::from_secs(60),
            burst_max_fixes: 5,
            burst_interval_ms: 1000,
            burst_timeout: Duration::from_millis(5500),
            active_interval_ms: 1000,
        }
    }
}

/// Decides the position-fix polling interval.
///
/// Owned by the engine task; burst collection itself runs as a spawned
/// sub-session ([`collect_burst_speeds`]) and its result is fed back through
/// [`SamplingController::finish_burst`].
#[derive(Debug)]
pub struct SamplingController {
    config: SamplingConfig,
    mode: SamplingMode,
    foreground: bool,
    /// Interval last applied to the source (`None` = suspended)
    applied_interval: Option<u64>,
}

impl SamplingController {
    pub fn new(config: SamplingConfig) -> Self {
        Self {
            config,
            mode: SamplingMode::Stationary,
            foreground: true,
            applied_interval: None,
        }
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    pub fn foreground(&self) -> bool {
        self.foreground
    }

    pub fn current_interval(&self) -> Option<u64> {
        self.applied_interval
    }

    pub fn burst_period(&self) -> Duration {
        self.config.burst_period
    }

    /// The interval the current mode/foreground state calls for.
    pub fn desired_interval(&self) -> Option<u64> {
        if self.mode == SamplingMode::Vehicle || self.foreground {
            Some(self.config.active_interval_ms)
        } else {
            None
        }
    }

    /// Classify a burst's speed samples. An empty burst defaults to
    /// stationary.
    pub fn classify(&self, speeds_kmh: &[f64]) -> SamplingMode {
        if speeds_kmh.is_empty() {
            return SamplingMode::Stationary;
        }
        let mean = speeds_kmh.iter().sum::<f64>() / speeds_kmh.len() as f64;
        if mean >= self.config.vehicle_speed_threshold_kmh {
            SamplingMode::Vehicle
        } else {
            SamplingMode::Stationary
        }
    }

    /// Record a foreground/background transition and reapply the interval.
    pub fn set_foreground(&mut self, foreground: bool, source: &dyn FixSource) {
        self.foreground = foreground;
        self.apply(source);
    }

    /// Absorb a completed burst probe and reapply the interval.
    pub fn finish_burst(&mut self, speeds_kmh: &[f64], source: &dyn FixSource) {
        let previous = self.mode;
        self.mode = self.classify(speeds_kmh);
        let mean = if speeds_kmh.is_empty() {
            0.0
        } else {
            speeds_kmh.iter().sum::<f64>() / speeds_kmh.len() as f64
        };
        debug!(samples = speeds_kmh.len(), mean_kmh = mean, "Burst probe complete");
        if previous != self.mode {
            info!(?previous, current = ?self.mode, "Sampling mode changed");
        }
        self.apply(source);
    }

    /// Apply the desired interval to the source. Idempotent: re-applying an
    /// unchanged interval does not touch the underlying subscription.
    /// Returns whether a reconfiguration was issued.
    pub fn apply(&mut self, source: &dyn FixSource) -> bool {
        let desired = self.desired_interval();
        if desired == self.applied_interval {
            return false;
        }
        match source.configure(desired) {
            Ok(()) => {
                match desired {
                    Some(ms) => info!(interval_ms = ms, "Fix updates active"),
                    None => info!("Fix updates suspended"),
                }
                self.applied_interval = desired;
                true
            }
            Err(FixError::PermissionDenied) => {
                warn!("No location permission, sampling state unchanged");
                false
            }
            Err(e) => {
                warn!(error = %e, "Fix source reconfiguration failed");
                false
            }
        }
    }
}

/// Run one bounded burst probe: up to `burst_max_fixes` fixes at the burst
/// interval, cut off by `burst_timeout` regardless of how many arrived.
/// Returns the sampled speeds; permission loss mid-probe keeps whatever was
/// collected, and a denied probe returns `None` so the caller leaves sampling
/// at its last known state.
pub async fn collect_burst_speeds(
    source: &dyn FixSource,
    config: &SamplingConfig,
) -> Option<Vec<f64>> {
    let mut rx = match source.request_burst(config.burst_max_fixes, config.burst_interval_ms) {
        Ok(rx) => rx,
        Err(FixError::PermissionDenied) => {
            warn!("No location permission, burst probe skipped");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "Burst probe request failed");
            return None;
        }
    };

    let mut speeds = Vec::with_capacity(config.burst_max_fixes as usize);
    let deadline = tokio::time::Instant::now() + config.burst_timeout;

    while speeds.len() < config.burst_max_fixes as usize {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match timeout(remaining, rx.recv()).await {
            Ok(Some(fix)) => {
                debug!(speed_kmh = fix.speed_kmh, "Burst fix");
                speeds.push(fix.speed_kmh);
            }
            // Source closed mid-probe (e.g. permission revoked): use what we have
            Ok(None) => break,
            Err(_) => break,
        }
    }

    Some(speeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use location_capture::{ChannelFixSource, PositionFix};

    fn fix(speed_kmh: f64) -> PositionFix {
        PositionFix::new(35.0, 135.0, speed_kmh, 5.0)
    }

    #[test]
    fn test_classify_vehicle_at_threshold() {
        let controller = SamplingController::new(SamplingConfig::default());
        assert_eq!(
            controller.classify(&[20.0, 18.0, 12.0, 15.0, 16.0]),
            SamplingMode::Vehicle
        );
        assert_eq!(
            controller.classify(&[5.0, 3.0, 0.0, 4.0, 2.0]),
            SamplingMode::Stationary
        );
        assert_eq!(controller.classify(&[]), SamplingMode::Stationary);
    }

    #[tokio::test]
    async fn test_vehicle_mode_keeps_fixes_at_one_hertz() {
        let (source, _rx) = ChannelFixSource::new();
        let mut controller = SamplingController::new(SamplingConfig::default());

        controller.set_foreground(false, &source);
        assert_eq!(controller.current_interval(), None);

        controller.finish_burst(&[20.0, 18.0, 16.0, 15.0, 17.0], &source);
        assert_eq!(controller.mode(), SamplingMode::Vehicle);
        assert_eq!(controller.current_interval(), Some(1000));
    }

    #[tokio::test]
    async fn test_stationary_background_suspends_fixes() {
        let (source, _rx) = ChannelFixSource::new();
        let mut controller = SamplingController::new(SamplingConfig::default());

        controller.set_foreground(false, &source);
        controller.finish_burst(&[5.0, 4.0, 3.0], &source);
        assert_eq!(controller.mode(), SamplingMode::Stationary);
        assert_eq!(controller.current_interval(), None);

        // Foreground always samples, whatever the regime
        controller.set_foreground(true, &source);
        assert_eq!(controller.current_interval(), Some(1000));
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let (source, _rx) = ChannelFixSource::new();
        let mut controller = SamplingController::new(SamplingConfig::default());

        assert!(controller.apply(&source));
        let count = source.state().reconfigure_count;

        // Same desired interval: no reconfiguration side effect
        assert!(!controller.apply(&source));
        controller.finish_burst(&[20.0, 20.0, 20.0], &source);
        assert_eq!(source.state().reconfigure_count, count);
    }

    #[tokio::test]
    async fn test_permission_denial_keeps_last_state() {
        let (source, _rx) = ChannelFixSource::new();
        let mut controller = SamplingController::new(SamplingConfig::default());
        controller.apply(&source);
        assert_eq!(controller.current_interval(), Some(1000));

        source.set_permission(false);
        controller.set_foreground(false, &source);
        controller.finish_burst(&[0.0, 0.0], &source);
        // Reconfiguration was denied; the applied interval is unchanged
        assert_eq!(controller.current_interval(), Some(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collects_up_to_max_fixes() {
        let (source, _rx) = ChannelFixSource::new();
        let config = SamplingConfig::default();

        let handle = {
            let config = config.clone();
            let source = std::sync::Arc::new(source);
            let probe_source = std::sync::Arc::clone(&source);
            let handle = tokio::spawn(async move {
                collect_burst_speeds(probe_source.as_ref(), &config).await
            });
            tokio::task::yield_now().await;
            for speed in [20.0, 21.0, 22.0, 23.0, 24.0] {
                source.push_burst_fix(fix(speed));
            }
            handle
        };

        let speeds = handle.await.unwrap().unwrap();
        assert_eq!(speeds, vec![20.0, 21.0, 22.0, 23.0, 24.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_bounded_by_timeout() {
        let (source, _rx) = ChannelFixSource::new();
        let source = std::sync::Arc::new(source);
        let config = SamplingConfig::default();

        let probe_source = std::sync::Arc::clone(&source);
        let probe_config = config.clone();
        let handle = tokio::spawn(async move {
            collect_burst_speeds(probe_source.as_ref(), &probe_config).await
        });
        tokio::task::yield_now().await;

        // Only two of five fixes ever arrive; the timeout cuts the probe off
        source.push_burst_fix(fix(10.0));
        source.push_burst_fix(fix(12.0));
        tokio::task::yield_now().await;
        tokio::time::advance(config.burst_timeout + Duration::from_millis(100)).await;

        let speeds = handle.await.unwrap().unwrap();
        assert_eq!(speeds, vec![10.0, 12.0]);
    }

    #[tokio::test]
    async fn test_burst_skipped_without_permission() {
        let (source, _rx) = ChannelFixSource::new();
        source.set_permission(false);
        assert!(collect_burst_speeds(&source, &SamplingConfig::default())
            .await
            .is_none());
    }
}
