//! Fix source capability and channel-backed implementation

use crate::{FixError, PositionFix};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A capability producing position fixes at a configurable interval.
///
/// The live stream itself is delivered over a channel handed to the engine at
/// construction time; this trait only carries the control surface.
pub trait FixSource: Send + Sync {
    /// Reconfigure the live fix interval in milliseconds. `None` suspends
    /// fixes entirely. Callers are expected to skip redundant calls; an
    /// implementation may tear down and re-create its subscription here.
    fn configure(&self, interval_ms: Option<u64>) -> Result<(), FixError>;

    /// The currently applied interval (`None` when suspended).
    fn current_interval(&self) -> Option<u64>;

    /// Start a bounded burst sub-session: up to `max_fixes` fixes at
    /// `interval_ms`, delivered on the returned channel. The sub-session ends
    /// when the receiver is dropped.
    fn request_burst(
        &self,
        max_fixes: u32,
        interval_ms: u64,
    ) -> Result<mpsc::Receiver<PositionFix>, FixError>;

    /// Whether the location read permission is currently granted. Mirrors the
    /// platform revocation signal.
    fn permission_granted(&self) -> bool;
}

/// Mutable control state of a `ChannelFixSource`.
#[derive(Debug, Clone)]
pub struct SourceState {
    /// Applied live interval (`None` = suspended)
    pub interval_ms: Option<u64>,
    /// Number of `configure` calls that reached the source
    pub reconfigure_count: u32,
    /// Number of burst sub-sessions requested
    pub burst_request_count: u32,
    /// Simulated permission flag
    pub permission_granted: bool,
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            interval_ms: None,
            reconfigure_count: 0,
            burst_request_count: 0,
            permission_granted: true,
        }
    }
}

/// Channel-backed fix source for tests and simulation.
///
/// Fixes are injected with [`ChannelFixSource::push_fix`] and
/// [`ChannelFixSource::push_burst_fix`]; the source records every
/// reconfiguration so idempotence can be asserted.
pub struct ChannelFixSource {
    state: Mutex<SourceState>,
    live_tx: mpsc::Sender<PositionFix>,
    burst_tx: Mutex<Option<mpsc::Sender<PositionFix>>>,
}

impl ChannelFixSource {
    /// Create a source plus the live fix stream it feeds.
    pub fn new() -> (Self, mpsc::Receiver<PositionFix>) {
        let (live_tx, live_rx) = mpsc::channel(64);
        (
            Self {
                state: Mutex::new(SourceState::default()),
                live_tx,
                burst_tx: Mutex::new(None),
            },
            live_rx,
        )
    }

    /// Snapshot the control state.
    pub fn state(&self) -> SourceState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Simulate the platform granting or revoking the location permission.
    pub fn set_permission(&self, granted: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.permission_granted = granted;
        }
    }

    /// Inject a fix into the live stream.
    pub async fn push_fix(&self, fix: PositionFix) {
        if self.live_tx.send(fix).await.is_err() {
            warn!("Live fix dropped: stream closed");
        }
    }

    /// Inject a fix into the outstanding burst sub-session, if any.
    /// Returns false when no burst is outstanding or the burst is full.
    pub fn push_burst_fix(&self, fix: PositionFix) -> bool {
        match self.burst_tx.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(tx) => tx.try_send(fix).is_ok(),
                None => false,
            },
            Err(_) => false,
        }
    }
}

impl FixSource for ChannelFixSource {
    fn configure(&self, interval_ms: Option<u64>) -> Result<(), FixError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| FixError::Reconfigure(e.to_string()))?;
        if !state.permission_granted {
            return Err(FixError::PermissionDenied);
        }
        state.interval_ms = interval_ms;
        state.reconfigure_count += 1;
        debug!(?interval_ms, "Fix source reconfigured");
        Ok(())
    }

    fn current_interval(&self) -> Option<u64> {
        self.state.lock().ok().and_then(|s| s.interval_ms)
    }

    fn request_burst(
        &self,
        max_fixes: u32,
        _interval_ms: u64,
    ) -> Result<mpsc::Receiver<PositionFix>, FixError> {
        if !self.permission_granted() {
            return Err(FixError::PermissionDenied);
        }
        if let Ok(mut state) = self.state.lock() {
            state.burst_request_count += 1;
        }
        let (tx, rx) = mpsc::channel(max_fixes.max(1) as usize);
        let mut slot = self
            .burst_tx
            .lock()
            .map_err(|e| FixError::Reconfigure(e.to_string()))?;
        *slot = Some(tx);
        Ok(rx)
    }

    fn permission_granted(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.permission_granted)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configure_records_interval() {
        let (source, _rx) = ChannelFixSource::new();
        source.configure(Some(1000)).unwrap();
        assert_eq!(source.current_interval(), Some(1000));
        assert_eq!(source.state().reconfigure_count, 1);

        source.configure(None).unwrap();
        assert_eq!(source.current_interval(), None);
        assert_eq!(source.state().reconfigure_count, 2);
    }

    #[tokio::test]
    async fn test_configure_denied_without_permission() {
        let (source, _rx) = ChannelFixSource::new();
        source.set_permission(false);
        assert!(matches!(
            source.configure(Some(1000)),
            Err(FixError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_live_stream_delivers_in_order() {
        let (source, mut rx) = ChannelFixSource::new();
        source.push_fix(PositionFix::new(35.0, 135.0, 10.0, 5.0)).await;
        source.push_fix(PositionFix::new(35.1, 135.0, 20.0, 5.0)).await;

        assert_eq!(rx.recv().await.unwrap().lat, 35.0);
        assert_eq!(rx.recv().await.unwrap().lat, 35.1);
    }

    #[tokio::test]
    async fn test_burst_bounded_by_max_fixes() {
        let (source, _rx) = ChannelFixSource::new();
        let mut burst = source.request_burst(2, 1000).unwrap();
        assert_eq!(source.state().burst_request_count, 1);

        assert!(source.push_burst_fix(PositionFix::new(35.0, 135.0, 30.0, 5.0)));
        assert!(source.push_burst_fix(PositionFix::new(35.0, 135.0, 32.0, 5.0)));
        // Channel full: the sub-session accepts no more than max_fixes
        assert!(!source.push_burst_fix(PositionFix::new(35.0, 135.0, 34.0, 5.0)));

        assert!(burst.recv().await.is_some());
        assert!(burst.recv().await.is_some());
    }
}
