//! Tracking session: timer-driven tick loop over a capture device
//!
//! Each tick reads one frame, runs the engine and hands the snapshot to the
//! sink. Ticks never overlap; when processing outlasts the interval the
//! missed ticks are skipped. Cancellation wins over an in-flight tick, so no
//! snapshot is delivered after `stop`.

use camera_capture::{CameraError, CaptureDevice};
use face_detect::BackendKind;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::engine::EngagementEngine;
use crate::snapshot::EngagementSnapshot;
use crate::EngineError;

/// Receives one snapshot per completed tick. Must return promptly.
pub trait SnapshotSink: Send + 'static {
    fn deliver(&mut self, snapshot: EngagementSnapshot);
}

impl<F> SnapshotSink for F
where
    F: FnMut(EngagementSnapshot) + Send + 'static,
{
    fn deliver(&mut self, snapshot: EngagementSnapshot) {
        self(snapshot)
    }
}

/// Forwards snapshots into a bounded channel without waiting; a full
/// channel drops the snapshot
pub struct ChannelSink {
    tx: mpsc::Sender<EngagementSnapshot>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<EngagementSnapshot>) -> Self {
        Self { tx, dropped: 0 }
    }
}

impl From<mpsc::Sender<EngagementSnapshot>> for ChannelSink {
    fn from(tx: mpsc::Sender<EngagementSnapshot>) -> Self {
        Self::new(tx)
    }
}

impl SnapshotSink for ChannelSink {
    fn deliver(&mut self, snapshot: EngagementSnapshot) {
        match self.tx.try_send(snapshot) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped += 1;
                debug!(dropped = self.dropped, "Snapshot channel full, dropping snapshot");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Snapshot receiver gone, dropping snapshot");
            }
        }
    }
}

/// Why a session's loop ended
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionEnd {
    /// Cancelled by `stop`
    #[default]
    Stopped,
    /// The frame source ran out of frames
    StreamEnded,
    /// The device failed mid-session
    Failed(String),
}

/// Counters reported when a session ends
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub backend: Option<BackendKind>,
    /// Timer ticks that fired
    pub ticks: u64,
    /// Ticks with no frame available
    pub skipped_ticks: u64,
    /// Snapshots delivered to the sink
    pub snapshots: u64,
    pub detection_failures: u64,
    pub end: SessionEnd,
}

enum TickOutcome {
    Snapshot(EngagementSnapshot),
    Stalled,
    Ended,
    Failed(CameraError),
}

/// A running tick loop; dropping it without `stop` leaves the loop running
/// until its frame source ends
pub struct TrackingSession {
    id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<SessionSummary>,
}

impl TrackingSession {
    /// Open the device and start ticking.
    ///
    /// A device that fails to open is reported here and no tick runs.
    pub async fn start<D, S>(
        engine: EngagementEngine,
        mut device: D,
        sink: S,
    ) -> Result<Self, EngineError>
    where
        D: CaptureDevice + 'static,
        S: SnapshotSink,
    {
        let id = Uuid::new_v4();

        if let Err(e) = device.open().await {
            error!(session_id = %id, kind = ?e.kind(), "Camera open failed: {}", e);
            return Err(EngineError::Camera(e));
        }

        let cancel = CancellationToken::new();
        let span = info_span!("tracking_session", session_id = %id);
        let handle = tokio::spawn(
            run_loop(id, engine, device, sink, cancel.clone()).instrument(span),
        );

        Ok(Self { id, cancel, handle })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Token that stops the loop when cancelled, for wiring to shutdown signals
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the loop has exited on its own or after `stop`
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the loop and wait for it to release the device
    pub async fn stop(self) -> Result<SessionSummary, EngineError> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the loop to end without cancelling it
    pub async fn wait(self) -> Result<SessionSummary, EngineError> {
        self.handle
            .await
            .map_err(|e| EngineError::Task(e.to_string()))
    }
}

async fn run_loop<D, S>(
    id: Uuid,
    mut engine: EngagementEngine,
    mut device: D,
    mut sink: S,
    cancel: CancellationToken,
) -> SessionSummary
where
    D: CaptureDevice,
    S: SnapshotSink,
{
    let mut summary = SessionSummary {
        session_id: id,
        backend: Some(engine.backend_kind()),
        ..Default::default()
    };

    let mut ticker = time::interval(engine.config().tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        backend = %engine.backend_kind(),
        interval_ms = engine.config().tick_interval_ms,
        "Tracking started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        summary.ticks += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = tick(&mut engine, &mut device) => outcome,
        };

        match outcome {
            TickOutcome::Snapshot(snapshot) => {
                if cancel.is_cancelled() {
                    break;
                }
                sink.deliver(snapshot);
                summary.snapshots += 1;
            }
            TickOutcome::Stalled => {
                summary.skipped_ticks += 1;
                debug!(tick = summary.ticks, "No frame available, tick skipped");
            }
            TickOutcome::Ended => {
                info!("Frame source ended");
                summary.end = SessionEnd::StreamEnded;
                break;
            }
            TickOutcome::Failed(e) => {
                error!(kind = ?e.kind(), "Camera failed, stopping tracking: {}", e);
                summary.end = SessionEnd::Failed(e.to_string());
                break;
            }
        }
    }

    device.close();
    summary.detection_failures = engine.detection_failures();
    engine.reset();

    info!(
        ticks = summary.ticks,
        snapshots = summary.snapshots,
        skipped = summary.skipped_ticks,
        detection_failures = summary.detection_failures,
        end = ?summary.end,
        "Tracking stopped"
    );
    summary
}

async fn tick<D: CaptureDevice>(engine: &mut EngagementEngine, device: &mut D) -> TickOutcome {
    match device.read_frame().await {
        Ok(Some(frame)) => TickOutcome::Snapshot(engine.process_frame(&frame).await),
        Ok(None) => TickOutcome::Stalled,
        Err(e) if e.is_end_of_stream() => TickOutcome::Ended,
        Err(e) => TickOutcome::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn test_snapshot() -> EngagementSnapshot {
        EngagementSnapshot {
            in_frame: false,
            confidence: 0.0,
            posture: Default::default(),
            gesture: Default::default(),
            focus_score: 0.0,
            movement_level: Default::default(),
            lighting_ok: true,
            frames_in_position: 0,
            focus_ready: false,
            backend: BackendKind::Heuristic,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_channel_sink_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut sink = ChannelSink::new(tx);
        let snapshot = test_snapshot();

        sink.deliver(snapshot.clone());
        sink.deliver(snapshot.clone());
        assert_eq!(sink.dropped, 1);
        assert_eq!(rx.recv().await, Some(snapshot));
    }

    #[test]
    fn test_closure_is_a_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut sink = move |s: EngagementSnapshot| log.lock().unwrap().push(s.timestamp);

        let mut snapshot = test_snapshot();
        SnapshotSink::deliver(&mut sink, snapshot.clone());
        snapshot.timestamp = 100;
        SnapshotSink::deliver(&mut sink, snapshot);

        assert_eq!(*seen.lock().unwrap(), vec![0, 100]);
    }
}
