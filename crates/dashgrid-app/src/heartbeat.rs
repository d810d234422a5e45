//! Heartbeat tick.
//!
//! A periodic task re-armed after each firing. Ticks are delivered to the
//! orchestrator, which fans them out to the panels that opted in at the most
//! recent composition. The period is nominal: a tick that finds the queue full
//! is dropped rather than queued up.

use dashgrid_layout::ComposedPanel;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Cancellable periodic tick.
pub struct Heartbeat {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Nominal tick period.
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    /// Start ticking into `tx` until cancelled, dropped, or `parent` is
    /// cancelled.
    pub fn spawn(period: Duration, tx: mpsc::Sender<()>, parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            debug!(period_ms = period.as_millis() as u64, "Heartbeat started");
            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    () = tokio::time::sleep(period) => {
                        match tx.try_send(()) {
                            Ok(()) => {}
                            Err(TrySendError::Full(())) => trace!("Heartbeat tick dropped, receiver busy"),
                            Err(TrySendError::Closed(())) => break,
                        }
                    }
                }
            }
            debug!("Heartbeat stopped");
        });

        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the tick task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Indices of the panels that want heartbeat ticks.
pub fn beat_subscribers(panels: &[ComposedPanel]) -> Vec<usize> {
    panels
        .iter()
        .enumerate()
        .filter(|(_, composed)| composed.panel.wants_beat())
        .map(|(idx, _)| idx)
        .collect()
}
