//! Resize notifications as an async event source.
//!
//! Unix: listens for SIGWINCH. Elsewhere: polls the probe on an interval and
//! reports only actual size changes.

use crate::geometry::{CrosstermProbe, GeometryProbe};
use core_events::{AsyncEventSource, GEOMETRY_NOTIFICATIONS, GeometryEvent};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc::{Sender, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{trace, warn};

pub struct ResizeEventSource {
    poll_interval: Duration,
}

impl Default for ResizeEventSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

impl ResizeEventSource {
    /// `poll_interval` is only used on platforms without SIGWINCH.
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

/// Forward one notification; a full mailbox already carries a pending resize
/// so the extra one is coalesced. Returns false once the loop is gone.
fn notify(tx: &Sender<GeometryEvent>) -> bool {
    match tx.try_send(GeometryEvent::Resize) {
        Ok(()) => {
            GEOMETRY_NOTIFICATIONS.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(TrySendError::Full(_)) => {
            trace!(target: "terminal.resize", "resize_coalesced");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

impl AsyncEventSource<GeometryEvent> for ResizeEventSource {
    fn name(&self) -> &'static str {
        "resize"
    }

    #[cfg(unix)]
    fn spawn(self: Box<Self>, tx: Sender<GeometryEvent>) -> JoinHandle<()> {
        use tokio::signal::unix::{SignalKind, signal};
        let poll_interval = self.poll_interval;
        tokio::spawn(async move {
            let mut winch = match signal(SignalKind::window_change()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(target: "terminal.resize", error = %e, "sigwinch_unavailable_polling");
                    poll_loop(tx, poll_interval).await;
                    return;
                }
            };
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    got = winch.recv() => {
                        if got.is_none() || !notify(&tx) {
                            break;
                        }
                        trace!(target: "terminal.resize", "sigwinch");
                    }
                }
            }
        })
    }

    #[cfg(not(unix))]
    fn spawn(self: Box<Self>, tx: Sender<GeometryEvent>) -> JoinHandle<()> {
        let poll_interval = self.poll_interval;
        tokio::spawn(poll_loop(tx, poll_interval))
    }
}

async fn poll_loop(tx: Sender<GeometryEvent>, every: Duration) {
    let probe = CrosstermProbe;
    let mut last = probe.window_size().ok();
    let mut interval = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            _ = interval.tick() => {
                let now = probe.window_size().ok();
                if now != last {
                    last = now;
                    if !notify(&tx) {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::mailbox;

    #[tokio::test]
    async fn notify_coalesces_when_mailbox_full() {
        let (tx, mut rx) = mailbox::<GeometryEvent>(1);
        assert!(notify(&tx));
        assert!(notify(&tx), "full mailbox is not an error");
        assert_eq!(rx.recv().await, Some(GeometryEvent::Resize));
        assert!(rx.try_recv().is_err(), "second notification was coalesced");
    }

    #[tokio::test]
    async fn notify_reports_closed_mailbox() {
        let (tx, rx) = mailbox::<GeometryEvent>(1);
        drop(rx);
        assert!(!notify(&tx));
    }

    #[tokio::test]
    async fn source_exits_when_loop_drops_mailbox() {
        let (tx, rx) = mailbox::<GeometryEvent>(1);
        let handle = Box::new(ResizeEventSource::default()).spawn(tx);
        drop(rx);
        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("resize source should observe closure")
            .expect("task join failed");
    }
}
