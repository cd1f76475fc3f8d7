//! Core event types and mailbox helpers for topless.
//!
//! Three producers feed the control loop, each through its own mailbox:
//! command ticks (pipeline executor), decoded key commands (input service)
//! and geometry notifications (resize listener). The loop selects across
//! all three every iteration; no producer ever touches render state.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;

// -------------------------------------------------------------------------------------------------
// Mailbox Policy
// -------------------------------------------------------------------------------------------------
// Tick output travels through a single-slot mailbox: the executor parks in `send` until the loop
// has taken the previous snapshot, so at most one undisplayed tick is ever in flight. Key commands
// get a small buffer because a burst of arrow presses should not stall the reader; geometry events
// are coalescable (the loop re-probes the terminal anyway) so a single slot suffices and producers
// use `try_send`.
// -------------------------------------------------------------------------------------------------
pub const TICK_MAILBOX_CAP: usize = 1;
pub const KEY_MAILBOX_CAP: usize = 64;
pub const GEOMETRY_MAILBOX_CAP: usize = 1;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters; inspected by tests and logged at shutdown.
// -------------------------------------------------------------------------------------------------
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static TICKS_DELIVERED: AtomicU64 = AtomicU64::new(0);
pub static TICKS_DROPPED_PAUSED: AtomicU64 = AtomicU64::new(0);
pub static KEY_COMMANDS_DECODED: AtomicU64 = AtomicU64::new(0);
pub static KEY_BYTES_DISCARDED: AtomicU64 = AtomicU64::new(0);
pub static GEOMETRY_NOTIFICATIONS: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STARTS: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_SIGNAL: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_CHANNEL: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_STREAM: AtomicU64 = AtomicU64::new(0);
pub static ASYNC_INPUT_STOP_ERROR: AtomicU64 = AtomicU64::new(0);

/// Point-in-time copy of the telemetry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounters {
    pub channel_send_failures: u64,
    pub ticks_delivered: u64,
    pub ticks_dropped_paused: u64,
    pub key_commands_decoded: u64,
    pub key_bytes_discarded: u64,
    pub geometry_notifications: u64,
    pub async_input_starts: u64,
    pub async_input_stop_signal: u64,
    pub async_input_stop_channel: u64,
    pub async_input_stop_stream: u64,
    pub async_input_stop_error: u64,
}

impl EventCounters {
    pub fn snapshot() -> Self {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        Self {
            channel_send_failures: load(&CHANNEL_SEND_FAILURES),
            ticks_delivered: load(&TICKS_DELIVERED),
            ticks_dropped_paused: load(&TICKS_DROPPED_PAUSED),
            key_commands_decoded: load(&KEY_COMMANDS_DECODED),
            key_bytes_discarded: load(&KEY_BYTES_DISCARDED),
            geometry_notifications: load(&GEOMETRY_NOTIFICATIONS),
            async_input_starts: load(&ASYNC_INPUT_STARTS),
            async_input_stop_signal: load(&ASYNC_INPUT_STOP_SIGNAL),
            async_input_stop_channel: load(&ASYNC_INPUT_STOP_CHANNEL),
            async_input_stop_stream: load(&ASYNC_INPUT_STOP_STREAM),
            async_input_stop_error: load(&ASYNC_INPUT_STOP_ERROR),
        }
    }
}

/// High-level command decoded from raw keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCommand {
    Quit,
    PauseToggle,
    /// Repaint the current frame without fetching new output.
    Refresh,
    /// Move the scroll head by the given number of lines (negative = up).
    Scroll(isize),
}

impl KeyCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyCommand::Quit => "quit",
            KeyCommand::PauseToggle => "pause_toggle",
            KeyCommand::Refresh => "refresh",
            KeyCommand::Scroll(_) => "scroll",
        }
    }
}

/// Notification that the terminal geometry may have changed. The payload is
/// advisory: the control loop always re-probes the terminal itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryEvent {
    Resize,
}

/// Create a bounded mailbox for one producer kind.
pub fn mailbox<M>(capacity: usize) -> (Sender<M>, Receiver<M>) {
    mpsc::channel(capacity)
}

// -------------------------------------------------------------------------------------------------
// Async Event Sources
// -------------------------------------------------------------------------------------------------
// Every background producer (ticker, resize listener) implements the same two-method contract so
// the binary can register and spawn them uniformly. On send failure (consumer dropped) a source
// must terminate promptly; shutdown is driven by dropping the receiving side of the mailbox.

/// Trait implemented by any async producer of `M` messages.
pub trait AsyncEventSource<M>: Send + 'static {
    /// Human-readable stable identifier (used for logging / diagnostics).
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task. Implementors stop when
    /// `tx.send(..)` fails and must not busy-loop.
    fn spawn(self: Box<Self>, tx: Sender<M>) -> JoinHandle<()>;
}

/// Registry of sources sharing one mailbox type.
pub struct EventSourceRegistry<M> {
    sources: Vec<Box<dyn AsyncEventSource<M>>>,
}

impl<M: 'static> Default for EventSourceRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: 'static> EventSourceRegistry<M> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource<M>>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources, each with its own clone of `tx`. The
    /// caller keeps ownership of `tx` and should drop it (and the receiver)
    /// before awaiting the returned handles during shutdown.
    pub fn spawn_all(&mut self, tx: &Sender<M>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    struct MockOnceSource;

    impl AsyncEventSource<GeometryEvent> for MockOnceSource {
        fn name(&self) -> &'static str {
            "mock_once"
        }
        fn spawn(self: Box<Self>, tx: Sender<GeometryEvent>) -> JoinHandle<()> {
            tokio::spawn(async move {
                let _ = tx.send(GeometryEvent::Resize).await;
            })
        }
    }

    struct MockCloseSource {
        flag: Arc<AtomicBool>,
    }

    impl AsyncEventSource<KeyCommand> for MockCloseSource {
        fn name(&self) -> &'static str {
            "mock_close"
        }
        fn spawn(self: Box<Self>, tx: Sender<KeyCommand>) -> JoinHandle<()> {
            let flag = self.flag;
            tokio::spawn(async move {
                tx.closed().await;
                flag.store(true, Ordering::SeqCst);
            })
        }
    }

    #[test]
    fn key_command_labels() {
        assert_eq!(KeyCommand::Quit.as_str(), "quit");
        assert_eq!(KeyCommand::Scroll(-10).as_str(), "scroll");
    }

    #[test]
    fn counter_snapshot_reads_live_values() {
        let before = EventCounters::snapshot();
        TICKS_DELIVERED.fetch_add(2, Ordering::Relaxed);
        GEOMETRY_NOTIFICATIONS.fetch_add(1, Ordering::Relaxed);
        let after = EventCounters::snapshot();
        assert!(after.ticks_delivered >= before.ticks_delivered + 2);
        assert!(after.geometry_notifications > before.geometry_notifications);
    }

    #[tokio::test]
    async fn registry_spawns_and_emits() {
        let (tx, mut rx) = mailbox::<GeometryEvent>(GEOMETRY_MAILBOX_CAP);
        let mut reg = EventSourceRegistry::new();
        reg.register(MockOnceSource);
        assert_eq!(reg.len(), 1);
        let handles = reg.spawn_all(&tx);
        assert!(reg.is_empty(), "spawn_all drains the registry");

        let got = tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("source should emit promptly");
        assert_eq!(got, Some(GeometryEvent::Resize));

        drop(tx);
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_millis(20), handle).await;
        }
    }

    #[tokio::test]
    async fn registry_sources_exit_on_channel_drop() {
        let (tx, rx) = mailbox::<KeyCommand>(KEY_MAILBOX_CAP);
        let mut reg = EventSourceRegistry::new();
        let flag = Arc::new(AtomicBool::new(false));
        reg.register(MockCloseSource { flag: flag.clone() });
        let handles = reg.spawn_all(&tx);

        drop(tx);
        drop(rx);

        for handle in handles {
            match tokio::time::timeout(Duration::from_millis(50), handle).await {
                Ok(join_res) => join_res.expect("source task should exit cleanly"),
                Err(_) => panic!("source task did not observe channel closure"),
            }
        }
        assert!(flag.load(Ordering::SeqCst));
    }
}
