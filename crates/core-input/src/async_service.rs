use crate::decoder::KeyDecoder;
use crate::reader::{Chunk, spawn_stdin_reader};
use core_events::{
    ASYNC_INPUT_STARTS, ASYNC_INPUT_STOP_CHANNEL, ASYNC_INPUT_STOP_ERROR, ASYNC_INPUT_STOP_SIGNAL,
    ASYNC_INPUT_STOP_STREAM, CHANNEL_SEND_FAILURES, KEY_BYTES_DISCARDED, KEY_COMMANDS_DECODED,
    KeyCommand,
};
use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{Notify, mpsc::Sender};
use tokio::task;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, debug, info, trace, warn};

#[derive(Clone, Debug)]
pub struct AsyncInputShutdown {
    notify: Arc<Notify>,
}

impl AsyncInputShutdown {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

#[derive(Clone, Debug)]
struct ShutdownListener {
    notify: Arc<Notify>,
}

impl ShutdownListener {
    fn new_pair() -> (AsyncInputShutdown, Self) {
        let notify = Arc::new(Notify::new());
        (
            AsyncInputShutdown {
                notify: notify.clone(),
            },
            ShutdownListener { notify },
        )
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Spawn the stdin reader thread plus the Tokio task that decodes its bytes.
pub(crate) fn spawn_async_input_task(
    sender: Sender<KeyCommand>,
) -> (task::JoinHandle<()>, AsyncInputShutdown) {
    let (shutdown, listener) = ShutdownListener::new_pair();
    let span = tracing::debug_span!(target: "input.thread", "input_async_task");
    let handle = task::spawn(
        async move {
            let stream = match spawn_stdin_reader() {
                Ok(rx) => ReceiverStream::new(rx),
                Err(e) => {
                    warn!(target: "input.thread", error = %e, "stdin_reader_spawn_failed");
                    return;
                }
            };
            AsyncInputTask::new(sender, stream, listener).run().await;
        }
        .instrument(span),
    );

    (handle, shutdown)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExitReason {
    Running,
    ShutdownSignal,
    ChannelClosed,
    StreamEnded,
    StreamError,
}

impl ExitReason {
    fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Running => "running",
            ExitReason::ShutdownSignal => "shutdown_signal",
            ExitReason::ChannelClosed => "channel_closed",
            ExitReason::StreamEnded => "stream_ended",
            ExitReason::StreamError => "stream_error",
        }
    }
}

struct AsyncInputTask<S>
where
    S: tokio_stream::Stream<Item = Chunk> + Send + Unpin + 'static,
{
    sender: Sender<KeyCommand>,
    stream: S,
    decoder: KeyDecoder,
    shutdown: ShutdownListener,
    exit_reason: ExitReason,
    stream_error: Option<io::ErrorKind>,
}

impl<S> AsyncInputTask<S>
where
    S: tokio_stream::Stream<Item = Chunk> + Send + Unpin + 'static,
{
    fn new(sender: Sender<KeyCommand>, stream: S, shutdown: ShutdownListener) -> Self {
        Self {
            sender,
            stream,
            decoder: KeyDecoder::new(),
            shutdown,
            exit_reason: ExitReason::Running,
            stream_error: None,
        }
    }

    async fn run(mut self) {
        info!(target: "input.thread", "async_input_task_started");
        ASYNC_INPUT_STARTS.fetch_add(1, Ordering::Relaxed);
        loop {
            let maybe_chunk = tokio::select! {
                biased;
                _ = self.shutdown.wait() => {
                    self.exit_reason = ExitReason::ShutdownSignal;
                    break;
                }
                chunk = self.stream.next() => chunk,
            };

            match maybe_chunk {
                Some(Ok(bytes)) => {
                    if !self.handle_bytes(&bytes).await {
                        break;
                    }
                }
                Some(Err(err)) => {
                    self.exit_reason = ExitReason::StreamError;
                    self.stream_error = Some(err.kind());
                    break;
                }
                None => break,
            }
        }

        let reason = match self.exit_reason {
            ExitReason::Running => ExitReason::StreamEnded,
            other => other,
        };

        let counter = match reason {
            ExitReason::ShutdownSignal => Some(&ASYNC_INPUT_STOP_SIGNAL),
            ExitReason::ChannelClosed => Some(&ASYNC_INPUT_STOP_CHANNEL),
            ExitReason::StreamEnded => Some(&ASYNC_INPUT_STOP_STREAM),
            ExitReason::StreamError => Some(&ASYNC_INPUT_STOP_ERROR),
            ExitReason::Running => None,
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        if matches!(reason, ExitReason::StreamError) {
            if let Some(kind) = self.stream_error {
                warn!(target: "input.thread", error_kind = ?kind, "async_input_task_stream_error");
            } else {
                warn!(target: "input.thread", "async_input_task_stream_error");
            }
        }

        info!(target: "input.thread", reason = reason.as_str(), "async_input_task_stopped");
    }

    async fn handle_bytes(&mut self, bytes: &[u8]) -> bool {
        let mut commands = Vec::new();
        let discarded = self.decoder.feed(bytes, &mut commands);
        if discarded > 0 {
            KEY_BYTES_DISCARDED.fetch_add(discarded as u64, Ordering::Relaxed);
            trace!(target: "input.decode", discarded, "bytes_discarded");
        }
        for cmd in commands {
            KEY_COMMANDS_DECODED.fetch_add(1, Ordering::Relaxed);
            debug!(target: "input.decode", command = cmd.as_str(), "key_command");
            if !self.send_command(cmd).await {
                return false;
            }
        }
        true
    }

    async fn send_command(&mut self, cmd: KeyCommand) -> bool {
        match self.sender.send(cmd).await {
            Ok(_) => true,
            Err(_) => {
                CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                if !matches!(self.exit_reason, ExitReason::ShutdownSignal) {
                    self.exit_reason = ExitReason::ChannelClosed;
                }
                false
            }
        }
    }
}
