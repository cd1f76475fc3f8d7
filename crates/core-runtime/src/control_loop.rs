use crate::RuntimeError;
use crate::shutdown::{ShutdownReason, log_shutdown_stage};
use core_config::Config;
use core_events::{EventCounters, GeometryEvent, KeyCommand, TICKS_DROPPED_PAUSED};
use core_input::AsyncInputShutdown;
use core_pipeline::TickOutput;
use core_render::{Frame, HighlightPolicy, RedrawMode, RenderEngine, Viewport, track_changes};
use core_terminal::GeometryProbe;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    Exiting,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Running => "running",
            LoopState::Paused => "paused",
            LoopState::Exiting => "exiting",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Keep ticking when the command fails.
    pub force: bool,
    pub highlight: HighlightPolicy,
    /// Upper bound on waiting for an in-flight tick during shutdown.
    pub shutdown_grace: Duration,
}

impl LoopSettings {
    pub fn from_config(config: &Config, force: bool) -> Self {
        Self {
            force,
            highlight: HighlightPolicy::new(config.count_max(), config.palette()),
            shutdown_grace: config.shutdown_grace(),
        }
    }
}

/// Receiving ends of every producer plus the handles needed to stop them.
pub struct Producers {
    pub ticks: Receiver<TickOutput>,
    /// `None` when keyboard control is disabled.
    pub keys: Option<Receiver<KeyCommand>>,
    pub geometry: Option<Receiver<GeometryEvent>>,
    /// Ticker, resize listener and any other registry-spawned sources.
    pub source_handles: Vec<JoinHandle<()>>,
    pub input_task: Option<JoinHandle<()>>,
    pub input_shutdown: Option<AsyncInputShutdown>,
}

enum LoopControl {
    Continue,
    Break(ShutdownReason),
}

pub struct ControlLoop<W: Write> {
    out: W,
    probe: Box<dyn GeometryProbe + Send>,
    settings: LoopSettings,
    state: LoopState,
    prev: Option<Frame>,
    viewport: Viewport,
    engine: RenderEngine,
    pause: watch::Sender<bool>,
    producers: Producers,
    failure: Option<RuntimeError>,
}

impl<W: Write> ControlLoop<W> {
    pub fn new(
        out: W,
        probe: Box<dyn GeometryProbe + Send>,
        settings: LoopSettings,
        pause: watch::Sender<bool>,
        producers: Producers,
    ) -> Self {
        let engine = RenderEngine::new(settings.highlight.count_max);
        Self {
            out,
            probe,
            settings,
            state: LoopState::Running,
            prev: None,
            viewport: Viewport::new(),
            engine,
            pause,
            producers,
            failure: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until quit or a fatal error, then tear the producers down. Returns
    /// `Ok` only for a user-requested quit.
    pub async fn run(&mut self) -> Result<(), RuntimeError> {
        info!(target: "runtime", force = self.settings.force, "control_loop_started");
        let reason = self.event_loop().await;
        self.state = LoopState::Exiting;

        if let Err(e) = self.engine.finish(&mut self.out) {
            debug!(target: "render.engine", error = %e, "finish_failed");
        }
        self.finalize_shutdown(reason).await;

        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn event_loop(&mut self) -> ShutdownReason {
        loop {
            let control = tokio::select! {
                tick = self.producers.ticks.recv() => match tick {
                    Some(tick) => self.handle_tick(tick),
                    None => {
                        self.failure = Some(RuntimeError::TickerStopped);
                        LoopControl::Break(ShutdownReason::TickerClosed)
                    }
                },
                key = recv_optional(&mut self.producers.keys) => match key {
                    Some(cmd) => self.handle_key(cmd),
                    None => {
                        debug!(target: "runtime", "key_mailbox_closed");
                        self.producers.keys = None;
                        LoopControl::Continue
                    }
                },
                geometry = recv_optional(&mut self.producers.geometry) => match geometry {
                    Some(GeometryEvent::Resize) => self.handle_resize(),
                    None => {
                        self.producers.geometry = None;
                        LoopControl::Continue
                    }
                },
            };
            if let LoopControl::Break(reason) = control {
                return reason;
            }
        }
    }

    fn handle_tick(&mut self, tick: TickOutput) -> LoopControl {
        if self.state == LoopState::Paused {
            TICKS_DROPPED_PAUSED.fetch_add(1, Ordering::Relaxed);
            trace!(target: "runtime", seq = tick.seq, "tick_dropped_paused");
            return LoopControl::Continue;
        }

        if let Some(err) = tick.error {
            if !self.settings.force {
                error!(
                    target: "runtime",
                    seq = tick.seq,
                    kind = err.as_str(),
                    error = ?err,
                    "command_failed"
                );
                self.failure = Some(RuntimeError::Pipeline {
                    source: err,
                    output: tick.text,
                });
                return LoopControl::Break(ShutdownReason::CommandFailed);
            }
            warn!(
                target: "runtime",
                seq = tick.seq,
                kind = err.as_str(),
                error = ?err,
                "command_failed_forced"
            );
        }

        let size = match self.probe.window_size() {
            Ok(size) => size,
            Err(e) => {
                return self.fail(RuntimeError::Geometry(e), ShutdownReason::GeometryFailed);
            }
        };
        let mut next = Frame::new(&tick.text, size);
        let mut mode = match &self.prev {
            Some(prev) if prev.same_geometry(&next) => {
                let changed = track_changes(prev, &mut next, &self.settings.highlight);
                trace!(target: "runtime", seq = tick.seq, changed, "changes_tracked");
                RedrawMode::Diff
            }
            _ => RedrawMode::Full,
        };
        if self.viewport.reclamp(next.len(), next.visible_height) && mode == RedrawMode::Diff {
            mode = RedrawMode::Repaint;
        }
        let result = self.render(&next, mode);
        self.prev = Some(next);
        result
    }

    fn handle_key(&mut self, cmd: KeyCommand) -> LoopControl {
        debug!(
            target: "runtime",
            command = cmd.as_str(),
            state = self.state.as_str(),
            "key_command"
        );
        match cmd {
            KeyCommand::Quit => LoopControl::Break(ShutdownReason::KeyQuit),
            KeyCommand::PauseToggle => {
                self.state = match self.state {
                    LoopState::Running => LoopState::Paused,
                    _ => LoopState::Running,
                };
                let paused = self.state == LoopState::Paused;
                self.pause.send_replace(paused);
                info!(target: "runtime", paused, "pause_toggled");
                LoopControl::Continue
            }
            KeyCommand::Refresh => self.repaint_previous(),
            KeyCommand::Scroll(delta) => {
                let Some(prev) = &self.prev else {
                    return LoopControl::Continue;
                };
                if !self.viewport.scroll(delta, prev.len(), prev.visible_height) {
                    return LoopControl::Continue;
                }
                trace!(target: "runtime", delta, head = self.viewport.head, "scrolled");
                self.repaint_previous()
            }
        }
    }

    fn handle_resize(&mut self) -> LoopControl {
        let size = match self.probe.window_size() {
            Ok(size) => size,
            Err(e) => {
                return self.fail(RuntimeError::Geometry(e), ShutdownReason::GeometryFailed);
            }
        };
        let Some(prev) = self.prev.as_mut() else {
            return LoopControl::Continue;
        };
        let visible = prev.len().min(size.content_rows());
        if visible == prev.visible_height && size.cols == prev.width {
            return LoopControl::Continue;
        }
        debug!(target: "runtime", rows = size.rows, cols = size.cols, "geometry_changed");
        prev.relayout(size);
        self.viewport.reclamp(prev.len(), prev.visible_height);
        self.repaint_previous()
    }

    fn repaint_previous(&mut self) -> LoopControl {
        let Some(prev) = self.prev.take() else {
            return LoopControl::Continue;
        };
        let result = self.render(&prev, RedrawMode::Repaint);
        self.prev = Some(prev);
        result
    }

    fn render(&mut self, frame: &Frame, mode: RedrawMode) -> LoopControl {
        match self.engine.render(&mut self.out, frame, &self.viewport, mode) {
            Ok(_) => LoopControl::Continue,
            Err(e) => self.fail(RuntimeError::Io(e), ShutdownReason::WriteFailed),
        }
    }

    fn fail(&mut self, err: RuntimeError, reason: ShutdownReason) -> LoopControl {
        error!(target: "runtime", reason = reason.as_str(), error = ?err, "fatal");
        self.failure = Some(err);
        LoopControl::Break(reason)
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        let grace = self.settings.shutdown_grace;

        // Closing the mailboxes wakes every source parked in `send` or
        // `closed()`; a tick already running is left to finish on its own.
        self.producers.ticks.close();
        if let Some(rx) = self.producers.keys.as_mut() {
            rx.close();
        }
        if let Some(rx) = self.producers.geometry.as_mut() {
            rx.close();
        }

        while let Some(handle) = self.producers.source_handles.pop() {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    grace_ms = grace.as_millis() as u64,
                    "event_source_task_timeout"
                ),
            }
        }

        if let Some(shutdown) = self.producers.input_shutdown.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "input_task_shutdown_signal"
            );
            shutdown.signal();
        }

        if let Some(handle) = self.producers.input_task.take() {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_joined"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "input_task_join_failed"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_timeout"
                ),
            }
        }

        let metrics = self.engine.metrics_snapshot();
        info!(
            target: "runtime.shutdown",
            full_frames = metrics.full_frames,
            repaint_frames = metrics.repaint_frames,
            diff_frames = metrics.diff_frames,
            rows_skipped = metrics.rows_skipped,
            "render_totals"
        );
        let events = EventCounters::snapshot();
        info!(
            target: "runtime.shutdown",
            ticks_delivered = events.ticks_delivered,
            ticks_dropped_paused = events.ticks_dropped_paused,
            key_commands = events.key_commands_decoded,
            key_bytes_discarded = events.key_bytes_discarded,
            geometry_notifications = events.geometry_notifications,
            send_failures = events.channel_send_failures,
            input_starts = events.async_input_starts,
            input_stops = events.async_input_stop_signal
                + events.async_input_stop_channel
                + events.async_input_stop_stream
                + events.async_input_stop_error,
            "event_totals"
        );
        log_shutdown_stage(reason, "complete");
    }
}

/// Receive from an optional mailbox; a missing one never becomes ready.
async fn recv_optional<T>(rx: &mut Option<Receiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
