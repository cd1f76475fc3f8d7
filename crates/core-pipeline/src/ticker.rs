//! Periodic command ticker.
//!
//! Runs the pipeline on a blocking worker, delivers the result through the
//! single-slot tick mailbox, then sleeps the configured interval. While the
//! pause flag is raised the ticker idles instead of spawning processes. It
//! stops when the mailbox closes or the pause sender is dropped.

use crate::{PipelineError, PipelineOutput, PipelineSpec};
use core_events::{AsyncEventSource, CHANNEL_SEND_FAILURES, TICKS_DELIVERED};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info, trace};

/// One tick's worth of command output.
#[derive(Debug)]
pub struct TickOutput {
    /// Monotonic tick number, starting at 1.
    pub seq: u64,
    pub text: String,
    pub error: Option<PipelineError>,
}

pub struct TickerSource {
    spec: Arc<PipelineSpec>,
    interval: Duration,
    paused: watch::Receiver<bool>,
}

impl TickerSource {
    pub fn new(spec: PipelineSpec, interval: Duration, paused: watch::Receiver<bool>) -> Self {
        Self {
            spec: Arc::new(spec),
            interval,
            paused,
        }
    }
}

async fn run_once(spec: Arc<PipelineSpec>) -> PipelineOutput {
    match task::spawn_blocking(move || spec.run()).await {
        Ok(out) => out,
        Err(join_err) => PipelineOutput::failed(PipelineError::Io(std::io::Error::other(
            format!("pipeline worker failed: {join_err}"),
        ))),
    }
}

impl AsyncEventSource<TickOutput> for TickerSource {
    fn name(&self) -> &'static str {
        "ticker"
    }

    fn spawn(self: Box<Self>, tx: Sender<TickOutput>) -> JoinHandle<()> {
        let TickerSource {
            spec,
            interval,
            mut paused,
        } = *self;
        tokio::spawn(async move {
            let command = spec.display();
            info!(
                target: "pipeline.tick",
                command = command.as_str(),
                interval_ms = interval.as_millis() as u64,
                "ticker_started"
            );
            let mut seq = 0u64;
            'ticks: loop {
                while *paused.borrow_and_update() {
                    trace!(target: "pipeline.tick", "ticker_idle_paused");
                    tokio::select! {
                        _ = tx.closed() => break 'ticks,
                        changed = paused.changed() => {
                            if changed.is_err() {
                                break 'ticks;
                            }
                        }
                    }
                }

                let out = run_once(spec.clone()).await;
                seq += 1;
                let tick = TickOutput {
                    seq,
                    text: out.text,
                    error: out.error,
                };
                if tx.send(tick).await.is_err() {
                    CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                    break;
                }
                TICKS_DELIVERED.fetch_add(1, Ordering::Relaxed);

                tokio::select! {
                    _ = tx.closed() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            debug!(target: "pipeline.tick", ticks = seq, "ticker_stopped");
        })
    }
}
