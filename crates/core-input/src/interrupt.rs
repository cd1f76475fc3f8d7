//! SIGINT as a key command.
//!
//! In raw mode Ctrl-C arrives as byte 0x03 and goes through the decoder.
//! With keyboard control disabled the terminal still generates SIGINT, so
//! this source turns it into the same `Quit` the loop already handles.

use core_events::{AsyncEventSource, KeyCommand};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct InterruptSource;

impl AsyncEventSource<KeyCommand> for InterruptSource {
    fn name(&self) -> &'static str {
        "interrupt"
    }

    fn spawn(self: Box<Self>, tx: Sender<KeyCommand>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::select! {
                _ = tx.closed() => {}
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => {
                        info!(target: "input.thread", "interrupt_received");
                        let _ = tx.send(KeyCommand::Quit).await;
                    }
                    Err(e) => warn!(target: "input.thread", error = %e, "interrupt_listener_failed"),
                },
            }
        })
    }
}
