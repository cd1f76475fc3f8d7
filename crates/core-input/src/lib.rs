//! Keyboard input for the control loop: a blocking stdin reader thread, an
//! incremental byte decoder and the async service tying them together.

mod async_service;
pub mod decoder;
pub mod interrupt;
pub mod reader;

pub use async_service::AsyncInputShutdown;
pub use decoder::KeyDecoder;
pub use interrupt::InterruptSource;

use async_service::spawn_async_input_task;
use core_events::KeyCommand;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Spawn the async input service reading the process's stdin.
///
/// Returns the `JoinHandle` for the background task alongside a shutdown handle
/// that can be used to request immediate termination.
pub fn spawn_async_input(sender: Sender<KeyCommand>) -> (JoinHandle<()>, AsyncInputShutdown) {
    spawn_async_input_task(sender)
}
