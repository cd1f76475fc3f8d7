use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    KeyQuit,
    CommandFailed,
    GeometryFailed,
    WriteFailed,
    TickerClosed,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::KeyQuit => "key_quit",
            ShutdownReason::CommandFailed => "command_failed",
            ShutdownReason::GeometryFailed => "geometry_failed",
            ShutdownReason::WriteFailed => "write_failed",
            ShutdownReason::TickerClosed => "ticker_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}
