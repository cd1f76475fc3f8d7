//! Control loop: the single owner of render state.
//!
//! Three producers feed it through their own mailboxes (command ticks, key
//! commands, geometry notifications). The loop selects over whichever is
//! ready, applies the message to the previous frame, the viewport and the
//! render engine, and writes the result to the terminal. No producer ever
//! touches render state.

mod control_loop;
mod shutdown;

pub use control_loop::{ControlLoop, LoopSettings, LoopState, Producers};
pub use shutdown::ShutdownReason;

use core_pipeline::PipelineError;
use core_terminal::TerminalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The watched command failed and `--force` was not given. `output` is
    /// whatever the failing run printed.
    #[error("command failed")]
    Pipeline {
        #[source]
        source: PipelineError,
        output: String,
    },
    #[error("cannot determine terminal size")]
    Geometry(#[from] TerminalError),
    #[error("terminal write failed")]
    Io(#[from] std::io::Error),
    #[error("command ticker stopped unexpectedly")]
    TickerStopped,
}

impl RuntimeError {
    /// Process exit code for this failure: the command's own status when it
    /// exited non-zero, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            RuntimeError::Pipeline { source, .. } => source
                .exit_code()
                .and_then(|c| u8::try_from(c).ok())
                .filter(|c| *c != 0)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit(code: Option<i32>) -> RuntimeError {
        RuntimeError::Pipeline {
            source: PipelineError::ExitStatus {
                program: "false".into(),
                code,
            },
            output: String::new(),
        }
    }

    #[test]
    fn exit_code_follows_child() {
        assert_eq!(exit(Some(3)).exit_code(), 3);
        assert_eq!(exit(None).exit_code(), 1);
        assert_eq!(exit(Some(300)).exit_code(), 1);
        assert_eq!(exit(Some(-1)).exit_code(), 1);
        assert_eq!(RuntimeError::TickerStopped.exit_code(), 1);
    }

    #[test]
    fn pipeline_error_chains_the_command_failure() {
        let err = exit(Some(2));
        assert_eq!(err.to_string(), "command failed");
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("`false` exited with status 2"));
    }
}
