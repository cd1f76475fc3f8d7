//! Pipeline executor: run a command, or a chain of commands wired
//! stdout→stdin, and return the final text plus an optional error.
//!
//! * Single stage: stdout and stderr are both captured; the text is stdout
//!   followed by stderr so failures stay visible verbatim.
//! * Multiple stages: only the final stage's stdout is captured. Every
//!   stage is started before any is waited on (see `builder`).
//! * Children never inherit the controlling terminal's stdin.

use thiserror::Error;

mod builder;
pub mod ticker;

pub use builder::PipelineBuilder;
pub use ticker::{TickOutput, TickerSource};

/// Argument that separates stages in direct-exec mode.
pub const STAGE_SEPARATOR: &str = "|";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no command given")]
    EmptyCommand,
    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for `{program}`")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("pipeline i/o failed")]
    Io(#[from] std::io::Error),
    #[error("`{program}` exited with {}", exit_label(.code))]
    ExitStatus { program: String, code: Option<i32> },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl PipelineError {
    /// Exit code of the final stage, when the failure is a non-zero exit.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineError::ExitStatus { code, .. } => *code,
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineError::EmptyCommand => "empty_command",
            PipelineError::Spawn { .. } => "spawn",
            PipelineError::Wait { .. } => "wait",
            PipelineError::Io(_) => "io",
            PipelineError::ExitStatus { .. } => "exit_status",
        }
    }
}

/// Result of one pipeline execution. `text` holds whatever output was
/// captured even when `error` is set.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub text: String,
    pub error: Option<PipelineError>,
}

impl PipelineOutput {
    pub fn failed(error: PipelineError) -> Self {
        Self {
            text: String::new(),
            error: Some(error),
        }
    }
}

/// Ordered sequence of argv vectors, one per stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    stages: Vec<Vec<String>>,
}

impl PipelineSpec {
    pub fn new(stages: Vec<Vec<String>>) -> Result<Self, PipelineError> {
        if stages.is_empty() || stages.iter().any(|argv| argv.is_empty()) {
            return Err(PipelineError::EmptyCommand);
        }
        Ok(Self { stages })
    }

    /// Direct-exec mode: split `argv` into stages at standalone `|` arguments.
    pub fn direct<S: AsRef<str>>(argv: &[S]) -> Result<Self, PipelineError> {
        Self::new(split_stages(argv, STAGE_SEPARATOR))
    }

    /// Shell mode: join the words with spaces and hand them to `sh -c`.
    pub fn shell<S: AsRef<str>>(words: &[S]) -> Result<Self, PipelineError> {
        let joined = words
            .iter()
            .map(|w| w.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.trim().is_empty() {
            return Err(PipelineError::EmptyCommand);
        }
        Self::new(vec![vec!["sh".to_string(), "-c".to_string(), joined]])
    }

    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    /// Human-readable rendering for logs (`a b | c d`).
    pub fn display(&self) -> String {
        self.stages
            .iter()
            .map(|argv| argv.join(" "))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Execute once, blocking the calling thread until every stage exits.
    pub fn run(&self) -> PipelineOutput {
        let span = tracing::debug_span!(target: "pipeline.exec", "pipeline_run", stages = self.stages.len());
        let _enter = span.enter();
        let out = PipelineBuilder::new(&self.stages).run();
        match &out.error {
            None => tracing::trace!(target: "pipeline.exec", bytes = out.text.len(), "pipeline_ok"),
            Some(err) => tracing::debug!(
                target: "pipeline.exec",
                kind = err.as_str(),
                error = ?err,
                bytes = out.text.len(),
                "pipeline_failed"
            ),
        }
        out
    }
}

/// Split `argv` at every argument equal to `separator`. Empty stages
/// (leading, trailing or doubled separators) are kept so validation can
/// reject them.
pub fn split_stages<S: AsRef<str>>(argv: &[S], separator: &str) -> Vec<Vec<String>> {
    let mut stages = vec![Vec::new()];
    for arg in argv {
        let arg = arg.as_ref();
        if arg == separator {
            stages.push(Vec::new());
        } else if let Some(current) = stages.last_mut() {
            current.push(arg.to_string());
        }
    }
    stages
}
