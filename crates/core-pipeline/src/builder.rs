//! Stage builder: allocates N-1 pipes for N stages, starts every stage, then
//! waits.
//!
//! Deadlock avoidance: all stages are spawned before any wait, and the final
//! stage's output is drained on a helper thread while the intermediate
//! stages are reaped. A start or wait failure on a non-final stage aborts
//! immediately; remaining stages are left to observe EOF / SIGPIPE.

use crate::{PipelineError, PipelineOutput};
use std::process::{Child, Command, Output, Stdio};
use std::thread;

pub struct PipelineBuilder<'a> {
    stages: &'a [Vec<String>],
}

fn program(argv: &[String]) -> String {
    argv.first().cloned().unwrap_or_default()
}

fn command(argv: &[String]) -> Result<Command, PipelineError> {
    let (prog, args) = argv.split_first().ok_or(PipelineError::EmptyCommand)?;
    let mut cmd = Command::new(prog);
    cmd.args(args);
    Ok(cmd)
}

fn check_status(argv: &[String], output: &Output) -> Option<PipelineError> {
    if output.status.success() {
        None
    } else {
        Some(PipelineError::ExitStatus {
            program: program(argv),
            code: output.status.code(),
        })
    }
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(stages: &'a [Vec<String>]) -> Self {
        Self { stages }
    }

    pub fn run(self) -> PipelineOutput {
        match self.stages {
            [] => PipelineOutput::failed(PipelineError::EmptyCommand),
            [single] => run_single(single),
            stages => match run_chain(stages) {
                Ok(out) => out,
                Err(err) => PipelineOutput::failed(err),
            },
        }
    }
}

fn run_single(argv: &[String]) -> PipelineOutput {
    let mut cmd = match command(argv) {
        Ok(cmd) => cmd,
        Err(err) => return PipelineOutput::failed(err),
    };
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();
    let output = match output {
        Ok(output) => output,
        Err(source) => {
            return PipelineOutput::failed(PipelineError::Spawn {
                program: program(argv),
                source,
            });
        }
    };
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    PipelineOutput {
        error: check_status(argv, &output),
        text,
    }
}

fn run_chain(stages: &[Vec<String>]) -> Result<PipelineOutput, PipelineError> {
    let last_index = stages.len() - 1;
    let mut children: Vec<Child> = Vec::with_capacity(stages.len());
    let mut upstream = None;

    for (k, argv) in stages.iter().enumerate() {
        let mut cmd = match command(argv) {
            Ok(cmd) => cmd,
            Err(err) => {
                reap_detached(children);
                return Err(err);
            }
        };
        let stdin = match upstream.take() {
            Some(pipe) => Stdio::from(pipe),
            None => Stdio::null(),
        };
        cmd.stdin(stdin).stdout(Stdio::piped()).stderr(Stdio::null());
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                reap_detached(children);
                return Err(PipelineError::Spawn {
                    program: program(argv),
                    source,
                });
            }
        };
        if k < last_index {
            upstream = child.stdout.take();
        }
        tracing::trace!(target: "pipeline.exec", stage = k, pid = child.id(), "stage_started");
        children.push(child);
    }

    let Some(last) = children.pop() else {
        return Err(PipelineError::EmptyCommand);
    };
    let drain = thread::Builder::new()
        .name("pipeline-drain".into())
        .spawn(move || last.wait_with_output())?;

    let mut pending = children.into_iter().enumerate();
    while let Some((k, mut child)) = pending.next() {
        match child.wait() {
            Ok(status) => {
                tracing::trace!(target: "pipeline.exec", stage = k, ?status, "stage_exited");
            }
            Err(source) => {
                reap_detached(pending.map(|(_, child)| child).collect());
                return Err(PipelineError::Wait {
                    program: program(&stages[k]),
                    source,
                });
            }
        }
    }

    let final_argv = &stages[last_index];
    let output = drain
        .join()
        .map_err(|_| std::io::Error::other("pipeline drain thread panicked"))?
        .map_err(|source| PipelineError::Wait {
            program: program(final_argv),
            source,
        })?;
    Ok(PipelineOutput {
        error: check_status(final_argv, &output),
        text: String::from_utf8_lossy(&output.stdout).into_owned(),
    })
}

/// Hand stages that were already started to a background thread that waits
/// on them, so an aborted chain leaves no zombies behind. The caller returns
/// its error without blocking on them.
fn reap_detached(children: Vec<Child>) {
    if children.is_empty() {
        return;
    }
    let spawned = thread::Builder::new()
        .name("pipeline-reaper".into())
        .spawn(move || {
            for mut child in children {
                let pid = child.id();
                if let Err(e) = child.wait() {
                    tracing::warn!(target: "pipeline.exec", pid, error = %e, "reap_failed");
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(target: "pipeline.exec", error = %e, "reaper_spawn_failed");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn single_stage_captures_stdout_then_stderr() {
        let stages = vec![argv(&["sh", "-c", "printf out; printf err >&2"])];
        let out = PipelineBuilder::new(&stages).run();
        assert!(out.error.is_none());
        assert_eq!(out.text, "outerr");
    }

    #[test]
    fn chain_captures_only_final_stdout() {
        let stages = vec![
            argv(&["sh", "-c", "printf 'a\\nb\\n'; printf noise >&2"]),
            argv(&["sh", "-c", "cat; printf hidden >&2"]),
        ];
        let out = PipelineBuilder::new(&stages).run();
        assert!(out.error.is_none(), "{:?}", out.error);
        assert_eq!(out.text, "a\nb\n");
    }

    #[test]
    fn missing_intermediate_binary_aborts() {
        let stages = vec![
            argv(&["definitely-not-a-real-binary-topless"]),
            argv(&["cat"]),
        ];
        let out = PipelineBuilder::new(&stages).run();
        assert!(matches!(out.error, Some(PipelineError::Spawn { .. })));
        assert!(out.text.is_empty());
    }

    #[test]
    fn large_output_through_chain_does_not_deadlock() {
        let stages = vec![
            argv(&["sh", "-c", "i=0; while [ $i -lt 20000 ]; do echo line$i; i=$((i+1)); done"]),
            argv(&["cat"]),
            argv(&["wc", "-l"]),
        ];
        let out = PipelineBuilder::new(&stages).run();
        assert!(out.error.is_none());
        assert_eq!(out.text.trim(), "20000");
    }
}
