#![cfg(unix)]

use core_pipeline::{PipelineError, PipelineSpec};

#[test]
fn chained_stages_feed_stdout_to_stdin() {
    let spec = PipelineSpec::new(vec![
        vec!["printf".into(), "hi".into()],
        vec!["tr".into(), "h".into(), "H".into()],
    ])
    .unwrap();
    let out = spec.run();
    assert!(out.error.is_none(), "unexpected error: {:?}", out.error);
    assert_eq!(out.text, "Hi");
}

#[test]
fn direct_mode_splits_on_pipe_argument() {
    let spec = PipelineSpec::direct(&["printf", "abc", "|", "tr", "a-c", "A-C"]).unwrap();
    assert_eq!(spec.stages().len(), 2);
    assert_eq!(spec.run().text, "ABC");
}

#[test]
fn shell_mode_runs_through_sh() {
    let spec = PipelineSpec::shell(&["printf", "x;", "printf", "y"]).unwrap();
    let out = spec.run();
    assert!(out.error.is_none());
    assert_eq!(out.text, "xy");
}

#[test]
fn non_zero_exit_keeps_text_and_reports_code() {
    let spec = PipelineSpec::shell(&["echo partial; exit 3"]).unwrap();
    let out = spec.run();
    assert_eq!(out.text, "partial\n");
    match out.error {
        Some(PipelineError::ExitStatus { code, .. }) => assert_eq!(code, Some(3)),
        other => panic!("expected exit status error, got {other:?}"),
    }
}

#[test]
fn stderr_is_visible_for_single_stage() {
    let spec = PipelineSpec::shell(&["echo oops >&2; exit 1"]).unwrap();
    let out = spec.run();
    assert_eq!(out.text, "oops\n");
    assert_eq!(out.error.and_then(|e| e.exit_code()), Some(1));
}

#[test]
fn missing_binary_is_a_spawn_error() {
    let spec = PipelineSpec::direct(&["definitely-not-a-real-binary-topless"]).unwrap();
    let out = spec.run();
    assert!(matches!(out.error, Some(PipelineError::Spawn { .. })));
    assert!(out.text.is_empty());
}

#[test]
fn final_stage_failure_sets_error() {
    let spec = PipelineSpec::direct(&["printf", "x", "|", "sh", "-c", "cat; exit 2"]).unwrap();
    let out = spec.run();
    assert_eq!(out.text, "x");
    assert_eq!(out.error.and_then(|e| e.exit_code()), Some(2));
}
