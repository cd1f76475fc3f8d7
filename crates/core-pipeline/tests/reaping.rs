#![cfg(target_os = "linux")]

use core_pipeline::{PipelineError, PipelineSpec};
use std::time::{Duration, Instant};

/// Zombie children of this process, read from `/proc/<pid>/stat`.
fn zombie_children() -> usize {
    let me = std::process::id().to_string();
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|e| std::fs::read_to_string(e.path().join("stat")).ok())
        .filter(|stat| {
            // Fields after the parenthesised command name: state, ppid, ...
            let Some(rest) = stat.rfind(')').map(|i| &stat[i + 1..]) else {
                return false;
            };
            let mut fields = rest.split_whitespace();
            fields.next() == Some("Z") && fields.next() == Some(me.as_str())
        })
        .count()
}

fn wait_for_no_zombies(limit: Duration) -> usize {
    let start = Instant::now();
    loop {
        let count = zombie_children();
        if count == 0 || start.elapsed() > limit {
            return count;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn aborted_chain_reaps_started_stages() {
    assert_eq!(wait_for_no_zombies(Duration::from_secs(2)), 0);

    let spec = PipelineSpec::direct(&["true", "|", "definitely-not-a-real-binary-topless"]).unwrap();
    for _ in 0..5 {
        let out = spec.run();
        assert!(matches!(out.error, Some(PipelineError::Spawn { .. })));
    }

    assert_eq!(wait_for_no_zombies(Duration::from_secs(5)), 0);
}
