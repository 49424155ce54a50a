//! Exercises `SystemRunner` against real child processes.

use std::time::Duration;

use clocdiff_process::{CommandRunner, CommandSpec, ProcessError, SystemRunner};
use futures::StreamExt;
use tempfile::TempDir;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").args(["-c", script])
}

#[tokio::test]
async fn test_run_returns_stdout() {
    let runner = SystemRunner::new();
    let stdout = runner.run(&sh("echo first; echo second")).await.unwrap();
    assert_eq!(stdout, "first\nsecond\n");
}

#[tokio::test]
async fn test_run_fails_with_process_error_text() {
    let runner = SystemRunner::new();
    let err = runner
        .run(&sh("echo 'remote base already exists' >&2; exit 3"))
        .await
        .unwrap_err();

    match err {
        ProcessError::Failed {
            exit_code, message, ..
        } => {
            assert_eq!(exit_code, 3);
            assert_eq!(message, "remote base already exists");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_output_keeps_non_zero_exit() {
    let runner = SystemRunner::new();
    let output = runner.output(&sh("echo out; exit 1")).await.unwrap();
    assert!(!output.success());
    assert_eq!(output.stdout, "out\n");
}

#[tokio::test]
async fn test_spawn_failure_for_unknown_program() {
    let runner = SystemRunner::new();
    let err = runner
        .run(&CommandSpec::new("clocdiff-no-such-program-xyz"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::SpawnFailed { .. }));
}

#[tokio::test]
async fn test_runs_in_working_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "x").unwrap();

    let runner = SystemRunner::new();
    let stdout = runner
        .run(&CommandSpec::new("ls").current_dir(dir.path()))
        .await
        .unwrap();
    assert_eq!(stdout, "marker.txt\n");
}

#[tokio::test]
async fn test_lines_yields_partial_trailing_line() {
    let runner = SystemRunner::new();
    let lines: Vec<String> = runner
        .lines(&sh("printf 'a\\nb\\nc'"))
        .map(|l| l.unwrap())
        .collect()
        .await;
    assert_eq!(lines, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_lines_ends_with_error_on_failure() {
    let runner = SystemRunner::new();
    let items: Vec<_> = runner.lines(&sh("echo one; echo bad >&2; exit 2")).collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "one");
    assert!(matches!(
        items[1],
        Err(ProcessError::Failed { exit_code: 2, .. })
    ));
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let runner = SystemRunner::new().with_timeout(Duration::from_millis(100));
    let err = runner.run(&sh("sleep 5")).await.unwrap_err();
    assert!(matches!(err, ProcessError::Timeout { .. }));
}

#[tokio::test]
async fn test_run_keeps_output_bytes() {
    let runner = SystemRunner::new();
    let stdout = runner
        .run(&sh("printf '+crlf line\\r\\n+last\\n'"))
        .await
        .unwrap();
    assert_eq!(stdout, "+crlf line\r\n+last\n");
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_child_leads_its_own_process_group() {
    let runner = SystemRunner::new();
    // Field 5 of /proc/<pid>/stat is the process group id
    let stdout = runner
        .run(&sh("echo $$ $(cut -d' ' -f5 /proc/$$/stat)"))
        .await
        .unwrap();
    let ids: Vec<&str> = stdout.split_whitespace().collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1]);
}
