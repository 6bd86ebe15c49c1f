//! Tests for ProcessSpawner and ChildProcess against real processes

use std::io::Write;

use super::common::wait_until;
use crate::error::HarnessError;
use crate::services::ProcessSpawner;
use crate::traits::Spawner;
use crate::worker::{TerminateOutcome, WorkerExit};

fn script(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{body}").unwrap();
    file
}

#[tokio::test]
async fn test_spawn_missing_executable_is_spawn_error() {
    let spawner = ProcessSpawner::new();

    let result = spawner.spawn(0, "definitely-not-a-real-binary-4242 -i input");

    match result {
        Err(HarnessError::Spawn { seq, command, .. }) => {
            assert_eq!(seq, 0);
            assert_eq!(command, "definitely-not-a-real-binary-4242 -i input");
        }
        other => panic!("expected spawn error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_running_worker_terminates_with_sigterm() {
    let spawner = ProcessSpawner::new();
    let worker = spawner.spawn(7, "sleep 30").unwrap();

    assert_eq!(worker.seq(), 7);
    assert!(worker.pid().is_some());
    assert!(worker.is_alive());

    assert_eq!(worker.terminate().unwrap(), TerminateOutcome::Signaled);
    assert!(wait_until(|| !worker.is_alive()).await, "worker should exit after SIGTERM");
    assert_eq!(worker.exit_status(), Some(WorkerExit::signal(15)));

    // Second terminate on a reaped process is not an error
    assert_eq!(worker.terminate().unwrap(), TerminateOutcome::AlreadyExited);
}

#[tokio::test]
async fn test_exited_worker_output_is_captured() {
    let file = script("echo frame=1\necho 'Connection refused' >&2\nexit 3");
    let command = format!("sh {}", file.path().display());

    let worker = ProcessSpawner::new().spawn(1, &command).unwrap();
    assert!(wait_until(|| !worker.is_alive()).await);

    assert_eq!(worker.exit_status(), Some(WorkerExit::code(3)));
    let output = worker.capture_output().await;
    assert_eq!(output.stdout, "frame=1");
    assert_eq!(output.stderr, "Connection refused");
}

#[tokio::test]
async fn test_output_capacity_keeps_tail() {
    let file = script("echo 0123456789abcdef");
    let command = format!("sh {}", file.path().display());

    let worker = ProcessSpawner::new().with_output_capacity(7).spawn(2, &command).unwrap();
    assert!(wait_until(|| !worker.is_alive()).await);

    // Trailing newline is part of the kept bytes and trimmed on read
    assert_eq!(worker.capture_output().await.stdout, "abcdef");
}
