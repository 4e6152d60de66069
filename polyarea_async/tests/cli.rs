//! Exit codes and output of the `polyarea_async` binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;

fn polygon_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Runs the binary, killing it and failing the test if it outlives `deadline`.
fn polyarea_async(args: &[&str], deadline: Duration) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_polyarea_async"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run polyarea_async");

    let started = Instant::now();
    while child.try_wait().unwrap().is_none() {
        if started.elapsed() > deadline {
            child.kill().unwrap();
            panic!("polyarea_async still running after {deadline:?}");
        }
        thread::sleep(Duration::from_millis(50));
    }
    child.wait_with_output().unwrap()
}

#[test]
fn test_square_estimate_succeeds() {
    let file = polygon_file("-1,-1\n1,-1\n1,1\n-1,1\n");
    let path = file.path().to_str().unwrap();

    let output = polyarea_async(
        &[path, "-w", "4", "-n", "40000", "-r", "square", "-q"],
        Duration::from_secs(60),
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Total sampled: 40000"));
    assert!(stdout.contains("Estimated area: "));
}

#[test]
fn test_timeout_reports_and_exits_promptly() {
    let file = polygon_file("-1,-1\n1,-1\n1,1\n-1,1\n");
    let path = file.path().to_str().unwrap();

    let started = Instant::now();
    let output = polyarea_async(
        &[path, "-w", "1", "-n", "4000000000", "--timeout-secs", "1", "-q"],
        Duration::from_secs(20),
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("timed out after"), "stderr: {stderr}");
    assert!(stderr.contains("0 of 1 worker results"), "stderr: {stderr}");
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[test]
fn test_degenerate_polygon_exits_nonzero() {
    let file = polygon_file("0,0\n1,1\n");
    let path = file.path().to_str().unwrap();

    let output = polyarea_async(&[path], Duration::from_secs(20));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("at least 3 vertices"), "stderr: {stderr}");
}
