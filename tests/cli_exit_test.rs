//! Process-level tests for the tagdelay binary: stdio piping and exit codes

use std::io::Write;
use std::process::{Command, Stdio};

use tagdelay::format::{OutputRecord, RawRecord, OUTPUT_RECORD_SIZE};

fn tagdelay() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tagdelay"));
    cmd.env("RUST_LOG", "tagdelay=warn");
    cmd
}

/// Exit status as seen by the shell for `exit(-code)`
#[cfg(unix)]
fn shell_status(code: i32) -> i32 {
    (-code) & 0xff
}

#[test]
fn test_help_exits_zero() {
    let output = tagdelay().arg("-h").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("--pattern"));
    assert!(text.contains("--delay"));
}

#[test]
fn test_stdin_to_stdout() {
    let input: Vec<u8> = [RawRecord::new(2, 1, 100), RawRecord::new(3, 2, 150)]
        .iter()
        .flat_map(|r| r.to_bytes())
        .collect();

    let mut child = tagdelay()
        .args(["-p", "01:02", "-d", "50"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(&input).unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(output.stdout.len(), 2 * OUTPUT_RECORD_SIZE);
    let mut first = [0u8; OUTPUT_RECORD_SIZE];
    first.copy_from_slice(&output.stdout[..OUTPUT_RECORD_SIZE]);
    assert_eq!(OutputRecord::from_bytes(&first), OutputRecord::new(0, 1, 150));
}

#[cfg(unix)]
#[test]
fn test_bad_delay_exit_code() {
    let output = tagdelay()
        .args(["-d", "-20"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(shell_status(19)));
    let text = String::from_utf8_lossy(&output.stderr);
    assert!(text.contains("positive integer"));
}

#[cfg(unix)]
#[test]
fn test_missing_input_exit_code() {
    let output = tagdelay()
        .args(["-i", "/nonexistent/tagdelay/run.dump"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(shell_status(5)));
    let text = String::from_utf8_lossy(&output.stderr);
    assert!(text.contains("cannot open input file"));
}

#[cfg(unix)]
#[test]
fn test_bad_pattern_exit_code() {
    let output = tagdelay()
        .args(["-p", "01:01"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(shell_status(6)));
}

#[cfg(unix)]
#[test]
fn test_invalid_channel_exit_code() {
    let record = RawRecord::new(0, 0, 42).to_bytes();
    let mut child = tagdelay()
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(&record).unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(shell_status(21)));
}
