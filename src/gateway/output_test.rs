// ABOUTME: Tests for the CommandOutput success convention.
// ABOUTME: Covers OK detection, literal stderr propagation and text helpers.

use super::CommandOutput;
use crate::error::TransportError;

#[test]
fn test_ok_prefix_is_success_regardless_of_stdout() {
    let output = CommandOutput::new("ERROR: this is only stdout", "OK");
    assert!(output.is_ok());

    let output = CommandOutput::new("", "OK, 2 antennas moved\n");
    assert!(output.is_ok());
}

#[test]
fn test_anything_else_is_failure() {
    assert!(!CommandOutput::new("fine", "").is_ok());
    assert!(!CommandOutput::new("", "ok\n").is_ok());
    assert!(!CommandOutput::new("", " OK").is_ok());
    assert!(!CommandOutput::new("", "FAIL").is_ok());
}

#[test]
fn test_ensure_ok_carries_literal_stderr() {
    let args = vec!["10,10".to_string(), "1ax,1ay".to_string()];
    let err = CommandOutput::rejected("atten: device busy\n")
        .ensure_ok("atten", &args)
        .unwrap_err();

    match &err {
        TransportError::Rejected {
            command,
            args: got_args,
            stderr,
        } => {
            assert_eq!(command, "atten");
            assert_eq!(got_args, &args);
            assert_eq!(stderr, "atten: device busy\n");
        }
        other => panic!("Expected Rejected, got {:?}", other),
    }
    assert!(err.to_string().contains("atten 10,10 1ax,1ay"));
    assert!(err.to_string().contains("device busy"));
}

#[test]
fn test_ensure_ok_passes_output_through() {
    let output = CommandOutput::ok("none 1a 2b\n").ensure_ok("antlist", &[]).unwrap();
    assert_eq!(output.stdout_text(), "none 1a 2b\n");
    assert_eq!(output.stderr_text(), "OK\n");
}
