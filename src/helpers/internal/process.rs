//! Subprocess helpers for git, cargo and rustup.

use crate::core::output::Reporter;
use std::process::{Command, Output, Stdio};

/// Render a command line for echoing.
pub fn describe(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Run a command with stdout discarded and stderr captured.
///
/// Only spawn failures are errors; the caller inspects the exit status.
pub fn run_captured(reporter: &Reporter, cmd: &mut Command) -> std::io::Result<Output> {
    reporter.command(&describe(cmd));
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
}

/// Last few lines of captured stderr, for error messages.
pub fn stderr_tail(output: &Output, lines: usize) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let all: Vec<&str> = stderr.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
