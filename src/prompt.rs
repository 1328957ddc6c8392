//! Yes/no confirmation as an injected capability.
//!
//! The pipeline never reads the terminal itself. It asks a [`Confirm`]
//! implementation, so unattended runs and tests take the default answer.

use std::io::{BufRead, Write};

/// Answers a yes/no question.
pub trait Confirm {
    fn confirm(&self, prompt: &str, default: bool) -> bool;
}

/// Always takes the default answer. Used for unattended runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeDefault;

impl Confirm for AssumeDefault {
    fn confirm(&self, _prompt: &str, default: bool) -> bool {
        default
    }
}

/// Asks on stderr and reads the answer from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

/// Give up and take the default after this many unrecognised answers
const MAX_ATTEMPTS: usize = 3;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str, default: bool) -> bool {
        let stdin = std::io::stdin();
        ask(prompt, default, &mut stdin.lock(), &mut std::io::stderr())
    }
}

fn ask(prompt: &str, default: bool, input: &mut impl BufRead, out: &mut impl Write) -> bool {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    for _ in 0..MAX_ATTEMPTS {
        let _ = write!(out, "{prompt} {hint} ");
        let _ = out.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            // EOF or unreadable stdin: nobody is there to answer
            Ok(0) | Err(_) => return default,
            Ok(_) => {}
        }
        if let Some(answer) = parse_answer(&line, default) {
            return answer;
        }
        let _ = writeln!(out, "please answer y or n");
    }
    default
}

/// Interpret a typed answer; `None` when it is neither yes nor no.
pub fn parse_answer(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
