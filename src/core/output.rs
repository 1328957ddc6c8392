//! Colored output and progress reporting
//!
//! Uses owo-colors for terminal colors and indicatif for progress bars.
//! A [`Reporter`] carries the run's [`Verbosity`] so stages never consult
//! ambient state to decide what to print.

use crate::helpers::internal::progress;
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How chatty the run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    #[default]
    Normal,
    /// Also echo external commands
    Verbose,
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "normal" => Ok(Self::Normal),
            "verbose" => Ok(Self::Verbose),
            other => Err(format!(
                "unknown verbosity '{other}' (expected quiet, normal or verbose)"
            )),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Quiet => "quiet",
            Self::Normal => "normal",
            Self::Verbose => "verbose",
        })
    }
}

/// Verbosity-aware printer for user-facing progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    verbosity: Verbosity,
}

impl Reporter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn normal(&self) -> bool {
        self.verbosity >= Verbosity::Normal
    }

    /// Print an action header (blue, bold)
    /// Example: "==> Installing nym-node v1.2.3"
    pub fn action(&self, message: &str) {
        if self.normal() {
            println!("{} {}", "==>".blue().bold(), message.bold());
        }
    }

    /// Print a stage marker (cyan arrow)
    /// Example: "  -> acquire"
    pub fn sub_action(&self, phase: &str) {
        if self.normal() {
            println!("  {} {}", "->".cyan(), phase);
        }
    }

    /// Print a detail line (dimmed)
    pub fn detail(&self, message: &str) {
        if self.normal() {
            println!("     {}", message.dimmed());
        }
    }

    /// Echo an external command, verbose mode only
    pub fn command(&self, cmd: &str) {
        if self.verbosity == Verbosity::Verbose {
            println!("     {} {}", "$".dimmed(), cmd.dimmed());
        }
    }

    /// Print a success message (green)
    pub fn success(&self, message: &str) {
        if self.normal() {
            println!("{} {}", "==>".green().bold(), message.green());
        }
    }

    /// Print a warning message (yellow), shown at every verbosity
    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
    }

    /// Print an error message (red), shown at every verbosity
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message.red());
    }

    /// Spinner for a long-running step; hidden in quiet mode.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if self.normal() {
            progress::create_spinner(message)
        } else {
            ProgressBar::hidden()
        }
    }
}
