//! Error taxonomy for the provisioning pipeline.
//!
//! Each stage has its own enum so callers can tell a network problem from a
//! toolchain problem from a genuine integrity failure. [`ProvisionError`]
//! wraps them for the pipeline and carries the stage tag and exit code.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Transport failure talking to a remote collaborator.
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("failed to read response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HttpError {
    /// Classify a ureq failure for `url`.
    pub fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, _) => Self::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(t) => {
                // Transport's Display repeats the URL; keep only the cause
                let mut reason = t.kind().to_string();
                if let Some(message) = t.message() {
                    reason.push_str(&format!(": {message}"));
                }
                if let Some(source) = std::error::Error::source(&t) {
                    reason.push_str(&format!(": {source}"));
                }
                Self::Transport {
                    url: url.to_string(),
                    reason,
                }
            }
        }
    }
}

/// Failure of an external command driven by a build-path collaborator.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}{}", fmt_stderr(.stderr))]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    Fetch(#[from] HttpError),

    #[error("{0}")]
    Rejected(String),
}

fn fmt_stderr(stderr: &str) -> String {
    if stderr.trim().is_empty() {
        String::new()
    } else {
        format!("\nDetails: {}", stderr.trim())
    }
}

/// Failure turning a version specifier into a concrete tag.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("release metadata service unreachable: {0}")]
    Unreachable(#[source] HttpError),

    #[error("latest release of '{project}' has no usable tag")]
    EmptyResult { project: String },
}

/// Failure obtaining a candidate binary.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("download failed: {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("rust toolchain missing: {0}")]
    ToolchainMissing(String),

    #[error("source build failed: {0}")]
    BuildFailed(String),

    #[error("cannot prepare workspace {}: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure placing the artifact at its destination.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("integrity check failed: {0}")]
    IntegrityFailure(String),

    #[error("cannot install to {}: {source}", .path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("installed binary {} did not answer --version: {reason}", .path.display())]
    SmokeCheckFailed { path: PathBuf, reason: String },

    #[error(
        "{} is being written by another install (lock held on {})",
        .destination.display(),
        .lock.display()
    )]
    DestinationLocked { destination: PathBuf, lock: PathBuf },
}

/// Pipeline stage, used to tag user-visible failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Resolve,
    Acquire,
    Verify,
    Install,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Resolve => "resolve",
            Self::Acquire => "acquire",
            Self::Verify => "verify",
            Self::Install => "install",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any fatal pipeline failure.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Install(#[from] InstallError),
}

impl ProvisionError {
    /// The stage that failed. An integrity refusal is reported against
    /// `verify` even though the installer raises it.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Config,
            Self::Resolution(_) => Stage::Resolve,
            Self::Acquisition(_) => Stage::Acquire,
            Self::Install(InstallError::IntegrityFailure(_)) => Stage::Verify,
            Self::Install(_) => Stage::Install,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self.stage() {
            Stage::Config => 2,
            Stage::Resolve => 3,
            Stage::Acquire => 4,
            Stage::Verify => 5,
            Stage::Install => 6,
        }
    }

    /// Integrity failures are reported at the highest severity.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self.stage(), Stage::Verify)
    }
}
