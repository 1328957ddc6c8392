//! Build path: compile the binary from source.
//!
//! Two collaborators are involved. A [`Toolchain`] provides `cargo` (and can
//! install or update it), a [`SourceBuilder`] clones, checks out and builds.

use crate::core::error::CommandError;
use crate::core::output::Reporter;
use crate::helpers::internal::http::HttpClient;
use crate::helpers::internal::process::{self, describe, run_captured};
use crate::helpers::internal::progress::ProgressGuard;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Bootstrap script published by the Rust project
const RUSTUP_INIT_URL: &str = "https://sh.rustup.rs";

/// Lines of stderr kept in failure messages
const STDERR_TAIL_LINES: usize = 20;

/// Compiler toolchain collaborator.
pub trait Toolchain {
    /// Path of a usable `cargo`, if one is installed.
    fn locate(&self) -> Option<PathBuf>;

    /// Install the toolchain, using `workspace` for scratch files.
    fn install(&self, workspace: &Path) -> Result<(), CommandError>;

    /// Bring an existing toolchain up to date.
    fn update(&self) -> Result<(), CommandError>;
}

/// Result of a build invocation that could be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Whether the build tool exited zero
    pub success: bool,
    /// Tail of the build tool's stderr
    pub stderr_tail: String,
}

/// Source-control and build collaborator.
pub trait SourceBuilder {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), CommandError>;

    fn checkout(&self, repo: &Path, branch: &str) -> Result<(), CommandError>;

    /// Release build of the single binary `bin`. A non-zero exit is
    /// reported in the outcome, not as an error.
    fn build(&self, cargo: &Path, repo: &Path, bin: &str) -> Result<BuildOutcome, CommandError>;
}

/// Where cargo puts the release binary for `bin`.
pub fn release_output(repo: &Path, bin: &str) -> PathBuf {
    repo.join("target")
        .join("release")
        .join(format!("{bin}{}", std::env::consts::EXE_SUFFIX))
}

fn check_status(cmd: &Command, output: &std::process::Output) -> Result<(), CommandError> {
    if output.status.success() {
        return Ok(());
    }
    Err(CommandError::Failed {
        command: describe(cmd),
        status: output.status.to_string(),
        stderr: process::stderr_tail(output, STDERR_TAIL_LINES),
    })
}

fn spawn_error(cmd: &Command, source: std::io::Error) -> CommandError {
    CommandError::Spawn {
        program: cmd.get_program().to_string_lossy().into_owned(),
        source,
    }
}

/// Rust toolchain managed by rustup.
pub struct Rustup {
    client: HttpClient,
    reporter: Reporter,
}

impl Rustup {
    pub fn new(client: HttpClient, reporter: Reporter) -> Self {
        Self { client, reporter }
    }

    fn cargo_home() -> Option<PathBuf> {
        std::env::var_os("CARGO_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".cargo")))
    }

    fn in_cargo_home(tool: &str) -> Option<PathBuf> {
        let path = Self::cargo_home()?
            .join("bin")
            .join(format!("{tool}{}", std::env::consts::EXE_SUFFIX));
        path.is_file().then_some(path)
    }

    fn answers_version(program: &Path) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Toolchain for Rustup {
    fn locate(&self) -> Option<PathBuf> {
        let on_path = PathBuf::from("cargo");
        if Self::answers_version(&on_path) {
            return Some(on_path);
        }
        // A fresh rustup install is not on PATH until the shell is restarted
        Self::in_cargo_home("cargo").filter(|p| Self::answers_version(p))
    }

    fn install(&self, workspace: &Path) -> Result<(), CommandError> {
        if cfg!(windows) {
            return Err(CommandError::Rejected(
                "automatic toolchain installation needs a POSIX shell; install Rust from https://rustup.rs".into(),
            ));
        }
        let script = workspace.join("rustup-init.sh");
        self.reporter
            .detail(&format!("downloading {RUSTUP_INIT_URL}"));
        self.client
            .download_to(RUSTUP_INIT_URL, &script, &indicatif::ProgressBar::hidden())?;

        let mut cmd = Command::new("sh");
        cmd.arg(&script).args(["-y", "--profile", "minimal"]);
        let guard = ProgressGuard(self.reporter.spinner("installing rust toolchain"));
        let output = run_captured(&self.reporter, &mut cmd).map_err(|e| spawn_error(&cmd, e))?;
        drop(guard);
        check_status(&cmd, &output)
    }

    fn update(&self) -> Result<(), CommandError> {
        let rustup = Self::in_cargo_home("rustup").unwrap_or_else(|| PathBuf::from("rustup"));
        let mut cmd = Command::new(rustup);
        cmd.arg("update");
        let guard = ProgressGuard(self.reporter.spinner("updating rust toolchain"));
        let output = run_captured(&self.reporter, &mut cmd).map_err(|e| spawn_error(&cmd, e))?;
        drop(guard);
        check_status(&cmd, &output)
    }
}

/// Validate that a URL uses an allowed scheme for git operations.
/// Only https://, http://, ssh:// and git@ URLs are supported.
pub fn validate_git_url(url: &str) -> Result<(), CommandError> {
    if ["https://", "http://", "git@", "ssh://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        Ok(())
    } else {
        Err(CommandError::Rejected(format!(
            "unsupported git URL scheme: {url} (only https://, http://, ssh:// and git@ URLs are supported)"
        )))
    }
}

/// git for source control, cargo for the build.
pub struct GitCargo {
    reporter: Reporter,
}

impl GitCargo {
    pub fn new(reporter: Reporter) -> Self {
        Self { reporter }
    }

    fn run(&self, cmd: &mut Command, message: &str) -> Result<std::process::Output, CommandError> {
        let guard = ProgressGuard(self.reporter.spinner(message));
        let output = run_captured(&self.reporter, cmd).map_err(|e| spawn_error(cmd, e))?;
        drop(guard);
        Ok(output)
    }
}

impl SourceBuilder for GitCargo {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), CommandError> {
        validate_git_url(url)?;
        self.reporter.detail(&format!("git clone {url}"));

        let mut cmd = Command::new("git");
        cmd.arg("clone").arg(url).arg(dest);
        let output = self.run(&mut cmd, "cloning source")?;
        check_status(&cmd, &output)
    }

    fn checkout(&self, repo: &Path, branch: &str) -> Result<(), CommandError> {
        self.reporter.detail(&format!("git checkout {branch}"));

        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(repo).args(["checkout", branch]);
        let output = self.run(&mut cmd, &format!("checking out {branch}"))?;
        check_status(&cmd, &output)
    }

    fn build(&self, cargo: &Path, repo: &Path, bin: &str) -> Result<BuildOutcome, CommandError> {
        self.reporter
            .detail(&format!("cargo build --release --bin {bin}"));

        let mut cmd = Command::new(cargo);
        cmd.current_dir(repo)
            .args(["build", "--release", "--bin", bin]);
        let output = self.run(&mut cmd, &format!("building {bin} (this can take a while)"))?;
        Ok(BuildOutcome {
            success: output.status.success(),
            stderr_tail: process::stderr_tail(&output, STDERR_TAIL_LINES),
        })
    }
}
