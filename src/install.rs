//! Installation into the destination directory
//!
//! The artifact is copied to a staging file beside the target and renamed
//! over it, so a reader of `<destination>/<binary>` sees either the old or
//! the new executable, never a partial one. Reinstalling the same artifact
//! is a no-op in effect.

use crate::acquire::{Artifact, Origin};
use crate::core::error::InstallError;
use crate::core::lock::acquire_destination_lock;
use crate::core::output::Reporter;
use crate::helpers::internal::fs_utils::{EXECUTABLE_MODE, dir_on_path, set_mode};
use crate::verify::VerificationVerdict;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

/// How long the installed binary gets to answer `--version`
const SMOKE_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successful install. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRecord {
    pub path: PathBuf,
    /// Trimmed stdout of `<binary> --version`
    pub reported_version: String,
}

pub struct Installer<'a> {
    pub binary_name: &'a str,
    pub reporter: Reporter,
}

impl Installer<'_> {
    pub fn install(
        &self,
        artifact: &Artifact,
        verdict: Option<&VerificationVerdict>,
        destination: &Path,
    ) -> Result<InstallationRecord, InstallError> {
        check_verdict(artifact, verdict)?;

        std::fs::create_dir_all(destination).map_err(|source| InstallError::CopyFailed {
            path: destination.to_path_buf(),
            source,
        })?;
        let _lock = acquire_destination_lock(destination, self.binary_name)?;

        let target = destination.join(format!("{}{}", self.binary_name, std::env::consts::EXE_SUFFIX));
        self.reporter
            .detail(&format!("installing to {}", target.display()));
        place(&artifact.path, destination, &target)?;

        let reported_version = smoke_check(&target, SMOKE_CHECK_TIMEOUT)?;

        if !dir_on_path(destination) {
            self.reporter.warning(&format!(
                "{} is not on PATH; add it to run {} by name",
                destination.display(),
                self.binary_name
            ));
        }

        Ok(InstallationRecord {
            path: target,
            reported_version,
        })
    }
}

/// Refuse artifacts whose integrity is known bad, or unknown for a download.
fn check_verdict(
    artifact: &Artifact,
    verdict: Option<&VerificationVerdict>,
) -> Result<(), InstallError> {
    match (verdict, artifact.origin) {
        (Some(VerificationVerdict::Mismatched { expected, actual }), _) => {
            Err(InstallError::IntegrityFailure(format!(
                "expected {expected}, got {actual}"
            )))
        }
        (None, Origin::Downloaded) => Err(InstallError::IntegrityFailure(
            "downloaded artifact was never verified".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Copy `source` to a staging file in `dir`, then rename it onto `target`.
fn place(source: &Path, dir: &Path, target: &Path) -> Result<(), InstallError> {
    let copy_failed = |path: &Path, source: std::io::Error| InstallError::CopyFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempfile_in(dir)
        .map_err(|e| copy_failed(dir, e))?;
    let mut input = std::fs::File::open(source).map_err(|e| copy_failed(source, e))?;
    std::io::copy(&mut input, staging.as_file_mut()).map_err(|e| copy_failed(staging.path(), e))?;
    staging
        .as_file()
        .sync_all()
        .map_err(|e| copy_failed(staging.path(), e))?;
    set_mode(staging.path(), EXECUTABLE_MODE).map_err(|e| copy_failed(staging.path(), e))?;

    // The returned handle must be closed before the file is executed
    let file = staging
        .persist(target)
        .map_err(|e| copy_failed(target, e.error))?;
    drop(file);
    Ok(())
}

/// Attempts when exec races a concurrent fork holding the file open
#[cfg(unix)]
const TEXT_BUSY_RETRIES: usize = 5;

/// Run `<binary> --version`, killing it if it outlives `timeout`.
fn version_command(binary: &Path, timeout: Duration) -> std::io::Result<Output> {
    let mut child = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            return child.wait_with_output();
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("no answer within {}s", timeout.as_secs_f32()),
            ));
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[cfg(unix)]
fn run_version(binary: &Path, timeout: Duration) -> std::io::Result<Output> {
    let mut attempt = 1;
    loop {
        match version_command(binary, timeout) {
            Err(e) if e.raw_os_error() == Some(libc::ETXTBSY) && attempt < TEXT_BUSY_RETRIES => {
                attempt += 1;
                std::thread::sleep(Duration::from_millis(50));
            }
            other => return other,
        }
    }
}

#[cfg(not(unix))]
fn run_version(binary: &Path, timeout: Duration) -> std::io::Result<Output> {
    version_command(binary, timeout)
}

/// Run `<binary> --version` and return its trimmed stdout.
fn smoke_check(binary: &Path, timeout: Duration) -> Result<String, InstallError> {
    let output = run_version(binary, timeout).map_err(|e| InstallError::SmokeCheckFailed {
        path: binary.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut reason = output.status.to_string();
        if !stderr.trim().is_empty() {
            reason.push_str(&format!(": {}", stderr.trim()));
        }
        return Err(InstallError::SmokeCheckFailed {
            path: binary.to_path_buf(),
            reason,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
