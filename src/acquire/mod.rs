//! Artifact acquisition
//!
//! Obtains a local executable for a `(SystemProfile, ResolvedVersion)` pair,
//! either by downloading the published release binary or by building from
//! source. Both paths hand back the same [`Artifact`] type; callers only
//! look at [`Origin`] to decide whether verification applies.
//!
//! The branch is chosen from the architecture alone. A failed download never
//! falls back to a build.

pub mod build;
pub mod download;

use crate::core::config::ProjectSettings;
use crate::core::error::AcquisitionError;
use crate::core::output::Reporter;
use crate::helpers::internal::fs_utils::{EXECUTABLE_MODE, set_mode};
use crate::platform::SystemProfile;
use crate::prompt::Confirm;
use crate::version::ResolvedVersion;
use build::{SourceBuilder, Toolchain, release_output};
use download::ArtifactHost;
use std::path::{Path, PathBuf};

pub use build::{BuildOutcome, GitCargo, Rustup};
pub use download::GithubArtifactHost;

/// How an artifact came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Downloaded,
    Built,
}

/// A local executable candidate inside the run's workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub origin: Origin,
}

/// Which acquisition path a host takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionPath {
    Download,
    Build,
}

/// Pre-built binaries exist for x86 family hosts only; everything else,
/// including unrecognised hardware, is built from source.
pub fn choose_path(profile: &SystemProfile, force_build: bool) -> AcquisitionPath {
    if !force_build && profile.arch.has_prebuilt() {
        AcquisitionPath::Download
    } else {
        AcquisitionPath::Build
    }
}

/// Obtains artifacts through the injected collaborators.
pub struct ArtifactAcquirer<'a> {
    pub host: &'a dyn ArtifactHost,
    pub toolchain: &'a dyn Toolchain,
    pub source: &'a dyn SourceBuilder,
    pub confirm: &'a dyn Confirm,
    pub project: &'a ProjectSettings,
    pub reporter: Reporter,
    pub force_build: bool,
}

impl ArtifactAcquirer<'_> {
    pub fn acquire(
        &self,
        profile: &SystemProfile,
        version: &ResolvedVersion,
        workspace: &Path,
    ) -> Result<Artifact, AcquisitionError> {
        match choose_path(profile, self.force_build) {
            AcquisitionPath::Download => self.download(version, workspace),
            AcquisitionPath::Build => self.build(workspace),
        }
    }

    fn download(
        &self,
        version: &ResolvedVersion,
        workspace: &Path,
    ) -> Result<Artifact, AcquisitionError> {
        let asset = &self.project.binary_name;
        let dest = workspace.join(asset);

        self.host
            .fetch_artifact(version, asset, &dest)
            .map_err(|source| AcquisitionError::DownloadFailed {
                url: self.host.asset_url(version, asset),
                source,
            })?;

        set_mode(&dest, EXECUTABLE_MODE).map_err(|source| AcquisitionError::Workspace {
            path: dest.clone(),
            source,
        })?;

        Ok(Artifact {
            path: dest,
            origin: Origin::Downloaded,
        })
    }

    fn build(&self, workspace: &Path) -> Result<Artifact, AcquisitionError> {
        let cargo = self.ensure_toolchain(workspace)?;
        let project = self.project;

        self.reporter.warning(&format!(
            "no pre-built binary for this platform; building the tip of '{}' from {}, which may differ from the requested release",
            project.stable_branch, project.source_repo
        ));

        let repo = workspace.join("source");
        self.source
            .clone_repo(&project.source_repo, &repo)
            .map_err(|e| AcquisitionError::BuildFailed(format!("clone failed: {e}")))?;
        self.source
            .checkout(&repo, &project.stable_branch)
            .map_err(|e| AcquisitionError::BuildFailed(format!("checkout failed: {e}")))?;

        let outcome = self
            .source
            .build(&cargo, &repo, &project.binary_name)
            .map_err(|e| AcquisitionError::BuildFailed(e.to_string()))?;

        // The artifact on disk decides success, not the exit status
        let output = release_output(&repo, &project.binary_name);
        if !output.is_file() {
            let mut msg = format!("{} was not produced", output.display());
            if !outcome.stderr_tail.trim().is_empty() {
                msg.push_str(&format!("\nDetails: {}", outcome.stderr_tail.trim()));
            }
            return Err(AcquisitionError::BuildFailed(msg));
        }
        if !outcome.success {
            self.reporter.warning(&format!(
                "build reported errors but produced {}; using it",
                output.display()
            ));
        }

        Ok(Artifact {
            path: output,
            origin: Origin::Built,
        })
    }

    /// Path to a working `cargo`, installing the toolchain if the user agrees.
    fn ensure_toolchain(&self, workspace: &Path) -> Result<PathBuf, AcquisitionError> {
        if let Some(cargo) = self.toolchain.locate() {
            self.reporter.detail("updating rust toolchain");
            if let Err(e) = self.toolchain.update() {
                self.reporter
                    .warning(&format!("toolchain update failed, continuing: {e}"));
            }
            return Ok(cargo);
        }

        if !self
            .confirm
            .confirm("Rust toolchain not found. Install it now?", true)
        {
            return Err(AcquisitionError::ToolchainMissing(
                "installation declined".to_string(),
            ));
        }

        self.toolchain
            .install(workspace)
            .map_err(|e| AcquisitionError::ToolchainMissing(format!("install failed: {e}")))?;

        self.toolchain.locate().ok_or_else(|| {
            AcquisitionError::ToolchainMissing(
                "cargo still not found after installation".to_string(),
            )
        })
    }
}
