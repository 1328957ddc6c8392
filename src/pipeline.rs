//! The provisioning pipeline
//!
//! detect -> resolve -> acquire -> verify (downloads only) -> install.
//! The first failing stage ends the run; the workspace is dropped on every
//! exit path.

use crate::acquire::build::{GitCargo, Rustup, SourceBuilder, Toolchain};
use crate::acquire::download::{ArtifactHost, GithubArtifactHost};
use crate::acquire::{AcquisitionPath, ArtifactAcquirer, Origin, choose_path};
use crate::core::config::ProvisionConfig;
use crate::core::error::ProvisionError;
use crate::core::output::Reporter;
use crate::core::workspace::Workspace;
use crate::helpers::internal::http::HttpClient;
use crate::install::{InstallationRecord, Installer};
use crate::platform::SystemProfile;
use crate::prompt::{AssumeDefault, Confirm, StdinConfirm};
use crate::verify::{IntegrityVerifier, MatchKind, VerificationVerdict};
use crate::version::{GithubReleases, ReleaseMetadata, VersionResolver, VersionSpec};
use std::path::Path;

/// The external capabilities a run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub releases: &'a dyn ReleaseMetadata,
    pub host: &'a dyn ArtifactHost,
    pub toolchain: &'a dyn Toolchain,
    pub source: &'a dyn SourceBuilder,
    pub confirm: &'a dyn Confirm,
}

/// Network, git, cargo and terminal backed collaborators.
pub struct ProductionCollaborators {
    releases: GithubReleases,
    host: GithubArtifactHost,
    toolchain: Rustup,
    source: GitCargo,
    confirm: Box<dyn Confirm>,
}

impl ProductionCollaborators {
    pub fn new(config: &ProvisionConfig) -> Self {
        let project = &config.project;
        let reporter = Reporter::new(config.verbosity);
        let client = HttpClient::new(project.http_timeout);
        let confirm: Box<dyn Confirm> = if config.interactive {
            Box::new(StdinConfirm)
        } else {
            Box::new(AssumeDefault)
        };

        Self {
            releases: GithubReleases::new(client.clone(), &project.api_base),
            host: GithubArtifactHost::new(
                client.clone(),
                &project.download_base,
                &project.tag_prefix,
                &project.manifest_name,
                reporter,
            ),
            toolchain: Rustup::new(client, reporter),
            source: GitCargo::new(reporter),
            confirm,
        }
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            releases: &self.releases,
            host: &self.host,
            toolchain: &self.toolchain,
            source: &self.source,
            confirm: self.confirm.as_ref(),
        }
    }
}

pub struct Pipeline<'a> {
    config: &'a ProvisionConfig,
    collaborators: Collaborators<'a>,
    reporter: Reporter,
    profile: Option<SystemProfile>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ProvisionConfig, collaborators: Collaborators<'a>) -> Self {
        Self {
            config,
            collaborators,
            reporter: Reporter::new(config.verbosity),
            profile: None,
        }
    }

    /// Use `profile` instead of detecting the host.
    pub fn with_profile(mut self, profile: SystemProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn run(
        &self,
        spec: &VersionSpec,
        destination: &Path,
    ) -> Result<InstallationRecord, ProvisionError> {
        let project = &self.config.project;
        let c = self.collaborators;

        let profile = self.profile.unwrap_or_else(SystemProfile::detect);
        self.reporter
            .action(&format!("Provisioning {} ({spec}) for {profile}", project.binary_name));

        self.reporter.sub_action("resolve");
        let version = VersionResolver::new(c.releases, &project.release_repo, &project.tag_prefix)
            .resolve(spec)?;
        self.reporter.detail(&format!("version {version}"));

        let workspace = Workspace::create(&self.config.workspace_root)?;
        self.reporter
            .detail(&format!("workspace {}", workspace.path().display()));

        self.reporter.sub_action(match choose_path(&profile, self.config.force_build) {
            AcquisitionPath::Download => "acquire (download)",
            AcquisitionPath::Build => "acquire (build from source)",
        });
        let acquirer = ArtifactAcquirer {
            host: c.host,
            toolchain: c.toolchain,
            source: c.source,
            confirm: c.confirm,
            project,
            reporter: self.reporter,
            force_build: self.config.force_build,
        };
        let artifact = acquirer.acquire(&profile, &version, workspace.path())?;

        let verdict = match artifact.origin {
            Origin::Downloaded => {
                self.reporter.sub_action("verify");
                let verifier = IntegrityVerifier {
                    host: c.host,
                    reporter: self.reporter,
                };
                let verdict = verifier.verify(&artifact, &version, &project.binary_name);
                self.report_verdict(&verdict);
                Some(verdict)
            }
            Origin::Built => None,
        };

        self.reporter.sub_action("install");
        let installer = Installer {
            binary_name: &project.binary_name,
            reporter: self.reporter,
        };
        let record = installer.install(&artifact, verdict.as_ref(), destination)?;

        self.reporter.success(&format!(
            "Installed {} ({})",
            record.path.display(),
            if record.reported_version.is_empty() {
                version.as_str()
            } else {
                record.reported_version.as_str()
            }
        ));
        Ok(record)
    }

    fn report_verdict(&self, verdict: &VerificationVerdict) {
        match verdict {
            VerificationVerdict::Verified(MatchKind::Structured) => {
                self.reporter.detail("checksum verified");
            }
            VerificationVerdict::Verified(MatchKind::Substring) => {
                self.reporter.warning(
                    "checksum found in an unstructured manifest; it was not matched to this file by name",
                );
            }
            VerificationVerdict::Unverifiable(reason) => {
                self.reporter
                    .warning(&format!("integrity not verified: {reason}; installing anyway"));
            }
            VerificationVerdict::Mismatched { expected, actual } => {
                self.reporter.error(&format!(
                    "CHECKSUM MISMATCH: expected {expected}, got {actual}"
                ));
            }
        }
    }
}
