//! Stub collaborators for pipeline integration tests.

#![allow(dead_code)]

use nym_provision::acquire::build::{BuildOutcome, SourceBuilder, Toolchain, release_output};
use nym_provision::acquire::download::ArtifactHost;
use nym_provision::core::error::{CommandError, HttpError};
use nym_provision::pipeline::Collaborators;
use nym_provision::prompt::{AssumeDefault, Confirm};
use nym_provision::version::ReleaseMetadata;
use nym_provision::{ProvisionConfig, ResolvedVersion, Verbosity};
use sha2::Digest;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A shell script standing in for the real binary.
pub const FAKE_BINARY: &[u8] = b"#!/bin/sh\necho 'nym-node 1.2.3'\n";

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha2::Sha256::digest(bytes))
}

/// `hashes.json` in the shape the Nym release publishes.
pub fn manifest_for(name: &str, digest: &str) -> String {
    serde_json::json!({
        "assets": { name: { "sha256": digest } },
        "git_commit": "0123abcd"
    })
    .to_string()
}

pub struct StubReleases {
    pub tag: Option<String>,
    pub calls: Cell<usize>,
}

impl StubReleases {
    pub fn new(tag: Option<&str>) -> Self {
        Self {
            tag: tag.map(str::to_string),
            calls: Cell::new(0),
        }
    }
}

impl ReleaseMetadata for StubReleases {
    fn latest_tag(&self, _project: &str) -> Result<Option<String>, HttpError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.tag.clone())
    }
}

/// Release metadata that must never be consulted.
pub struct PanicReleases;

impl ReleaseMetadata for PanicReleases {
    fn latest_tag(&self, _project: &str) -> Result<Option<String>, HttpError> {
        panic!("release metadata queried for a literal tag");
    }
}

pub struct StubHost {
    pub binary: Option<Vec<u8>>,
    pub manifest: Option<String>,
    pub artifact_fetches: Cell<usize>,
    pub manifest_fetches: Cell<usize>,
    pub versions_seen: RefCell<Vec<String>>,
}

impl StubHost {
    pub fn new(binary: Option<&[u8]>, manifest: Option<String>) -> Self {
        Self {
            binary: binary.map(<[u8]>::to_vec),
            manifest,
            artifact_fetches: Cell::new(0),
            manifest_fetches: Cell::new(0),
            versions_seen: RefCell::new(Vec::new()),
        }
    }

    /// Serves [`FAKE_BINARY`] with a matching manifest.
    pub fn honest() -> Self {
        Self::new(
            Some(FAKE_BINARY),
            Some(manifest_for("nym-node", &sha256_hex(FAKE_BINARY))),
        )
    }
}

impl ArtifactHost for StubHost {
    fn asset_url(&self, version: &ResolvedVersion, asset: &str) -> String {
        format!("https://releases.test/nym-binaries-{version}/{asset}")
    }

    fn fetch_artifact(
        &self,
        version: &ResolvedVersion,
        asset: &str,
        dest: &Path,
    ) -> Result<u64, HttpError> {
        self.artifact_fetches.set(self.artifact_fetches.get() + 1);
        self.versions_seen.borrow_mut().push(version.to_string());
        match &self.binary {
            Some(bytes) => {
                std::fs::write(dest, bytes).map_err(|source| HttpError::Write {
                    path: dest.to_path_buf(),
                    source,
                })?;
                Ok(bytes.len() as u64)
            }
            None => Err(HttpError::Status {
                url: self.asset_url(version, asset),
                status: 404,
            }),
        }
    }

    fn fetch_manifest(&self, version: &ResolvedVersion) -> Result<String, HttpError> {
        self.manifest_fetches.set(self.manifest_fetches.get() + 1);
        self.manifest.clone().ok_or_else(|| HttpError::Transport {
            url: self.asset_url(version, "hashes.json"),
            reason: "connection reset".into(),
        })
    }
}

#[derive(Default)]
pub struct StubToolchain {
    pub calls: Cell<usize>,
}

impl Toolchain for StubToolchain {
    fn locate(&self) -> Option<PathBuf> {
        self.calls.set(self.calls.get() + 1);
        Some(PathBuf::from("cargo"))
    }

    fn install(&self, _workspace: &Path) -> Result<(), CommandError> {
        self.calls.set(self.calls.get() + 1);
        Ok(())
    }

    fn update(&self) -> Result<(), CommandError> {
        self.calls.set(self.calls.get() + 1);
        Ok(())
    }
}

/// "Builds" by writing [`FAKE_BINARY`] where cargo would.
#[derive(Default)]
pub struct StubSource {
    pub calls: RefCell<Vec<String>>,
}

impl SourceBuilder for StubSource {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), CommandError> {
        self.calls.borrow_mut().push(format!("clone {url}"));
        std::fs::create_dir_all(dest).map_err(|source| CommandError::Spawn {
            program: "git".into(),
            source,
        })
    }

    fn checkout(&self, _repo: &Path, branch: &str) -> Result<(), CommandError> {
        self.calls.borrow_mut().push(format!("checkout {branch}"));
        Ok(())
    }

    fn build(&self, _cargo: &Path, repo: &Path, bin: &str) -> Result<BuildOutcome, CommandError> {
        self.calls.borrow_mut().push(format!("build {bin}"));
        let out = release_output(repo, bin);
        let spawn = |source| CommandError::Spawn {
            program: "cargo".into(),
            source,
        };
        std::fs::create_dir_all(out.parent().unwrap_or(repo)).map_err(spawn)?;
        std::fs::write(&out, FAKE_BINARY).map_err(spawn)?;
        Ok(BuildOutcome {
            success: true,
            stderr_tail: String::new(),
        })
    }
}

/// Everything a pipeline test needs, with scratch directories.
pub struct Harness {
    pub releases: Box<dyn ReleaseMetadata>,
    pub host: StubHost,
    pub toolchain: StubToolchain,
    pub source: StubSource,
    pub confirm: Box<dyn Confirm>,
    pub config: ProvisionConfig,
    pub root: TempDir,
}

impl Harness {
    pub fn new(releases: impl ReleaseMetadata + 'static, host: StubHost) -> Self {
        let root = TempDir::new().unwrap();
        let config = ProvisionConfig {
            verbosity: Verbosity::Quiet,
            workspace_root: root.path().join("workspaces"),
            ..ProvisionConfig::default()
        };
        Self {
            releases: Box::new(releases),
            host,
            toolchain: StubToolchain::default(),
            source: StubSource::default(),
            confirm: Box::new(AssumeDefault),
            config,
            root,
        }
    }

    pub fn destination(&self) -> PathBuf {
        self.root.path().join("home").join(".local").join("bin")
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            releases: self.releases.as_ref(),
            host: &self.host,
            toolchain: &self.toolchain,
            source: &self.source,
            confirm: self.confirm.as_ref(),
        }
    }

    /// Workspaces left behind under the configured root.
    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(&self.config.workspace_root)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
