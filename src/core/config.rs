//! Run configuration
//!
//! One [`ProvisionConfig`] parameterizes the whole pipeline, so the
//! interactive and unattended modes share a single code path.
//!
//! Settings are layered: built-in defaults, then every
//! `nym-provision/config.toml` found under `$XDG_CONFIG_DIRS` and
//! `$XDG_CONFIG_HOME` (later files win, field by field), then an explicit
//! `--config` file, then command-line flags applied by the binary.

use crate::core::output::Verbosity;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP timeout in seconds
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const CONFIG_DIR_NAME: &str = "nym-provision";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Where the binary comes from and how it is named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    /// Executable name, also the release asset name
    pub binary_name: String,
    /// GitHub `owner/repo` queried for the latest release
    pub release_repo: String,
    /// Decoration on release tags, stripped during resolution
    pub tag_prefix: String,
    /// Base URL under which `<tag>/<asset>` is served
    pub download_base: String,
    /// GitHub API base URL
    pub api_base: String,
    /// Hash manifest asset published next to the binary
    pub manifest_name: String,
    /// Repository cloned by the build path
    pub source_repo: String,
    /// Branch the build path checks out
    pub stable_branch: String,
    pub http_timeout: Duration,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            binary_name: "nym-node".to_string(),
            release_repo: "nymtech/nym".to_string(),
            tag_prefix: "nym-binaries-".to_string(),
            download_base: "https://github.com/nymtech/nym/releases/download".to_string(),
            api_base: "https://api.github.com".to_string(),
            manifest_name: "hashes.json".to_string(),
            source_repo: "https://github.com/nymtech/nym.git".to_string(),
            stable_branch: "master".to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

/// Everything a pipeline run needs to know besides its inputs.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Ask before installing a toolchain; otherwise take the default answer
    pub interactive: bool,
    pub verbosity: Verbosity,
    /// Take the build path regardless of architecture
    pub force_build: bool,
    pub project: ProjectSettings,
    /// Parent directory of the per-run workspaces
    pub workspace_root: PathBuf,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            interactive: false,
            verbosity: Verbosity::Normal,
            force_build: false,
            project: ProjectSettings::default(),
            workspace_root: crate::core::workspace::default_root(),
        }
    }
}

/// On-disk form of the configuration; every key optional.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    pub binary_name: Option<String>,
    pub release_repo: Option<String>,
    pub tag_prefix: Option<String>,
    pub download_base: Option<String>,
    pub api_base: Option<String>,
    pub manifest_name: Option<String>,
    pub source_repo: Option<String>,
    pub stable_branch: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub interactive: Option<bool>,
    pub verbosity: Option<Verbosity>,
    pub workspace_root: Option<PathBuf>,
}

macro_rules! take_newer {
    ($dst:ident, $src:ident, $($field:ident),+ $(,)?) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field;
            }
        )+
    };
}

impl ConfigToml {
    /// Overlay `other` on top of `self`; keys set in `other` win.
    pub fn merge(&mut self, other: ConfigToml) {
        let dst = self;
        let src = other;
        take_newer!(
            dst,
            src,
            binary_name,
            release_repo,
            tag_prefix,
            download_base,
            api_base,
            manifest_name,
            source_repo,
            stable_branch,
            http_timeout_secs,
            interactive,
            verbosity,
            workspace_root,
        );
    }

    /// Fill unset keys from the built-in defaults.
    pub fn resolve(self) -> ProvisionConfig {
        let defaults = ProvisionConfig::default();
        let p = defaults.project;
        ProvisionConfig {
            interactive: self.interactive.unwrap_or(defaults.interactive),
            verbosity: self.verbosity.unwrap_or(defaults.verbosity),
            force_build: defaults.force_build,
            workspace_root: self.workspace_root.unwrap_or(defaults.workspace_root),
            project: ProjectSettings {
                binary_name: self.binary_name.unwrap_or(p.binary_name),
                release_repo: self.release_repo.unwrap_or(p.release_repo),
                tag_prefix: self.tag_prefix.unwrap_or(p.tag_prefix),
                download_base: trim_slash(self.download_base.unwrap_or(p.download_base)),
                api_base: trim_slash(self.api_base.unwrap_or(p.api_base)),
                manifest_name: self.manifest_name.unwrap_or(p.manifest_name),
                source_repo: self.source_repo.unwrap_or(p.source_repo),
                stable_branch: self.stable_branch.unwrap_or(p.stable_branch),
                // Clamp to reasonable range (5-300 seconds)
                http_timeout: self
                    .http_timeout_secs
                    .map(|s| Duration::from_secs(s.clamp(5, 300)))
                    .unwrap_or(p.http_timeout),
            },
        }
    }
}

fn trim_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

fn split_xdg_config_dirs() -> Vec<PathBuf> {
    let raw = std::env::var("XDG_CONFIG_DIRS").unwrap_or_else(|_| "/etc/xdg".to_owned());
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn xdg_config_home() -> PathBuf {
    if let Ok(raw) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

/// Candidate config files, lowest precedence first.
pub fn find_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for dir in split_xdg_config_dirs() {
        paths.push(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    paths.push(xdg_config_home().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    paths
}

/// Parse one config file.
pub fn read_toml(path: &Path) -> Result<ConfigToml> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str::<ConfigToml>(&text)
        .with_context(|| format!("Invalid TOML in {}", path.display()))
}

/// Merge every discovered config file, then `explicit` if given.
///
/// Missing discovered files are skipped; a missing explicit file is an error.
pub fn load(explicit: Option<&Path>) -> Result<ConfigToml> {
    load_from(&find_config_files(), explicit)
}

fn load_from(candidates: &[PathBuf], explicit: Option<&Path>) -> Result<ConfigToml> {
    let mut merged = ConfigToml::default();
    for path in candidates {
        if path.exists() {
            merged.merge(read_toml(path)?);
        }
    }
    if let Some(path) = explicit {
        merged.merge(read_toml(path)?);
    }
    Ok(merged)
}
