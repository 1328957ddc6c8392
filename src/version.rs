//! Version resolution
//!
//! A user asks for either a literal release tag or `latest`. Resolution turns
//! that into a [`ResolvedVersion`] exactly once per run; every later stage
//! takes the resolved type, so the sentinel cannot leak past this module.

use crate::core::error::{HttpError, ResolutionError};
use crate::helpers::internal::http::HttpClient;
use std::fmt;
use std::str::FromStr;

/// Sentinel accepted in place of a tag
pub const LATEST: &str = "latest";

/// Version as requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Tag(String),
}

impl VersionSpec {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case(LATEST) {
            Self::Latest
        } else {
            Self::Tag(trimmed.to_string())
        }
    }
}

impl FromStr for VersionSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("version must not be empty".to_string());
        }
        Ok(Self::parse(s))
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Tag(t) => f.write_str(t),
        }
    }
}

/// A concrete, non-sentinel version tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedVersion(String);

impl ResolvedVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Release-metadata collaborator: the most recent release tag of a project.
pub trait ReleaseMetadata {
    /// `Ok(None)` when the service answered but named no tag.
    fn latest_tag(&self, project: &str) -> Result<Option<String>, HttpError>;
}

/// Latest release tags from the GitHub REST API.
pub struct GithubReleases {
    client: HttpClient,
    api_base: String,
}

impl GithubReleases {
    pub fn new(client: HttpClient, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }
}

impl ReleaseMetadata for GithubReleases {
    fn latest_tag(&self, project: &str) -> Result<Option<String>, HttpError> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base, project);
        let json = self.client.github_json(&url)?;
        Ok(json
            .get("tag_name")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }
}

/// Turns a [`VersionSpec`] into a [`ResolvedVersion`].
pub struct VersionResolver<'a> {
    releases: &'a dyn ReleaseMetadata,
    project: &'a str,
    tag_prefix: &'a str,
}

impl<'a> VersionResolver<'a> {
    pub fn new(releases: &'a dyn ReleaseMetadata, project: &'a str, tag_prefix: &'a str) -> Self {
        Self {
            releases,
            project,
            tag_prefix,
        }
    }

    /// Literal tags pass through untouched without contacting the
    /// collaborator. `latest` is looked up and stripped of the tag prefix.
    pub fn resolve(&self, spec: &VersionSpec) -> Result<ResolvedVersion, ResolutionError> {
        match spec {
            VersionSpec::Tag(tag) => Ok(ResolvedVersion(tag.clone())),
            VersionSpec::Latest => {
                let tag = self
                    .releases
                    .latest_tag(self.project)
                    .map_err(ResolutionError::Unreachable)?;
                tag.as_deref()
                    .map(|t| strip_tag_prefix(t, self.tag_prefix))
                    .filter(|v| !v.is_empty())
                    .map(|v| ResolvedVersion(v.to_string()))
                    .ok_or_else(|| ResolutionError::EmptyResult {
                        project: self.project.to_string(),
                    })
            }
        }
    }
}

/// Remove the release tag decoration, e.g. `nym-binaries-v1.2.3` -> `v1.2.3`.
pub fn strip_tag_prefix<'t>(tag: &'t str, prefix: &str) -> &'t str {
    let tag = tag.trim();
    if prefix.is_empty() {
        return tag;
    }
    tag.strip_prefix(prefix).unwrap_or(tag).trim()
}

#[cfg(test)]
impl ResolvedVersion {
    pub(crate) fn for_tests(tag: &str) -> Self {
        Self(tag.to_string())
    }
}
