//! Download path: pre-built release binaries.
//!
//! Release assets live at `{download_base}/{tag_prefix}{version}/{asset}`;
//! the hash manifest is a sibling asset of the same release.

use crate::core::error::HttpError;
use crate::core::output::Reporter;
use crate::helpers::internal::http::HttpClient;
use crate::helpers::internal::progress::ProgressGuard;
use crate::version::ResolvedVersion;
use std::path::Path;

/// Artifact-host collaborator: serves binaries and hash manifests by version.
pub trait ArtifactHost {
    /// Where `asset` of `version` is served; used in error messages.
    fn asset_url(&self, version: &ResolvedVersion, asset: &str) -> String;

    /// Fetch `asset` into `dest`, returning the byte count.
    fn fetch_artifact(
        &self,
        version: &ResolvedVersion,
        asset: &str,
        dest: &Path,
    ) -> Result<u64, HttpError>;

    /// Fetch the raw hash manifest of `version`.
    fn fetch_manifest(&self, version: &ResolvedVersion) -> Result<String, HttpError>;
}

/// GitHub release downloads.
pub struct GithubArtifactHost {
    client: HttpClient,
    download_base: String,
    tag_prefix: String,
    manifest_name: String,
    reporter: Reporter,
}

impl GithubArtifactHost {
    pub fn new(
        client: HttpClient,
        download_base: impl Into<String>,
        tag_prefix: impl Into<String>,
        manifest_name: impl Into<String>,
        reporter: Reporter,
    ) -> Self {
        Self {
            client,
            download_base: download_base.into(),
            tag_prefix: tag_prefix.into(),
            manifest_name: manifest_name.into(),
            reporter,
        }
    }
}

impl ArtifactHost for GithubArtifactHost {
    fn asset_url(&self, version: &ResolvedVersion, asset: &str) -> String {
        release_asset_url(&self.download_base, &self.tag_prefix, version, asset)
    }

    fn fetch_artifact(
        &self,
        version: &ResolvedVersion,
        asset: &str,
        dest: &Path,
    ) -> Result<u64, HttpError> {
        let url = self.asset_url(version, asset);
        self.reporter.detail(&format!("downloading {url}"));

        let guard = ProgressGuard(self.reporter.spinner(&format!("downloading {asset}")));
        let bytes = self.client.download_to(&url, dest, &guard.0)?;
        drop(guard);

        self.reporter
            .detail(&format!("downloaded {asset} ({bytes} bytes)"));
        Ok(bytes)
    }

    fn fetch_manifest(&self, version: &ResolvedVersion) -> Result<String, HttpError> {
        let url = self.asset_url(version, &self.manifest_name);
        self.reporter.detail(&format!("fetching {url}"));
        self.client.get_string(&url)
    }
}

/// Release tag for `version`; the prefix is not doubled when the user
/// passed a fully decorated tag.
pub fn release_tag(tag_prefix: &str, version: &ResolvedVersion) -> String {
    let v = version.as_str();
    if tag_prefix.is_empty() || v.starts_with(tag_prefix) {
        v.to_string()
    } else {
        format!("{tag_prefix}{v}")
    }
}

/// Deterministic URL of one release asset.
pub fn release_asset_url(
    download_base: &str,
    tag_prefix: &str,
    version: &ResolvedVersion,
    asset: &str,
) -> String {
    format!(
        "{}/{}/{}",
        download_base.trim_end_matches('/'),
        release_tag(tag_prefix, version),
        asset
    )
}
