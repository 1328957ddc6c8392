//! Integrity verification of downloaded artifacts
//!
//! The release publishes a hash manifest next to the binary. The verifier
//! never fails: every problem becomes a [`VerificationVerdict`], and only
//! `Mismatched` stops the install.

use crate::acquire::Artifact;
use crate::acquire::download::ArtifactHost;
use crate::core::output::Reporter;
use crate::helpers::internal::hash::{HashAlgorithm, digests_equal, hash_file};
use crate::helpers::internal::progress::ProgressGuard;
use crate::version::ResolvedVersion;
use std::collections::BTreeMap;
use std::fmt;

/// How a `Verified` verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Exact lookup of the artifact's entry
    Structured,
    /// The digest merely appears somewhere in an unstructured manifest.
    /// Weaker: it could belong to a different file.
    Substring,
}

/// Why no verdict could be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnverifiableReason {
    ManifestUnreachable,
    HashingFailed,
    NoManifestEntry,
}

impl fmt::Display for UnverifiableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ManifestUnreachable => "manifest unreachable",
            Self::HashingFailed => "artifact could not be hashed",
            Self::NoManifestEntry => "no matching manifest entry",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationVerdict {
    Verified(MatchKind),
    Unverifiable(UnverifiableReason),
    Mismatched { expected: String, actual: String },
}

/// Expected digests for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashManifest {
    /// Artifact name to hex digest
    Structured(BTreeMap<String, String>),
    /// Body that is not JSON, searched as text
    Raw(String),
}

impl HashManifest {
    /// Parse a manifest body. Accepted JSON shapes:
    ///
    /// - `{"assets": {"<name>": {"sha256": "<hex>"}}}`
    /// - `{"<name>": {"sha256": "<hex>"}}`
    /// - `{"<name>": "<hex>"}`
    ///
    /// `sha512` is used for an entry that has no `sha256`.
    pub fn parse(body: &str) -> Self {
        let Ok(serde_json::Value::Object(root)) = serde_json::from_str::<serde_json::Value>(body)
        else {
            return Self::Raw(body.to_string());
        };

        let entries = match root.get("assets") {
            Some(serde_json::Value::Object(assets)) => assets,
            _ => &root,
        };

        let digests = entries
            .iter()
            .filter_map(|(name, value)| entry_digest(value).map(|d| (name.clone(), d)))
            .collect();
        Self::Structured(digests)
    }

    /// Expected digest recorded for `name`.
    pub fn digest_for(&self, name: &str) -> Option<&str> {
        match self {
            Self::Structured(map) => map.get(name).map(String::as_str),
            Self::Raw(_) => None,
        }
    }
}

fn entry_digest(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Object(map) => ["sha256", "sha512"]
            .iter()
            .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}

/// Checks downloaded artifacts against the release's hash manifest.
pub struct IntegrityVerifier<'a> {
    pub host: &'a dyn ArtifactHost,
    pub reporter: Reporter,
}

impl IntegrityVerifier<'_> {
    /// Verdict for `artifact`, published as `asset_name` in `version`.
    pub fn verify(
        &self,
        artifact: &Artifact,
        version: &ResolvedVersion,
        asset_name: &str,
    ) -> VerificationVerdict {
        let body = match self.host.fetch_manifest(version) {
            Ok(body) => body,
            Err(e) => {
                self.reporter.detail(&format!("manifest fetch failed: {e}"));
                return VerificationVerdict::Unverifiable(UnverifiableReason::ManifestUnreachable);
            }
        };

        let manifest = HashManifest::parse(&body);
        if let HashManifest::Raw(text) = &manifest {
            return self.verify_raw(artifact, text, asset_name);
        }

        let Some(expected) = manifest.digest_for(asset_name) else {
            return VerificationVerdict::Unverifiable(UnverifiableReason::NoManifestEntry);
        };
        let algorithm =
            HashAlgorithm::from_hex_len(expected.len()).unwrap_or(HashAlgorithm::Sha256);
        let Some(actual) = self.hash(artifact, algorithm) else {
            return VerificationVerdict::Unverifiable(UnverifiableReason::HashingFailed);
        };
        if digests_equal(expected, &actual) {
            VerificationVerdict::Verified(MatchKind::Structured)
        } else {
            VerificationVerdict::Mismatched {
                expected: expected.to_ascii_lowercase(),
                actual,
            }
        }
    }

    /// Fallback for a manifest that is not JSON: the artifact's name and its
    /// digest must both appear in the text.
    fn verify_raw(&self, artifact: &Artifact, text: &str, asset_name: &str) -> VerificationVerdict {
        if !text.contains(asset_name) {
            return VerificationVerdict::Unverifiable(UnverifiableReason::NoManifestEntry);
        }
        let Some(actual) = self.hash(artifact, HashAlgorithm::Sha256) else {
            return VerificationVerdict::Unverifiable(UnverifiableReason::HashingFailed);
        };
        if text.to_ascii_lowercase().contains(&actual) {
            VerificationVerdict::Verified(MatchKind::Substring)
        } else {
            VerificationVerdict::Mismatched {
                expected: format!(
                    "a {} digest listed for {asset_name}",
                    HashAlgorithm::Sha256.name()
                ),
                actual,
            }
        }
    }

    fn hash(&self, artifact: &Artifact, algorithm: HashAlgorithm) -> Option<String> {
        let guard = ProgressGuard(self.reporter.spinner(&format!("computing {}", algorithm.name())));
        match hash_file(&artifact.path, algorithm, &guard.0) {
            Ok(digest) => Some(digest),
            Err(e) => {
                self.reporter.detail(&format!(
                    "cannot hash {}: {e}",
                    artifact.path.display()
                ));
                None
            }
        }
    }
}
