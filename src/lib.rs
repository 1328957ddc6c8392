//! Provisioning for the Nym node binary
//!
//! Given a version (a release tag or `latest`) and a destination directory,
//! the pipeline works out how to get a working executable onto this machine:
//!
//! 1. **Detect** the host OS and architecture.
//! 2. **Resolve** `latest` to a concrete release tag.
//! 3. **Acquire** the binary: x86 hosts download the published release
//!    asset, every other architecture clones the source and builds it with
//!    cargo (installing the Rust toolchain first if the user agrees).
//! 4. **Verify** downloads against the release's hash manifest.
//! 5. **Install** into the destination and smoke-test `--version`.
//!
//! Every remote service sits behind a trait in [`pipeline::Collaborators`],
//! so the same pipeline drives both production runs and tests.
//!
//! # Example
//!
//! ```no_run
//! use nym_provision::{Pipeline, ProductionCollaborators, ProvisionConfig, VersionSpec};
//! use std::path::Path;
//!
//! let config = ProvisionConfig::default();
//! let production = ProductionCollaborators::new(&config);
//! let record = Pipeline::new(&config, production.collaborators())
//!     .run(&VersionSpec::Latest, Path::new("/home/me/.local/bin"))?;
//! println!("{}", record.reported_version);
//! # Ok::<(), nym_provision::ProvisionError>(())
//! ```

pub mod acquire;
pub mod core;
pub mod helpers;
pub mod install;
pub mod pipeline;
pub mod platform;
pub mod prompt;
pub mod verify;
pub mod version;

pub use acquire::{Artifact, ArtifactAcquirer, Origin};
pub use crate::core::config::{ProjectSettings, ProvisionConfig};
pub use crate::core::error::{ProvisionError, Stage};
pub use crate::core::output::{Reporter, Verbosity};
pub use install::{InstallationRecord, Installer};
pub use pipeline::{Collaborators, Pipeline, ProductionCollaborators};
pub use platform::{Arch, Os, SystemProfile};
pub use verify::{IntegrityVerifier, VerificationVerdict};
pub use version::{ResolvedVersion, VersionResolver, VersionSpec};
