//! End-to-end pipeline tests against stub collaborators.
//!
//! The "binary" is a shell script, so these only run on Unix.

#![cfg(unix)]

mod common;

use common::*;
use nym_provision::core::error::{AcquisitionError, InstallError, ResolutionError};
use nym_provision::{Arch, Os, Pipeline, ProvisionError, Stage, SystemProfile, VersionSpec};

const X86_64: SystemProfile = SystemProfile {
    os: Os::Linux,
    arch: Arch::X86_64,
};

const ARMV7: SystemProfile = SystemProfile {
    os: Os::Linux,
    arch: Arch::Arm,
};

fn tag(t: &str) -> VersionSpec {
    VersionSpec::Tag(t.to_string())
}

// =============================================================================
// Download path
// =============================================================================

#[test]
fn test_verified_download_installs() {
    let h = Harness::new(PanicReleases, StubHost::honest());
    let dest = h.destination();

    let record = Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&tag("v1.2.3"), &dest)
        .unwrap();

    assert_eq!(record.path, dest.join("nym-node"));
    assert_eq!(record.reported_version, "nym-node 1.2.3");
    assert_eq!(std::fs::read(&record.path).unwrap(), FAKE_BINARY);
    assert_eq!(h.host.artifact_fetches.get(), 1);
    assert_eq!(h.host.manifest_fetches.get(), 1);
    assert_eq!(h.toolchain.calls.get(), 0);
    assert!(h.source.calls.borrow().is_empty());
}

#[test]
fn test_latest_is_resolved_before_download() {
    let h = Harness::new(
        StubReleases::new(Some("nym-binaries-v9.9.9")),
        StubHost::honest(),
    );

    Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&VersionSpec::Latest, &h.destination())
        .unwrap();

    assert_eq!(*h.host.versions_seen.borrow(), vec!["v9.9.9".to_string()]);
}

#[test]
fn test_checksum_mismatch_aborts_before_install() {
    let wrong = sha256_hex(b"something else entirely");
    let host = StubHost::new(Some(FAKE_BINARY), Some(manifest_for("nym-node", &wrong)));
    let h = Harness::new(PanicReleases, host);
    let dest = h.destination();

    let err = Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&tag("v1.2.3"), &dest)
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::Install(InstallError::IntegrityFailure(_))
    ));
    assert_eq!(err.stage(), Stage::Verify);
    assert_eq!(err.exit_code(), 5);
    assert!(err.to_string().contains(&wrong));
    assert!(!dest.exists());
}

#[test]
fn test_mismatch_leaves_existing_install_untouched() {
    let h = Harness::new(PanicReleases, StubHost::new(
        Some(FAKE_BINARY),
        Some(manifest_for("nym-node", &sha256_hex(b"tampered"))),
    ));
    let dest = h.destination();
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("nym-node"), b"previous install").unwrap();

    let result = Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&tag("v1.2.3"), &dest);

    assert!(result.is_err());
    assert_eq!(
        std::fs::read(dest.join("nym-node")).unwrap(),
        b"previous install"
    );
}

#[test]
fn test_unreachable_manifest_still_installs() {
    let h = Harness::new(PanicReleases, StubHost::new(Some(FAKE_BINARY), None));

    let record = Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&tag("v1.2.3"), &h.destination())
        .unwrap();

    assert_eq!(record.reported_version, "nym-node 1.2.3");
    assert_eq!(h.host.manifest_fetches.get(), 1);
}

#[test]
fn test_manifest_without_entry_still_installs() {
    let host = StubHost::new(
        Some(FAKE_BINARY),
        Some(manifest_for("nym-cli", &sha256_hex(FAKE_BINARY))),
    );
    let h = Harness::new(PanicReleases, host);

    assert!(
        Pipeline::new(&h.config, h.collaborators())
            .with_profile(X86_64)
            .run(&tag("v1.2.3"), &h.destination())
            .is_ok()
    );
}

#[test]
fn test_download_failure_is_fatal_without_fallback() {
    let h = Harness::new(PanicReleases, StubHost::new(None, None));

    let err = Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&tag("v0.0.0"), &h.destination())
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::Acquisition(AcquisitionError::DownloadFailed { .. })
    ));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(h.toolchain.calls.get(), 0);
    assert!(h.source.calls.borrow().is_empty());
    assert_eq!(h.host.manifest_fetches.get(), 0);
}

// =============================================================================
// Build path
// =============================================================================

#[test]
fn test_arm_builds_from_source() {
    let h = Harness::new(PanicReleases, StubHost::honest());

    let record = Pipeline::new(&h.config, h.collaborators())
        .with_profile(ARMV7)
        .run(&tag("v1.2.3"), &h.destination())
        .unwrap();

    assert_eq!(record.reported_version, "nym-node 1.2.3");
    assert_eq!(h.host.artifact_fetches.get(), 0);
    assert_eq!(h.host.manifest_fetches.get(), 0);
    assert_eq!(
        *h.source.calls.borrow(),
        vec![
            "clone https://github.com/nymtech/nym.git".to_string(),
            "checkout master".to_string(),
            "build nym-node".to_string(),
        ]
    );
}

#[test]
fn test_unknown_arch_builds_from_source() {
    let h = Harness::new(PanicReleases, StubHost::honest());
    let profile = SystemProfile::from_uname("Linux", "riscv64");

    Pipeline::new(&h.config, h.collaborators())
        .with_profile(profile)
        .run(&tag("v1.2.3"), &h.destination())
        .unwrap();

    assert_eq!(h.host.artifact_fetches.get(), 0);
    assert_eq!(h.source.calls.borrow().len(), 3);
}

#[test]
fn test_force_build_skips_download() {
    let mut h = Harness::new(PanicReleases, StubHost::honest());
    h.config.force_build = true;

    Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&tag("v1.2.3"), &h.destination())
        .unwrap();

    assert_eq!(h.host.artifact_fetches.get(), 0);
    assert_eq!(h.source.calls.borrow().len(), 3);
}

// =============================================================================
// Resolution and install properties
// =============================================================================

#[test]
fn test_resolution_failure_stops_before_workspace() {
    let h = Harness::new(StubReleases::new(None), StubHost::honest());

    let err = Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&VersionSpec::Latest, &h.destination())
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::Resolution(ResolutionError::EmptyResult { .. })
    ));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(h.host.artifact_fetches.get(), 0);
    assert_eq!(h.leftover_workspaces(), 0);
}

#[test]
fn test_double_install_is_idempotent() {
    let h = Harness::new(PanicReleases, StubHost::honest());
    let dest = h.destination();
    let installed = dest.join("nym-node");
    let pipeline = Pipeline::new(&h.config, h.collaborators()).with_profile(X86_64);

    let first = pipeline.run(&tag("v1.2.3"), &dest).unwrap();
    let first_digest = sha256_hex(&std::fs::read(&installed).unwrap());
    let second = pipeline.run(&tag("v1.2.3"), &dest).unwrap();
    let second_digest = sha256_hex(&std::fs::read(&installed).unwrap());

    assert_eq!(first, second);
    assert_eq!(first_digest, sha256_hex(FAKE_BINARY));
    assert_eq!(first_digest, second_digest);
    let mut entries: Vec<_> = std::fs::read_dir(&dest)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, vec![".nym-node.lock", "nym-node"]);
}

#[test]
fn test_missing_destination_is_created() {
    let h = Harness::new(PanicReleases, StubHost::honest());
    let dest = h.destination();
    assert!(!dest.exists());

    Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&tag("v1.2.3"), &dest)
        .unwrap();

    assert!(dest.join("nym-node").is_file());
}

#[test]
fn test_workspace_removed_on_success_and_failure() {
    let ok = Harness::new(PanicReleases, StubHost::honest());
    Pipeline::new(&ok.config, ok.collaborators())
        .with_profile(X86_64)
        .run(&tag("v1.2.3"), &ok.destination())
        .unwrap();
    assert_eq!(ok.leftover_workspaces(), 0);

    let failing = Harness::new(PanicReleases, StubHost::new(None, None));
    let _ = Pipeline::new(&failing.config, failing.collaborators())
        .with_profile(X86_64)
        .run(&tag("v1.2.3"), &failing.destination());
    assert_eq!(failing.leftover_workspaces(), 0);
}

#[test]
fn test_locked_destination_is_reported() {
    use fs2::FileExt;

    let h = Harness::new(PanicReleases, StubHost::honest());
    let dest = h.destination();
    std::fs::create_dir_all(&dest).unwrap();
    let holder = std::fs::File::create(dest.join(".nym-node.lock")).unwrap();
    holder.lock_exclusive().unwrap();

    let err = Pipeline::new(&h.config, h.collaborators())
        .with_profile(X86_64)
        .run(&tag("v1.2.3"), &dest)
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::Install(InstallError::DestinationLocked { .. })
    ));
    assert_eq!(err.exit_code(), 6);
    assert!(!dest.join("nym-node").exists());
}
