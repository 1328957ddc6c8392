//! Per-run temporary workspace
//!
//! Downloads, clones and builds all happen inside one [`Workspace`], which
//! is deleted when dropped. Live workspaces are also registered so an
//! interrupt handler can remove them with [`discard_active`] before the
//! process exits. A process killed outright runs neither, so every run
//! first sweeps leftovers older than a day.

use crate::core::error::AcquisitionError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Leftover workspaces older than this are removed (24 hours)
const STALE_WORKSPACE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const WORKSPACE_PREFIX: &str = "run-";

/// Workspaces that exist right now in this process
static ACTIVE: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

fn registry(set: &Mutex<BTreeSet<PathBuf>>) -> MutexGuard<'_, BTreeSet<PathBuf>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Remove every live workspace. Meant for an interrupt handler that is
/// about to exit the process. Returns how many were removed.
pub fn discard_active() -> usize {
    discard(&ACTIVE)
}

fn discard(set: &Mutex<BTreeSet<PathBuf>>) -> usize {
    let paths = std::mem::take(&mut *registry(set));
    paths
        .iter()
        .filter(|path| std::fs::remove_dir_all(path).is_ok())
        .count()
}

/// Default parent directory for workspaces.
pub fn default_root() -> PathBuf {
    std::env::temp_dir().join("nym-provision")
}

/// Exclusively owned scratch directory for one run.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `root`, sweeping stale siblings first.
    pub fn create(root: &Path) -> Result<Self, AcquisitionError> {
        std::fs::create_dir_all(root).map_err(|source| AcquisitionError::Workspace {
            path: root.to_path_buf(),
            source,
        })?;
        sweep_stale(root, STALE_WORKSPACE_AGE);

        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)
            .map_err(|source| AcquisitionError::Workspace {
                path: root.to_path_buf(),
                source,
            })?;
        registry(&ACTIVE).insert(dir.path().to_path_buf());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        registry(&ACTIVE).remove(self.dir.path());
    }
}

/// Remove workspaces under `root` whose mtime is older than `max_age`.
/// Returns how many were removed. Errors are ignored: a sibling may be in
/// use or already gone.
pub fn sweep_stale(root: &Path, max_age: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 0;
    };
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(WORKSPACE_PREFIX) {
            continue;
        }
        let stale = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > max_age);
        if stale && std::fs::remove_dir_all(entry.path()).is_ok() {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_workspace_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let path = {
            let ws = Workspace::create(root.path()).unwrap();
            std::fs::write(ws.path().join("nym-node"), b"x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_sweep_removes_only_old_workspaces() {
        let root = TempDir::new().unwrap();
        let old = root.path().join("run-old");
        let fresh = root.path().join("run-fresh");
        let unrelated = root.path().join("keep-me");
        for dir in [&old, &fresh, &unrelated] {
            std::fs::create_dir(dir).unwrap();
        }
        let epoch = filetime::FileTime::from_unix_time(0, 0);
        filetime::set_file_mtime(&old, epoch).unwrap();
        filetime::set_file_mtime(&unrelated, epoch).unwrap();

        let removed = sweep_stale(root.path(), STALE_WORKSPACE_AGE);

        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_live_workspace_is_registered_until_drop() {
        let root = TempDir::new().unwrap();
        let ws = Workspace::create(root.path()).unwrap();
        let path = ws.path().to_path_buf();
        assert!(registry(&ACTIVE).contains(&path));

        drop(ws);
        assert!(!registry(&ACTIVE).contains(&path));
    }

    #[test]
    fn test_discard_removes_registered_dirs() {
        let root = TempDir::new().unwrap();
        let a = root.path().join("run-a");
        let b = root.path().join("run-b");
        std::fs::create_dir_all(a.join("source/target/release")).unwrap();
        std::fs::create_dir(&b).unwrap();
        let set = Mutex::new(BTreeSet::from([a.clone(), b.clone()]));

        assert_eq!(discard(&set), 2);
        assert!(!a.exists());
        assert!(!b.exists());
        assert!(registry(&set).is_empty());
    }

    #[test]
    fn test_create_makes_missing_root() {
        let base = TempDir::new().unwrap();
        let root = base.path().join("nested/root");
        let ws = Workspace::create(&root).unwrap();
        assert!(ws.path().starts_with(&root));
    }
}
