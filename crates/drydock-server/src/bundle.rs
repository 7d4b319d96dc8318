//! Exported-bundle management.
//!
//! Deploying means first materializing the caller's in-memory archive
//! somewhere the server can read it. The export directory is chosen once
//! per process by an explicit bootstrap step ([`ExportRoot::discover`])
//! and injected into the coordinator; the per-deployment file inside it
//! is either a collision-free temp file or, on request, a stable path
//! named after the archive.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use drydock_core::Archive;

/// The process-wide directory exported bundles are written to.
///
/// Chosen once and read-only afterwards. Prefers a build-tool-provided
/// target directory over the system temp dir: shared temp dirs on CI
/// machines get cleaned from under long test runs, and collide between
/// concurrent builds.
#[derive(Debug, Clone)]
pub struct ExportRoot {
    dir: PathBuf,
}

impl ExportRoot {
    /// Discovers the export directory for this process.
    ///
    /// Preference order: `CARGO_TARGET_TMPDIR` when set and present, a
    /// `target/` directory under the working directory, then the system
    /// temp dir. A `drydock-exports` subdirectory is created inside the
    /// chosen base.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory cannot be
    /// created.
    pub fn discover() -> io::Result<Self> {
        let base = env::var_os("CARGO_TARGET_TMPDIR")
            .map(PathBuf::from)
            .filter(|p| p.is_dir())
            .or_else(|| {
                let target = Path::new("target");
                target.is_dir().then(|| target.to_path_buf())
            })
            .unwrap_or_else(env::temp_dir);

        Self::at(base.join("drydock-exports"))
    }

    /// Uses `dir` as the export directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory cannot be
    /// created.
    pub fn at(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The chosen export directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// A deployable archive materialized on disk.
///
/// Owns the exported file until [`cleanup`](Self::cleanup) or drop;
/// removal is best-effort and failures are only logged, per the teardown
/// policy.
#[derive(Debug)]
pub struct ExportedBundle {
    path: PathBuf,
    cleaned: bool,
}

impl ExportedBundle {
    /// Exports `archive` into `root`.
    ///
    /// With `use_archive_name` the file is named after the archive itself
    /// (stable across runs; any pre-existing file is removed first).
    /// Otherwise a unique temp file seeded with the archive name is
    /// created, guaranteed not to collide with any other export in this
    /// process.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be created or
    /// written.
    pub fn export(
        archive: &dyn Archive,
        root: &ExportRoot,
        use_archive_name: bool,
    ) -> io::Result<Self> {
        let path = if use_archive_name {
            let path = root.dir().join(archive.name());
            if path.exists() {
                fs::remove_file(&path)?;
            }
            path
        } else {
            let placeholder = tempfile::Builder::new()
                .prefix("export-")
                .suffix(&format!("-{}", archive.name()))
                .tempfile_in(root.dir())?;
            let (_file, path) = placeholder.keep().map_err(|e| e.error)?;
            path
        };

        // Overwrites the placeholder reserved above.
        archive.export_to(&path)?;
        tracing::info!(location = %path.display(), "webapp archive exported");

        Ok(Self {
            path,
            cleaned: false,
        })
    }

    /// The exported file's location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the exported file. Best-effort: failures are logged and
    /// swallowed. Idempotent.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!(
                location = %self.path.display(),
                error = %e,
                "could not remove exported bundle"
            );
        }
    }
}

impl Drop for ExportedBundle {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_core::MemoryArchive;

    #[test]
    fn test_export_root_at_creates_directory() {
        let base = tempfile::tempdir().unwrap();
        let root = ExportRoot::at(base.path().join("exports")).unwrap();
        assert!(root.dir().is_dir());
    }

    #[test]
    fn test_unique_export_seeds_archive_name() {
        let base = tempfile::tempdir().unwrap();
        let root = ExportRoot::at(base.path()).unwrap();
        let archive = MemoryArchive::new("demo.war", b"content".to_vec());

        let bundle = ExportedBundle::export(&archive, &root, false).unwrap();
        let file_name = bundle.path().file_name().unwrap().to_string_lossy();

        assert!(file_name.contains("demo.war"), "got {file_name}");
        assert_eq!(fs::read(bundle.path()).unwrap(), b"content");
    }

    #[test]
    fn test_unique_exports_do_not_collide() {
        let base = tempfile::tempdir().unwrap();
        let root = ExportRoot::at(base.path()).unwrap();
        let archive = MemoryArchive::new("demo.war", b"x".to_vec());

        let a = ExportedBundle::export(&archive, &root, false).unwrap();
        let b = ExportedBundle::export(&archive, &root, false).unwrap();

        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_stable_export_uses_archive_name() {
        let base = tempfile::tempdir().unwrap();
        let root = ExportRoot::at(base.path()).unwrap();
        let archive = MemoryArchive::new("demo.war", b"first".to_vec());

        let bundle = ExportedBundle::export(&archive, &root, true).unwrap();
        assert_eq!(bundle.path(), root.dir().join("demo.war"));
    }

    #[test]
    fn test_stable_export_replaces_existing_file() {
        let base = tempfile::tempdir().unwrap();
        let root = ExportRoot::at(base.path()).unwrap();
        fs::write(root.dir().join("demo.war"), b"stale").unwrap();

        let archive = MemoryArchive::new("demo.war", b"fresh".to_vec());
        let bundle = ExportedBundle::export(&archive, &root, true).unwrap();

        assert_eq!(fs::read(bundle.path()).unwrap(), b"fresh");
    }

    #[test]
    fn test_cleanup_removes_file_and_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        let root = ExportRoot::at(base.path()).unwrap();
        let archive = MemoryArchive::new("demo.war", b"x".to_vec());

        let mut bundle = ExportedBundle::export(&archive, &root, false).unwrap();
        let path = bundle.path().to_path_buf();
        assert!(path.exists());

        bundle.cleanup();
        assert!(!path.exists());
        bundle.cleanup();
    }

    #[test]
    fn test_drop_removes_file() {
        let base = tempfile::tempdir().unwrap();
        let root = ExportRoot::at(base.path()).unwrap();
        let archive = MemoryArchive::new("demo.war", b"x".to_vec());

        let path = {
            let bundle = ExportedBundle::export(&archive, &root, false).unwrap();
            bundle.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
