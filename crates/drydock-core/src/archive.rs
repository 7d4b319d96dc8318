//! The deployable-bundle contract.
//!
//! An [`Archive`] is an opaque, named bundle owned by the caller. The
//! harness never looks inside it; it only reads the name (to derive the
//! context, see [`crate::compute_context`]) and asks the archive to
//! materialize itself at a filesystem location chosen by the deployment
//! coordinator.

use std::fs;
use std::io;
use std::path::Path;

/// An opaque deployable bundle.
///
/// Implementations are caller-owned and read-only to the harness. The
/// name must carry a recognized archive extension (e.g. `my-app.war`);
/// it doubles as the identity used in log and error messages.
pub trait Archive {
    /// The archive file name, including its extension.
    fn name(&self) -> &str;

    /// Writes the full archive content to `dest`, replacing any existing
    /// file at that path.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the content cannot be written.
    fn export_to(&self, dest: &Path) -> io::Result<()>;
}

/// An [`Archive`] backed by a byte buffer.
///
/// This is the stock implementation used by the harness's own tests and
/// by callers that assemble bundles in memory before deployment.
///
/// # Example
///
/// ```rust
/// use drydock_core::{Archive, MemoryArchive};
///
/// let archive = MemoryArchive::new("demo.war", b"bundle bytes".to_vec());
/// assert_eq!(archive.name(), "demo.war");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    name: String,
    content: Vec<u8>,
}

impl MemoryArchive {
    /// Creates an in-memory archive with the given file name and content.
    #[must_use]
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// The archive content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl Archive for MemoryArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn export_to(&self, dest: &Path) -> io::Result<()> {
        fs::write(dest, &self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_archive_name() {
        let archive = MemoryArchive::new("app.war", Vec::new());
        assert_eq!(archive.name(), "app.war");
    }

    #[test]
    fn test_memory_archive_export() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("app.war");

        let archive = MemoryArchive::new("app.war", b"payload".to_vec());
        archive.export_to(&dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_memory_archive_export_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("app.war");
        std::fs::write(&dest, b"stale placeholder").unwrap();

        let archive = MemoryArchive::new("app.war", b"fresh".to_vec());
        archive.export_to(&dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
    }
}
