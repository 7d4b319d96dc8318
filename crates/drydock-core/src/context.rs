//! Context-path derivation from archive names.
//!
//! The harness hosts several test webapps on one server instance and
//! needs each to be independently addressable without any server-side
//! configuration file. The archive file name alone decides where the
//! deployed application mounts:
//!
//! - `myapp.war` mounts at `/myapp`
//! - `root.war` (any case) mounts at the reserved root context `/`
//! - `root-foo.example.com.war` mounts at `/` restricted to the virtual
//!   host `foo.example.com`

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Archive extensions the harness recognizes as deployable.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &[".war"];

/// Errors from archive-name validation and context derivation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The file name has no extension separator at a position > 0.
    #[error("not a valid web archive filename: {name}")]
    MissingExtension {
        /// The offending archive name.
        name: String,
    },

    /// The extension is present but not a recognized archive type.
    #[error("not a recognized web archive: {name}")]
    UnrecognizedExtension {
        /// The offending archive name.
        name: String,
        /// The extension that was found, lowercased.
        extension: String,
    },
}

/// Where a deployed bundle mounts: context path, optional virtual-host
/// restriction, and a display name for logs.
///
/// Invariants: `context_path` always begins with `/` and is never empty;
/// `/` is the reserved root context. Exactly one descriptor exists per
/// deployed bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDescriptor {
    /// URL path the context mounts at, always `/`-prefixed.
    pub context_path: String,

    /// Hostnames this context is restricted to; empty means any host.
    pub virtual_hosts: Vec<String>,

    /// Human-readable name, the archive name with its extension stripped.
    pub display_name: String,
}

impl ContextDescriptor {
    /// Whether this context is mounted at the reserved root context `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.context_path == "/"
    }
}

/// Derives a [`ContextDescriptor`] from an archive file name.
///
/// Deterministic and free of I/O. Rules, in order:
///
/// 1. The name must have a recognized extension with the separator at a
///    position > 0; the extension and at most one trailing `/` are
///    stripped.
/// 2. A stripped name equal to `root` (ignoring case) maps to `/`.
/// 3. A stripped name starting with `root-` (ignoring case) maps to `/`
///    with the substring after the first `-` as the single virtual host.
/// 4. Anything else maps to the stripped name with a leading `/`.
///
/// # Errors
///
/// Returns [`NameError`] if the extension is missing or unrecognized.
///
/// # Example
///
/// ```rust
/// use drydock_core::compute_context;
///
/// let ctx = compute_context("myapp.war").unwrap();
/// assert_eq!(ctx.context_path, "/myapp");
///
/// let root = compute_context("ROOT.war").unwrap();
/// assert_eq!(root.context_path, "/");
/// ```
pub fn compute_context(file_name: &str) -> Result<ContextDescriptor, NameError> {
    let stripped = strip_extension(file_name)?;

    // Normalize an accidental trailing separator. True archive names never
    // carry one; directory-derived names occasionally do.
    let stripped = stripped.strip_suffix('/').unwrap_or(stripped);

    let display_name = stripped.to_string();
    let lowered = stripped.to_ascii_lowercase();

    let (context_path, virtual_hosts) = if lowered == "root" {
        ("/".to_string(), Vec::new())
    } else if lowered.starts_with("root-") {
        let dash = stripped.find('-').unwrap_or(0);
        let virtual_host = stripped[dash + 1..].to_string();
        ("/".to_string(), vec![virtual_host])
    } else if stripped.starts_with('/') {
        (stripped.to_string(), Vec::new())
    } else {
        (format!("/{stripped}"), Vec::new())
    };

    Ok(ContextDescriptor {
        context_path,
        virtual_hosts,
        display_name,
    })
}

/// Validates the extension of `file_name` and returns the name without it.
///
/// # Errors
///
/// Returns [`NameError`] if the extension separator is missing, at
/// position 0, or the extension is not in [`RECOGNIZED_EXTENSIONS`].
pub fn strip_extension(file_name: &str) -> Result<&str, NameError> {
    let ext_off = match file_name.rfind('.') {
        Some(off) if off > 0 => off,
        _ => {
            return Err(NameError::MissingExtension {
                name: file_name.to_string(),
            })
        }
    };

    let extension = file_name[ext_off..].to_ascii_lowercase();
    if !RECOGNIZED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(NameError::UnrecognizedExtension {
            name: file_name.to_string(),
            extension,
        });
    }

    Ok(&file_name[..ext_off])
}
