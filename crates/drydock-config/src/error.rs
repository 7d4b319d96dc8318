//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors detected at configuration-validation time, before server start.
///
/// These are fatal to the whole run: a harness with a bad configuration
/// must fail setup immediately rather than start a half-configured
/// server.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configured realm-properties file does not exist.
    #[error("realm properties file {path} must exist")]
    RealmPropertiesMissing {
        /// The configured path.
        path: PathBuf,
    },

    /// The configured realm-properties path is not a regular file.
    #[error("realm properties should be a file and not a directory: {path}")]
    RealmPropertiesNotAFile {
        /// The configured path.
        path: PathBuf,
    },

    /// The mime-type spec has an odd token count.
    #[error(
        "mime type definition should follow the format \
         <extension> <type>[ <extension> <type>]*, \
         for example `js application/javascript`, but `{spec}` has been found"
    )]
    InvalidMimeTypeSpec {
        /// The malformed spec string.
        spec: String,
    },

    /// The configured TLS keystore does not exist.
    #[error("keystore file {path} must exist")]
    KeystoreMissing {
        /// The configured path.
        path: PathBuf,
    },
}
