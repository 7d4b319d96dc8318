//! TLS connector parameters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// TLS parameters for driver variants that support secure connectors.
///
/// Variants without TLS support refuse to start when this section is
/// present; a silent plaintext downgrade would invalidate what the test
/// believes it is exercising.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to the server keystore.
    pub keystore_path: PathBuf,

    /// Keystore password, if the keystore is protected.
    #[serde(default)]
    pub keystore_password: Option<String>,

    /// Path to the truststore for client-certificate validation.
    #[serde(default)]
    pub truststore_path: Option<PathBuf>,

    /// Truststore password.
    #[serde(default)]
    pub truststore_password: Option<String>,

    /// Require SNI to match the certificate before serving a request.
    #[serde(default)]
    pub sni_required: bool,
}

impl TlsConfig {
    /// Creates a TLS section for the given keystore path with everything
    /// else unset.
    #[must_use]
    pub fn new(keystore_path: impl Into<PathBuf>) -> Self {
        Self {
            keystore_path: keystore_path.into(),
            keystore_password: None,
            truststore_path: None,
            truststore_password: None,
            sni_required: false,
        }
    }
}
