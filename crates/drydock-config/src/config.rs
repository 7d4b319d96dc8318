//! Container configuration types.
//!
//! [`ContainerConfig`] is the full set of knobs the test orchestration can
//! turn: where to bind, which optional pipeline stages to enable, how the
//! exported archive becomes a context, and the optional realm, mime and
//! TLS extras. Defaults match the historical embedded adapters.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use drydock_core::PluginFlags;

use crate::{mime, ConfigError, TlsConfig};

/// Classloader search-order policy for deployed webapps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassLoaderPolicy {
    /// Server classloader first, then the webapp (the harness default).
    #[default]
    JavaSpec,
    /// Webapp classloader first, then the server.
    ServletSpec,
}

/// Full configuration for one embedded-container instance.
///
/// # Example
///
/// ```rust
/// use drydock_config::ContainerConfig;
///
/// let config = ContainerConfig::default();
/// assert_eq!(config.bind_address, "localhost");
/// assert_eq!(config.bind_port, 9090);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ContainerConfig {
    /// Address the connector binds to.
    pub bind_address: String,

    /// Port the connector binds to; `0` means any free port.
    pub bind_port: u16,

    /// Idle timeout for active connections, in milliseconds.
    pub idle_timeout_ms: u64,

    /// Request/response header buffer size in bytes; `0` means unset.
    pub header_buffer_size: usize,

    /// Path to a realm-properties file (`user: password` lines); when
    /// set, a security realm named after the file stem is installed.
    pub realm_properties: Option<PathBuf>,

    /// Comma-separated explicit configuration-stage list; overrides the
    /// default pipeline verbatim when non-blank.
    pub configuration_classes: Option<String>,

    /// Space-separated mime override spec, `extension type` pairs.
    pub mime_types: Option<String>,

    /// Classloader search-order policy for deployed webapps.
    pub classloader_policy: ClassLoaderPolicy,

    /// Log the server state tree after a successful start.
    pub dump_server_after_start: bool,

    /// Export the archive under its own name instead of a unique temp
    /// file, for stable human-readable context paths across runs.
    pub use_archive_name_as_context: bool,

    /// Base directory override for per-context temp files.
    pub temp_directory: Option<PathBuf>,

    /// Offer cleartext HTTP/2 on the connector (ignored with a warning
    /// on driver variants without HTTP/2 support).
    pub enable_http2: bool,

    /// Optional-stage feature toggles.
    pub plugins: PluginFlags,

    /// TLS connector parameters; only honored by TLS-capable variants.
    pub tls: Option<TlsConfig>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            bind_address: "localhost".to_string(),
            bind_port: 9090,
            idle_timeout_ms: 30_000,
            header_buffer_size: 0,
            realm_properties: None,
            configuration_classes: None,
            mime_types: None,
            classloader_policy: ClassLoaderPolicy::default(),
            dump_server_after_start: false,
            use_archive_name_as_context: false,
            temp_directory: None,
            enable_http2: false,
            plugins: PluginFlags::default(),
            tls: None,
        }
    }
}

impl ContainerConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ContainerConfigBuilder {
        ContainerConfigBuilder::default()
    }

    /// The idle timeout as a [`Duration`].
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Whether a header buffer size was configured.
    #[must_use]
    pub fn is_header_buffer_size_set(&self) -> bool {
        self.header_buffer_size > 0
    }

    /// Whether a realm-properties file was configured.
    #[must_use]
    pub fn is_realm_properties_set(&self) -> bool {
        self.realm_properties.is_some()
    }

    /// The parsed mime overrides, empty when none were configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMimeTypeSpec`] for a malformed spec;
    /// [`validate`](Self::validate) reports the same failure up front.
    pub fn mime_overrides(&self) -> Result<HashMap<String, String>, ConfigError> {
        match &self.mime_types {
            Some(spec) => mime::parse_mime_types(spec),
            None => Ok(HashMap::new()),
        }
    }

    /// The realm name derived from the properties file stem, up to the
    /// first `.` in the file name.
    #[must_use]
    pub fn realm_name(&self) -> Option<String> {
        let path = self.realm_properties.as_deref()?;
        let file_name = path.file_name()?.to_string_lossy();
        let stem = file_name
            .split_once('.')
            .map_or_else(|| file_name.to_string(), |(stem, _)| stem.to_string());
        Some(stem)
    }

    /// Validates the configuration.
    ///
    /// Checks that the realm-properties file (when set) exists and is a
    /// regular file, that the mime spec parses, and that a configured
    /// keystore exists. Failures here are fatal to the run; nothing is
    /// re-validated later.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.realm_properties {
            validate_regular_file(path)?;
        }

        if let Some(spec) = &self.mime_types {
            mime::parse_mime_types(spec)?;
        }

        if let Some(tls) = &self.tls {
            if !tls.keystore_path.exists() {
                return Err(ConfigError::KeystoreMissing {
                    path: tls.keystore_path.clone(),
                });
            }
        }

        Ok(())
    }
}

fn validate_regular_file(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::RealmPropertiesMissing {
            path: path.to_path_buf(),
        });
    }
    if path.is_dir() {
        return Err(ConfigError::RealmPropertiesNotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Builder for [`ContainerConfig`].
///
/// # Example
///
/// ```rust
/// use drydock_config::ContainerConfig;
///
/// let config = ContainerConfig::builder()
///     .bind_address("127.0.0.1")
///     .bind_port(0)
///     .dump_server_after_start(true)
///     .build();
///
/// assert_eq!(config.bind_port, 0);
/// ```
#[derive(Debug, Default)]
pub struct ContainerConfigBuilder {
    config: Option<ContainerConfig>,
}

impl ContainerConfigBuilder {
    fn config(&mut self) -> &mut ContainerConfig {
        self.config.get_or_insert_with(ContainerConfig::default)
    }

    /// Sets the connector bind address.
    #[must_use]
    pub fn bind_address(mut self, addr: impl Into<String>) -> Self {
        self.config().bind_address = addr.into();
        self
    }

    /// Sets the connector bind port; `0` means any free port.
    #[must_use]
    pub fn bind_port(mut self, port: u16) -> Self {
        self.config().bind_port = port;
        self
    }

    /// Sets the connection idle timeout in milliseconds.
    #[must_use]
    pub fn idle_timeout_ms(mut self, millis: u64) -> Self {
        self.config().idle_timeout_ms = millis;
        self
    }

    /// Sets the header buffer size in bytes.
    #[must_use]
    pub fn header_buffer_size(mut self, bytes: usize) -> Self {
        self.config().header_buffer_size = bytes;
        self
    }

    /// Sets the realm-properties file path.
    #[must_use]
    pub fn realm_properties(mut self, path: impl Into<PathBuf>) -> Self {
        self.config().realm_properties = Some(path.into());
        self
    }

    /// Sets the explicit comma-separated configuration-stage list.
    #[must_use]
    pub fn configuration_classes(mut self, list: impl Into<String>) -> Self {
        self.config().configuration_classes = Some(list.into());
        self
    }

    /// Sets the space-separated mime override spec.
    #[must_use]
    pub fn mime_types(mut self, spec: impl Into<String>) -> Self {
        self.config().mime_types = Some(spec.into());
        self
    }

    /// Sets the classloader search-order policy.
    #[must_use]
    pub fn classloader_policy(mut self, policy: ClassLoaderPolicy) -> Self {
        self.config().classloader_policy = policy;
        self
    }

    /// Logs the server state tree after a successful start.
    #[must_use]
    pub fn dump_server_after_start(mut self, dump: bool) -> Self {
        self.config().dump_server_after_start = dump;
        self
    }

    /// Exports the archive under its own name for stable context paths.
    #[must_use]
    pub fn use_archive_name_as_context(mut self, stable: bool) -> Self {
        self.config().use_archive_name_as_context = stable;
        self
    }

    /// Sets the base directory override for per-context temp files.
    #[must_use]
    pub fn temp_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config().temp_directory = Some(path.into());
        self
    }

    /// Offers cleartext HTTP/2 on the connector.
    #[must_use]
    pub fn enable_http2(mut self, enabled: bool) -> Self {
        self.config().enable_http2 = enabled;
        self
    }

    /// Sets the optional-stage feature toggles.
    #[must_use]
    pub fn plugins(mut self, flags: PluginFlags) -> Self {
        self.config().plugins = flags;
        self
    }

    /// Sets the TLS connector parameters.
    #[must_use]
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.config().tls = Some(tls);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(mut self) -> ContainerConfig {
        self.config.take().unwrap_or_default()
    }
}
