//! The server-driver seam.
//!
//! Historically every supported embedded-server release had its own
//! near-identical adapter. Drydock keeps one lifecycle and one deployment
//! coordinator and pushes the per-release differences behind
//! [`ServerDriver`]: only how a driver binds a connector, installs a
//! realm, and drives a context to its goal states varies. The
//! [`DriverVariant`] matrix records what each supported release family
//! can do.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use drydock_config::TlsConfig;
use drydock_core::{ContextDescriptor, ServerVersion};

use crate::error::DriverError;

/// The supported embedded-server release families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverVariant {
    /// Oldest supported release line; no annotation or plus modules
    /// guaranteed, plaintext HTTP only.
    Legacy,
    /// Mainstream release line with the full configuration pipeline.
    Modern,
    /// Modern line with HTTP/2 and secure-connector support.
    ModernHttp2,
    /// Modular EE release line; HTTP/2, secure connectors, per-EE
    /// environments.
    ModernModularEe,
}

impl DriverVariant {
    /// The minimum embedded-server version this variant drives.
    #[must_use]
    pub fn minimum_version(self) -> ServerVersion {
        match self {
            Self::Legacy => ServerVersion::new(&[7, 0]),
            Self::Modern => ServerVersion::new(&[9, 0]),
            Self::ModernHttp2 => ServerVersion::new(&[10, 0]),
            Self::ModernModularEe => ServerVersion::new(&[12, 0]),
        }
    }

    /// Whether this variant can install a secure connector.
    #[must_use]
    pub fn supports_tls(self) -> bool {
        matches!(self, Self::ModernHttp2 | Self::ModernModularEe)
    }

    /// Whether this variant can offer HTTP/2 on the connector.
    #[must_use]
    pub fn supports_http2(self) -> bool {
        matches!(self, Self::ModernHttp2 | Self::ModernModularEe)
    }
}

impl fmt::Display for DriverVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Legacy => "legacy",
            Self::Modern => "modern",
            Self::ModernHttp2 => "modern-http2",
            Self::ModernModularEe => "modern-modular-ee",
        };
        f.write_str(name)
    }
}

/// Connector parameters handed to [`ServerDriver::start`].
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    /// Bind address or hostname.
    pub host: String,
    /// Bind port; `0` means any free port.
    pub port: u16,
    /// Idle timeout for active connections.
    pub idle_timeout: Duration,
    /// Header buffer size in bytes; `0` means driver default.
    pub header_buffer_size: usize,
    /// Offer HTTP/2 on the connector.
    pub http2: bool,
    /// Secure-connector parameters, if any.
    pub tls: Option<TlsConfig>,
}

/// Where the connector actually ended up listening.
///
/// `port` is the assigned port, which differs from the configured one
/// when ephemeral-port binding (`0`) was requested. `host` echoes the
/// driver's notion of the bound host and may be empty; the lifecycle
/// falls back to the configured bind address in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketBinding {
    /// The bound host, possibly empty.
    pub host: String,
    /// The assigned port.
    pub port: u16,
}

/// Everything a driver needs to register one deployable web context.
#[derive(Debug, Clone)]
pub struct WebContext {
    /// Where the context mounts.
    pub descriptor: ContextDescriptor,
    /// The exported bundle serving as the content root.
    pub content_root: PathBuf,
    /// Ordered configuration-stage list for this deployment.
    pub stages: Vec<String>,
    /// Extract the bundle before serving.
    pub extract: bool,
    /// Server-first (`true`) vs. webapp-first (`false`) classloading.
    pub parent_loader_priority: bool,
    /// Base directory override for this context's temp files.
    pub temp_directory: Option<PathBuf>,
    /// Mime-type overrides, extension to type.
    pub mime_overrides: HashMap<String, String>,
}

/// One servlet registered within a deployed context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServletRegistration {
    /// The servlet name.
    pub name: String,
    /// The effective path requests route through, usually the owning
    /// context's path.
    pub path: String,
}

/// Lifecycle goal states a deployed context moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalState {
    /// The context is serving requests.
    Started,
    /// The context has been taken down.
    Undeployed,
}

/// A context a driver has brought to its started goal state.
#[derive(Debug)]
pub struct DeployedContext {
    descriptor: ContextDescriptor,
    content_root: PathBuf,
    extracted_root: Option<PathBuf>,
    stages: Vec<String>,
    parent_loader_priority: bool,
    mime_overrides: HashMap<String, String>,
    servlets: Vec<ServletRegistration>,
    state: Mutex<GoalState>,
}

impl DeployedContext {
    pub(crate) fn new(
        context: WebContext,
        extracted_root: Option<PathBuf>,
        servlets: Vec<ServletRegistration>,
    ) -> Self {
        Self {
            descriptor: context.descriptor,
            content_root: context.content_root,
            extracted_root,
            stages: context.stages,
            parent_loader_priority: context.parent_loader_priority,
            mime_overrides: context.mime_overrides,
            servlets,
            state: Mutex::new(GoalState::Started),
        }
    }

    /// Where this context mounts.
    #[must_use]
    pub fn descriptor(&self) -> &ContextDescriptor {
        &self.descriptor
    }

    /// The exported bundle backing this context.
    #[must_use]
    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// The extraction directory, when the bundle was extracted.
    #[must_use]
    pub fn extracted_root(&self) -> Option<&Path> {
        self.extracted_root.as_deref()
    }

    /// The resolved configuration-stage list.
    #[must_use]
    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    /// Server-first vs. webapp-first classloading.
    #[must_use]
    pub fn parent_loader_priority(&self) -> bool {
        self.parent_loader_priority
    }

    /// Mime-type overrides for this context.
    #[must_use]
    pub fn mime_overrides(&self) -> &HashMap<String, String> {
        &self.mime_overrides
    }

    /// The servlets registered in this context.
    #[must_use]
    pub fn servlets(&self) -> &[ServletRegistration] {
        &self.servlets
    }

    /// The context's current goal state.
    #[must_use]
    pub fn goal_state(&self) -> GoalState {
        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn set_goal_state(&self, state: GoalState) {
        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = state;
    }
}

/// The capability seam between the version-agnostic core and one
/// embedded-server release.
///
/// All methods take `&self`; drivers use interior mutability for their
/// own state. `start`/`shutdown` bracket the connector's life;
/// `install_context`/`remove_context` drive contexts to their goal
/// states synchronously; they do not return until the goal state is
/// reached or the attempt has failed.
#[async_trait]
pub trait ServerDriver: Send + Sync {
    /// The release family this driver implements.
    fn variant(&self) -> DriverVariant;

    /// The embedded-server library version actually present.
    fn version(&self) -> ServerVersion;

    /// Binds the connector and starts accepting connections.
    async fn start(&self, settings: ConnectorSettings) -> Result<SocketBinding, DriverError>;

    /// Installs a security realm backed by a properties file of
    /// `user: password` lines.
    fn install_realm(&self, name: &str, properties: &Path) -> Result<(), DriverError>;

    /// Registers a web context and drives it to its started goal state.
    async fn install_context(
        &self,
        context: WebContext,
    ) -> Result<std::sync::Arc<DeployedContext>, DriverError>;

    /// Drives a context to its undeployed goal state and removes it.
    async fn remove_context(&self, context: &DeployedContext) -> Result<(), DriverError>;

    /// Renders the server state tree for diagnostics.
    fn dump(&self) -> String;

    /// Gracefully shuts the connector and all contexts down.
    ///
    /// Safe to call on a driver that never fully started; that is how the
    /// lifecycle unwinds a failed start.
    async fn shutdown(&self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_minimums_are_ordered() {
        assert!(DriverVariant::Legacy.minimum_version() < DriverVariant::Modern.minimum_version());
        assert!(
            DriverVariant::Modern.minimum_version()
                < DriverVariant::ModernModularEe.minimum_version()
        );
    }

    #[test]
    fn test_tls_capability_matrix() {
        assert!(!DriverVariant::Legacy.supports_tls());
        assert!(!DriverVariant::Modern.supports_tls());
        assert!(DriverVariant::ModernHttp2.supports_tls());
        assert!(DriverVariant::ModernModularEe.supports_tls());
    }

    #[test]
    fn test_variant_display() {
        assert_eq!(DriverVariant::ModernModularEe.to_string(), "modern-modular-ee");
    }

    #[test]
    fn test_deployed_context_goal_state_transitions() {
        let context = WebContext {
            descriptor: drydock_core::compute_context("demo.war").unwrap(),
            content_root: PathBuf::from("/tmp/demo.war"),
            stages: vec!["descriptor".to_string()],
            extract: false,
            parent_loader_priority: true,
            temp_directory: None,
            mime_overrides: HashMap::new(),
        };
        let deployed = DeployedContext::new(context, None, Vec::new());

        assert_eq!(deployed.goal_state(), GoalState::Started);
        deployed.set_goal_state(GoalState::Undeployed);
        assert_eq!(deployed.goal_state(), GoalState::Undeployed);
    }
}
