//! Container lifecycle state machine.
//!
//! [`ServerLifecycle`] owns one driver and marches it through
//! stopped → starting → running → stopping → stopped. Start performs the
//! version preflight, binds the connector, resolves the effective
//! listening address, and installs the optional realm; any failure
//! unwinds back to stopped so a retry starts from a clean slate.

use std::sync::Arc;

use drydock_config::ContainerConfig;

use crate::driver::{ConnectorSettings, ServerDriver, SocketBinding};
use crate::error::LifecycleError;

/// The lifecycle states a container instance moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No connector bound; the only state `start` is legal in.
    Stopped,
    /// `start` is in flight.
    Starting,
    /// The connector is accepting; deployments are legal.
    Running,
    /// `stop` is in flight.
    Stopping,
}

impl LifecycleState {
    fn name(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

/// A handle to a running container.
///
/// Cheap to clone; carries the driver plus the resolved listening
/// address deployments report back to the caller.
#[derive(Clone)]
pub struct ServerHandle {
    driver: Arc<dyn ServerDriver>,
    host: String,
    port: u16,
}

impl ServerHandle {
    /// The effective listening host.
    ///
    /// This is the driver-reported bound host when available, otherwise
    /// the configured bind address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The effective listening port, resolved after ephemeral-port
    /// binding.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The driver behind this handle.
    #[must_use]
    pub fn driver(&self) -> &dyn ServerDriver {
        self.driver.as_ref()
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

/// Owns one driver and its lifecycle state.
pub struct ServerLifecycle {
    driver: Arc<dyn ServerDriver>,
    config: ContainerConfig,
    state: LifecycleState,
}

impl ServerLifecycle {
    /// Creates a stopped lifecycle around `driver`.
    pub fn new(driver: impl ServerDriver + 'static, config: ContainerConfig) -> Self {
        Self {
            driver: Arc::new(driver),
            config,
            state: LifecycleState::Stopped,
        }
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The configuration this lifecycle runs with.
    #[must_use]
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Starts the container: version preflight, connector bind, realm
    /// installation.
    ///
    /// Returns a handle carrying the resolved listening address. On any
    /// failure the driver is shut back down and the lifecycle returns to
    /// stopped.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::IllegalState`] when not stopped,
    /// [`LifecycleError::IncompatibleRuntime`] when the embedded server
    /// library predates the driver's minimum, and
    /// [`LifecycleError::StartFailed`] for everything downstream.
    pub async fn start(&mut self) -> Result<ServerHandle, LifecycleError> {
        if self.state != LifecycleState::Stopped {
            return Err(LifecycleError::IllegalState {
                operation: "start",
                state: self.state.name(),
            });
        }

        let variant = self.driver.variant();
        self.driver
            .version()
            .assert_minimum(&variant.minimum_version())
            .map_err(LifecycleError::IncompatibleRuntime)?;

        self.state = LifecycleState::Starting;
        match self.start_inner().await {
            Ok(handle) => {
                self.state = LifecycleState::Running;
                Ok(handle)
            }
            Err(source) => {
                // Unwind whatever partially came up; the driver tolerates
                // shutdown before a completed start.
                if let Err(e) = self.driver.shutdown().await {
                    tracing::warn!(error = %e, "cleanup after failed start also failed");
                }
                self.state = LifecycleState::Stopped;
                Err(LifecycleError::StartFailed { source })
            }
        }
    }

    async fn start_inner(&self) -> Result<ServerHandle, crate::error::BoxError> {
        let variant = self.driver.variant();

        let mut http2 = self.config.enable_http2;
        if http2 && !variant.supports_http2() {
            tracing::warn!(
                %variant,
                "HTTP/2 requested but not supported by this driver variant, continuing with HTTP/1.1"
            );
            http2 = false;
        }

        let settings = ConnectorSettings {
            host: self.config.bind_address.clone(),
            port: self.config.bind_port,
            idle_timeout: self.config.idle_timeout(),
            header_buffer_size: self.config.header_buffer_size,
            http2,
            tls: self.config.tls.clone(),
        };

        let SocketBinding { host, port } = self.driver.start(settings).await?;
        let host = if host.is_empty() {
            self.config.bind_address.clone()
        } else {
            host
        };

        if let Some(realm_name) = self.config.realm_name() {
            // realm_name is only Some when realm_properties is set.
            if let Some(properties) = self.config.realm_properties.as_deref() {
                self.driver.install_realm(&realm_name, properties)?;
            }
        }

        tracing::info!(
            version = %self.driver.version(),
            %host,
            port,
            "embedded server started"
        );

        if self.config.dump_server_after_start {
            tracing::info!(dump = %self.driver.dump(), "server state after start");
        }

        Ok(ServerHandle {
            driver: Arc::clone(&self.driver),
            host,
            port,
        })
    }

    /// Stops the container.
    ///
    /// The lifecycle transitions to stopped even when the driver's
    /// shutdown fails; a failed stop never leaves the instance stuck in
    /// stopping.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::IllegalState`] when not running, and
    /// [`LifecycleError::StopFailed`] wrapping a driver shutdown failure.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Running {
            return Err(LifecycleError::IllegalState {
                operation: "stop",
                state: self.state.name(),
            });
        }

        self.state = LifecycleState::Stopping;
        let result = self.driver.shutdown().await;
        self.state = LifecycleState::Stopped;

        result.map_err(|e| LifecycleError::StopFailed { source: e.into() })?;
        tracing::info!("embedded server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for ServerLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerLifecycle")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
