//! # Drydock
//!
//! An embedded-container harness for webapp integration tests: start a
//! real in-process server, deploy an archive, get back the listening
//! address and servlet routes to aim requests at, and tear everything
//! down when the test is done.
//!
//! The pieces:
//!
//! - `drydock-core`: archive contract, context-path derivation from
//!   archive names, version checks, and the configuration pipeline.
//! - `drydock-config`: typed container configuration with eager
//!   validation.
//! - `drydock-server`: the lifecycle state machine, deployment
//!   coordinator, driver seam, and the hyper-backed in-process driver.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use drydock::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = ContainerConfig::builder().bind_port(0).build();
//! config.validate()?;
//!
//! let mut lifecycle =
//!     ServerLifecycle::new(EmbeddedDriver::new(DriverVariant::Modern), config.clone());
//! let handle = lifecycle.start().await?;
//!
//! let mut coordinator =
//!     DeploymentCoordinator::new(config, ExportRoot::discover()?, Capabilities::default());
//! let archive = MemoryArchive::new("demo.war", b"bundle bytes".to_vec());
//! let metadata = coordinator.deploy(&archive, &handle).await?;
//!
//! for servlet in &metadata.servlets {
//!     println!("http://{}:{}{}", metadata.host, metadata.port, servlet.path);
//! }
//!
//! coordinator.undeploy(&handle).await;
//! lifecycle.stop().await?;
//! # Ok(())
//! # }
//! ```

// Re-export the component crates under stable names.
pub use drydock_config as config;
pub use drydock_core as core;
pub use drydock_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use drydock::prelude::*;
///
/// let config = ContainerConfig::default();
/// assert_eq!(config.bind_port, 9090);
/// ```
pub mod prelude {
    pub use drydock_config::{
        ClassLoaderPolicy, ConfigError, ContainerConfig, ContainerConfigBuilder, TlsConfig,
    };

    pub use drydock_core::{
        compute_context, Archive, Capabilities, ContextDescriptor, MemoryArchive, NameError,
        PluginFlags, ServerVersion, VersionError,
    };

    pub use drydock_server::{
        DeployError, DeploymentCoordinator, DeploymentMetadata, DriverError, DriverVariant,
        EmbeddedDriver, ExportRoot, LifecycleError, LifecycleState, ServerDriver, ServerHandle,
        ServerLifecycle, ServletMapping,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_exposes_the_whole_flow() {
        let config = ContainerConfig::builder()
            .bind_address("127.0.0.1")
            .bind_port(0)
            .build();
        assert!(config.validate().is_ok());

        let descriptor = compute_context("demo.war").unwrap();
        assert_eq!(descriptor.context_path, "/demo");
    }

    #[tokio::test]
    async fn test_facade_round_trip() {
        let config = ContainerConfig::builder()
            .bind_address("127.0.0.1")
            .bind_port(0)
            .build();

        let mut lifecycle =
            ServerLifecycle::new(EmbeddedDriver::new(DriverVariant::Modern), config.clone());
        let handle = lifecycle.start().await.unwrap();

        let exports = tempfile::tempdir().unwrap();
        let root = ExportRoot::at(exports.path()).unwrap();
        let mut coordinator = DeploymentCoordinator::new(config, root, Capabilities::default());

        let archive = MemoryArchive::new("facade.war", b"bundle".to_vec());
        let metadata = coordinator.deploy(&archive, &handle).await.unwrap();
        assert_eq!(metadata.servlets[0].path, "/facade");

        coordinator.undeploy(&handle).await;
        lifecycle.stop().await.unwrap();
    }
}
