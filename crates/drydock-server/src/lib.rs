//! # Drydock Server
//!
//! Container lifecycle and deployment orchestration for the Drydock
//! harness.
//!
//! The moving parts:
//!
//! - [`ServerDriver`] is the seam between the version-agnostic harness
//!   and one embedded-server release family; [`EmbeddedDriver`] is the
//!   hyper-backed in-process implementation shipped with the crate.
//! - [`ServerLifecycle`] owns a driver and marches it through
//!   stopped → running → stopped, performing the version preflight and
//!   resolving the effective listening address on the way up.
//! - [`DeploymentCoordinator`] exports a caller-owned archive to disk,
//!   resolves the configuration pipeline, registers the context through
//!   the driver, and reports routing metadata back.
//!
//! ```rust,no_run
//! use drydock_config::ContainerConfig;
//! use drydock_core::{Capabilities, MemoryArchive};
//! use drydock_server::{
//!     DeploymentCoordinator, DriverVariant, EmbeddedDriver, ExportRoot, ServerLifecycle,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = ContainerConfig::builder().bind_port(0).build();
//! let mut lifecycle =
//!     ServerLifecycle::new(EmbeddedDriver::new(DriverVariant::Modern), config.clone());
//! let handle = lifecycle.start().await?;
//!
//! let mut coordinator =
//!     DeploymentCoordinator::new(config, ExportRoot::discover()?, Capabilities::default());
//! let archive = MemoryArchive::new("demo.war", b"bundle".to_vec());
//! let metadata = coordinator.deploy(&archive, &handle).await?;
//! println!("deployed at {}:{}", metadata.host, metadata.port);
//!
//! coordinator.undeploy(&handle).await;
//! lifecycle.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod coordinator;
pub mod driver;
pub mod embedded;
pub mod error;
pub mod lifecycle;
pub mod shutdown;

pub use bundle::{ExportRoot, ExportedBundle};
pub use coordinator::{DeploymentCoordinator, DeploymentMetadata, ServletMapping};
pub use driver::{
    ConnectorSettings, DeployedContext, DriverVariant, GoalState, ServerDriver,
    ServletRegistration, SocketBinding, WebContext,
};
pub use embedded::EmbeddedDriver;
pub use error::{BoxError, DeployError, DriverError, LifecycleError};
pub use lifecycle::{LifecycleState, ServerHandle, ServerLifecycle};
pub use shutdown::{ConnectionTracker, StopSignal};
