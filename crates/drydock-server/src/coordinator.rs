//! Deployment orchestration.
//!
//! [`DeploymentCoordinator`] turns a caller-owned [`Archive`] into a
//! served context: derive the context from the archive name, export the
//! bundle to disk, resolve the configuration pipeline, hand the assembled
//! [`WebContext`](crate::WebContext) to the driver, and report the
//! routing metadata back. It tracks at most one deployment at a time,
//! matching the one-deployment-per-container model of the orchestrating
//! test framework.

use std::sync::Arc;

use drydock_config::{ClassLoaderPolicy, ContainerConfig};
use drydock_core::{compute_context, pipeline, Archive, Capabilities, ContextDescriptor};

use crate::bundle::{ExportRoot, ExportedBundle};
use crate::driver::{DeployedContext, WebContext};
use crate::error::DeployError;
use crate::lifecycle::ServerHandle;

/// One servlet route within deployment metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServletMapping {
    /// The servlet name.
    pub name: String,
    /// The context-relative base path requests route through; `/` for the
    /// root context.
    pub path: String,
}

/// What the caller needs to address a deployment: the listening socket
/// plus the servlet routes the container registered.
#[derive(Debug, Clone)]
pub struct DeploymentMetadata {
    /// The effective listening host.
    pub host: String,
    /// The effective listening port.
    pub port: u16,
    /// The registered servlet routes.
    pub servlets: Vec<ServletMapping>,
}

#[derive(Debug)]
struct Deployment {
    context: Arc<DeployedContext>,
    bundle: ExportedBundle,
}

/// Drives archives in and out of a running container, one at a time.
#[derive(Debug)]
pub struct DeploymentCoordinator {
    config: ContainerConfig,
    export_root: ExportRoot,
    capabilities: Capabilities,
    slot: Option<Deployment>,
}

impl DeploymentCoordinator {
    /// Creates an empty coordinator.
    ///
    /// `capabilities` records which optional configuration stages the
    /// embedded server actually provides; the pipeline resolver degrades
    /// to legacy stages or skips when they are missing.
    #[must_use]
    pub fn new(
        config: ContainerConfig,
        export_root: ExportRoot,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            config,
            export_root,
            capabilities,
            slot: None,
        }
    }

    /// Whether a deployment currently occupies the slot.
    #[must_use]
    pub fn is_deployed(&self) -> bool {
        self.slot.is_some()
    }

    /// Deploys `archive` to the running container behind `handle`.
    ///
    /// A deployment already occupying the slot is replaced; callers
    /// pairing every deploy with an undeploy never hit that path.
    ///
    /// # Errors
    ///
    /// [`DeployError::UnsupportedArchive`] when the archive name carries
    /// no recognized extension, [`DeployError::Failed`] for everything
    /// downstream (export, pipeline, driver registration).
    pub async fn deploy(
        &mut self,
        archive: &dyn Archive,
        handle: &ServerHandle,
    ) -> Result<DeploymentMetadata, DeployError> {
        let descriptor =
            compute_context(archive.name()).map_err(|source| DeployError::UnsupportedArchive {
                name: archive.name().to_string(),
                source,
            })?;

        self.deploy_inner(archive, handle, descriptor)
            .await
            .map_err(|source| DeployError::Failed {
                archive: archive.name().to_string(),
                source,
            })
    }

    async fn deploy_inner(
        &mut self,
        archive: &dyn Archive,
        handle: &ServerHandle,
        descriptor: ContextDescriptor,
    ) -> Result<DeploymentMetadata, crate::error::BoxError> {
        let bundle = ExportedBundle::export(
            archive,
            &self.export_root,
            self.config.use_archive_name_as_context,
        )?;

        let stages = pipeline::resolve(
            self.config.configuration_classes.as_deref(),
            self.config.plugins,
            self.capabilities,
        );
        let mime_overrides = self.config.mime_overrides()?;

        let context = WebContext {
            descriptor,
            content_root: bundle.path().to_path_buf(),
            stages,
            extract: true,
            parent_loader_priority: self.config.classloader_policy == ClassLoaderPolicy::JavaSpec,
            temp_directory: self.config.temp_directory.clone(),
            mime_overrides,
        };

        let deployed = handle.driver().install_context(context).await?;

        if let Some(previous) = self.slot.replace(Deployment {
            context: Arc::clone(&deployed),
            bundle,
        }) {
            tracing::debug!(
                context = %previous.context.descriptor().context_path,
                "replacing tracked deployment"
            );
        }

        let servlets = deployed
            .servlets()
            .iter()
            .map(|s| ServletMapping {
                name: s.name.clone(),
                path: if s.path.is_empty() {
                    "/".to_string()
                } else {
                    s.path.clone()
                },
            })
            .collect();

        Ok(DeploymentMetadata {
            host: handle.host().to_string(),
            port: handle.port(),
            servlets,
        })
    }

    /// Undeploys the tracked deployment, if any.
    ///
    /// Idempotent: calling with an empty slot is a logged no-op. Driver
    /// removal failures are logged, never propagated; the slot and the
    /// exported bundle are cleaned up regardless.
    pub async fn undeploy(&mut self, handle: &ServerHandle) {
        let Some(mut deployment) = self.slot.take() else {
            tracing::debug!("undeploy with nothing deployed, ignoring");
            return;
        };

        if let Err(e) = handle.driver().remove_context(&deployment.context).await {
            tracing::warn!(
                context = %deployment.context.descriptor().context_path,
                error = %e,
                "could not remove context during undeploy"
            );
        }

        deployment.bundle.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedded::EmbeddedDriver;
    use crate::lifecycle::ServerLifecycle;
    use crate::DriverVariant;
    use drydock_core::MemoryArchive;

    fn test_coordinator(config: ContainerConfig) -> (tempfile::TempDir, DeploymentCoordinator) {
        let tmp = tempfile::tempdir().unwrap();
        let root = ExportRoot::at(tmp.path().join("exports")).unwrap();
        let coordinator = DeploymentCoordinator::new(config, root, Capabilities::default());
        (tmp, coordinator)
    }

    fn test_config() -> ContainerConfig {
        ContainerConfig::builder()
            .bind_address("127.0.0.1")
            .bind_port(0)
            .build()
    }

    #[tokio::test]
    async fn test_deploy_reports_listening_address_and_servlets() {
        let mut lifecycle = ServerLifecycle::new(
            EmbeddedDriver::new(DriverVariant::Modern),
            test_config(),
        );
        let handle = lifecycle.start().await.unwrap();
        let (_exports, mut coordinator) = test_coordinator(test_config());

        let archive = MemoryArchive::new("demo.war", b"bundle".to_vec());
        let metadata = coordinator.deploy(&archive, &handle).await.unwrap();

        assert_eq!(metadata.host, "127.0.0.1");
        assert_eq!(metadata.port, handle.port());
        assert_eq!(metadata.servlets.len(), 1);
        assert_eq!(metadata.servlets[0].path, "/demo");

        coordinator.undeploy(&handle).await;
        lifecycle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_deploy_rejects_unrecognized_archive() {
        let mut lifecycle = ServerLifecycle::new(
            EmbeddedDriver::new(DriverVariant::Modern),
            test_config(),
        );
        let handle = lifecycle.start().await.unwrap();
        let (_exports, mut coordinator) = test_coordinator(test_config());

        let archive = MemoryArchive::new("library.jar", Vec::new());
        let err = coordinator.deploy(&archive, &handle).await.unwrap_err();
        assert!(matches!(err, DeployError::UnsupportedArchive { .. }));
        assert!(!coordinator.is_deployed());

        lifecycle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_undeploy_is_idempotent() {
        let mut lifecycle = ServerLifecycle::new(
            EmbeddedDriver::new(DriverVariant::Modern),
            test_config(),
        );
        let handle = lifecycle.start().await.unwrap();
        let (_exports, mut coordinator) = test_coordinator(test_config());

        let archive = MemoryArchive::new("demo.war", b"bundle".to_vec());
        coordinator.deploy(&archive, &handle).await.unwrap();
        assert!(coordinator.is_deployed());

        coordinator.undeploy(&handle).await;
        assert!(!coordinator.is_deployed());
        coordinator.undeploy(&handle).await;

        lifecycle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_root_archive_mounts_at_root() {
        let mut lifecycle = ServerLifecycle::new(
            EmbeddedDriver::new(DriverVariant::Modern),
            test_config(),
        );
        let handle = lifecycle.start().await.unwrap();
        let (_exports, mut coordinator) = test_coordinator(test_config());

        let archive = MemoryArchive::new("ROOT.war", b"bundle".to_vec());
        let metadata = coordinator.deploy(&archive, &handle).await.unwrap();
        assert_eq!(metadata.servlets[0].path, "/");

        coordinator.undeploy(&handle).await;
        lifecycle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stable_naming_reuses_archive_name() {
        let config = ContainerConfig::builder()
            .bind_address("127.0.0.1")
            .bind_port(0)
            .use_archive_name_as_context(true)
            .build();

        let mut lifecycle =
            ServerLifecycle::new(EmbeddedDriver::new(DriverVariant::Modern), config.clone());
        let handle = lifecycle.start().await.unwrap();
        let (_exports, mut coordinator) = test_coordinator(config);

        let archive = MemoryArchive::new("demo.war", b"bundle".to_vec());
        coordinator.deploy(&archive, &handle).await.unwrap();
        let slot_path = coordinator
            .slot
            .as_ref()
            .map(|d| d.context.content_root().to_path_buf())
            .unwrap();
        assert_eq!(slot_path.file_name().unwrap(), "demo.war");

        coordinator.undeploy(&handle).await;
        lifecycle.stop().await.unwrap();
    }
}
