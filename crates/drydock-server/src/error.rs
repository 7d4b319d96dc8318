//! Lifecycle and deployment error types.
//!
//! Propagation policy: lifecycle and deployment failures are wrapped with
//! the server/archive identity and surfaced synchronously, never retried.
//! Teardown failures (stop, undeploy) are logged by the callers and never
//! block bookkeeping cleanup.

use std::io;

use thiserror::Error;

use drydock_core::{NameError, VersionError};

use crate::driver::DriverVariant;

/// A boxed error cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from [`ServerLifecycle`](crate::ServerLifecycle) operations.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// `start`/`stop` called out of order.
    #[error("cannot {operation} while the server is {state}")]
    IllegalState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The lifecycle state it was attempted in.
        state: &'static str,
    },

    /// The embedded server library is older than the driver's minimum.
    #[error("incompatible embedded server runtime: {0}")]
    IncompatibleRuntime(#[source] VersionError),

    /// The server could not be brought to the running state.
    ///
    /// The lifecycle is back in the stopped state; nothing stays
    /// partially wired.
    #[error("could not start container")]
    StartFailed {
        /// The underlying cause.
        #[source]
        source: BoxError,
    },

    /// Graceful shutdown failed.
    ///
    /// The lifecycle still transitions to stopped: a failed stop must not
    /// require (or permit) a second stop attempt.
    #[error("could not stop container")]
    StopFailed {
        /// The underlying cause.
        #[source]
        source: BoxError,
    },
}

/// Errors from [`DeploymentCoordinator`](crate::DeploymentCoordinator)
/// operations.
#[derive(Error, Debug)]
pub enum DeployError {
    /// The archive name does not carry a recognized archive extension.
    #[error("unsupported archive type: {name}")]
    UnsupportedArchive {
        /// The offending archive name.
        name: String,
        /// The naming rule that rejected it.
        #[source]
        source: NameError,
    },

    /// Deployment failed; never retried, since retrying against a
    /// partially mutated deployer could double-register a context.
    #[error("could not deploy {archive}")]
    Failed {
        /// The archive that was being deployed.
        archive: String,
        /// The underlying cause.
        #[source]
        source: BoxError,
    },
}

/// Errors surfaced by a [`ServerDriver`](crate::ServerDriver)
/// implementation.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The connector could not be bound.
    #[error("could not bind connector to {address}")]
    Bind {
        /// The `host:port` that failed to bind.
        address: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// TLS parameters were supplied to a variant without secure-connector
    /// support.
    #[error("TLS requested but the {variant} driver variant has no secure connector support")]
    TlsUnsupported {
        /// The variant lacking TLS support.
        variant: DriverVariant,
    },

    /// The driver supports the feature in principle but this
    /// implementation does not provide it.
    #[error("this driver does not implement {feature}")]
    NotImplemented {
        /// The missing feature.
        feature: &'static str,
    },

    /// The realm properties file could not be read.
    #[error("could not install realm {name}")]
    RealmInstall {
        /// The realm name.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An operation that needs a running server was called while stopped.
    #[error("server is not running")]
    NotRunning,

    /// A context with the same path is already deployed.
    #[error("context {context_path} is already deployed")]
    DuplicateContext {
        /// The conflicting context path.
        context_path: String,
    },

    /// The context could not be driven to its started goal state.
    #[error("could not start context {context_path}")]
    ContextStart {
        /// The context path being started.
        context_path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The context is not tracked by this driver.
    #[error("context {context_path} is not deployed")]
    UnknownContext {
        /// The unknown context path.
        context_path: String,
    },
}
