//! # Drydock Core
//!
//! Version-agnostic deployment protocol for the Drydock container harness.
//!
//! This crate holds the pure, I/O-free pieces of the protocol that every
//! server driver shares:
//!
//! - [`Archive`]: the opaque deployable-bundle contract supplied by callers
//! - [`compute_context`]: archive name to context path / virtual host rules
//! - [`pipeline::resolve`]: configuration-stage pipeline resolution
//! - [`ServerVersion`]: minimum-version compatibility checks
//!
//! Everything here is deterministic and testable without a running server;
//! the server-facing half of the protocol lives in `drydock-server`.

pub mod archive;
pub mod context;
pub mod pipeline;
pub mod version;

pub use archive::{Archive, MemoryArchive};
pub use context::{compute_context, ContextDescriptor, NameError};
pub use pipeline::{Capabilities, PluginFlags};
pub use version::{ServerVersion, VersionError};
