//! # Drydock Config
//!
//! Typed configuration for the Drydock container harness.
//!
//! The harness consumes configuration assembled by the surrounding test
//! orchestration; this crate gives it a typed shape, defaults matching
//! the historical adapters (bind to `localhost:9090`), and eager
//! validation so that a bad realm file or a malformed mime-type spec
//! fails the run before any server is started.

pub mod config;
pub mod error;
pub mod mime;
pub mod tls;

pub use config::{ClassLoaderPolicy, ContainerConfig, ContainerConfigBuilder};
pub use error::ConfigError;
pub use mime::parse_mime_types;
pub use tls::TlsConfig;
