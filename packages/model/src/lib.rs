//! Configuration graph model for gridconf.
//!
//! The pieces: [`ResourceConfig`] nodes held behind shared [`NodeRef`]
//! handles, the structural node types (application, daemon, service,
//! local runner), key-value [`port`] traits the nodes persist through,
//! a [`registry`] mapping type tags to constructors and runtime
//! factories, and the per-session [`DependencyResolver`] that keeps
//! node identity across persistence and runtime realization.
//!
//! Rendering to and from the text format lives in `gridconf-text`.

pub mod application;
pub mod daemon;
mod error;
pub mod factory;
pub mod generic;
pub mod node;
pub mod port;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod service;

pub use application::ApplicationConfig;
pub use daemon::DaemonConfig;
pub use error::Error;
pub use factory::{Category, Descriptor, RuntimeFactory, RuntimeObject};
pub use generic::{GenericResourceConfig, GenericRunnerConfig};
pub use node::{borrow_as, borrow_as_mut, into_node, is_a, NodeRef, ResourceConfig};
pub use port::{MapReadPort, MapWritePort, ReadPort, WritePort};
pub use registry::{DegradedRegistry, RegistryBuilder, StandardRegistry, TypeRegistry};
pub use resolver::DependencyResolver;
pub use runner::LocalRunnerConfig;
pub use service::{service_worker, ServiceConfig};
