//! Gridconf - declarative configuration for multi-daemon applications.
//!
//! An application is described as a graph: daemons per machine,
//! services with runners and workers on each daemon, plus shared
//! resources. The graph persists to a line-oriented text format meant
//! to be edited by hand, and a per-session dependency resolver keeps
//! node identity stable across save, load and runtime realization.
//!
//! This crate just re-exports the layers:
//!
//! - [`escape`]: the line escaping codec
//! - [`model`]: nodes, ports, registry, resolver
//! - [`text`]: the file format
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use gridconf::{read_file, RegistryBuilder, TypeRegistry};
//!
//! let registry: Arc<dyn TypeRegistry> = Arc::new(RegistryBuilder::new().build()?);
//! let (application, resolver) = read_file(Path::new("app.conf"), registry)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use gridconf_escape as escape;
pub use gridconf_model as model;
pub use gridconf_text as text;

pub use gridconf_model::{
    borrow_as, borrow_as_mut, into_node, is_a, service_worker, ApplicationConfig, Category,
    DaemonConfig, DegradedRegistry, DependencyResolver, Descriptor, GenericResourceConfig,
    GenericRunnerConfig, LocalRunnerConfig, MapReadPort, MapWritePort, NodeRef, ReadPort,
    RegistryBuilder, ResourceConfig, RuntimeFactory, RuntimeObject, ServiceConfig,
    StandardRegistry, TypeRegistry, WritePort,
};
pub use gridconf_text::{read_file, write_file, TopologyReader, TopologyWriter};
