//! Runtime factories and registry descriptors.
//!
//! Configuration nodes are inert data; a [`RuntimeFactory`] is what
//! turns one into a live object (a worker pool, a transport connection,
//! a shared resource). Collaborators hand the registry one
//! [`Descriptor`] per supported type tag.

use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

use crate::node::NodeRef;
use crate::resolver::DependencyResolver;
use crate::Error;

/// A live object built from a configuration node.
///
/// Shared and read-mostly; the resolver caches one per node.
pub type RuntimeObject = Rc<dyn Any>;

/// Builds the runtime object for one family of configuration nodes.
///
/// `create` is invoked at most once per node per resolver session; it
/// may use the resolver to pull in the singletons of nodes it depends
/// on.
pub trait RuntimeFactory: Send + Sync {
    fn create(&self, node: &NodeRef, resolver: &mut DependencyResolver)
        -> Result<RuntimeObject, Error>;
}

/// What a tag's nodes are, structurally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    /// A plain resource available to a daemon.
    Resource,
    /// A leaf unit-of-work configuration.
    Worker,
    /// An execution strategy wrapping a worker.
    Runner,
}

/// One externally supplied registry entry.
pub struct Descriptor {
    pub tag: String,
    pub user_name: String,
    pub category: Category,
    /// Builds an empty node for the reader to populate.
    pub constructor: Box<dyn Fn() -> NodeRef + Send + Sync>,
    /// Runtime factory, when the tag has a live counterpart.
    pub factory: Option<Arc<dyn RuntimeFactory>>,
}

impl Descriptor {
    pub fn new(
        tag: &str,
        user_name: &str,
        category: Category,
        constructor: impl Fn() -> NodeRef + Send + Sync + 'static,
    ) -> Self {
        Self {
            tag: tag.to_string(),
            user_name: user_name.to_string(),
            category,
            constructor: Box::new(constructor),
            factory: None,
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn RuntimeFactory>) -> Self {
        self.factory = Some(factory);
        self
    }
}
