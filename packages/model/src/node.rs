//! The configuration node trait and shared node handle.
//!
//! Every entry in the configuration graph - the application root, its
//! daemons, services, runners, workers and plain resources - implements
//! [`ResourceConfig`] and is held behind a [`NodeRef`]. Node identity is
//! handle identity: two `NodeRef`s are the same node when they point at
//! the same allocation, which is what the dependency resolver keys on.
//!
//! The graph is single-threaded by design; `Rc<RefCell<_>>` with `Weak`
//! back-links expresses the owning-collections-plus-back-references
//! shape without mutually-owning pointers.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::port::{ReadPort, WritePort};
use crate::Error;

/// Shared handle to any configuration node.
pub type NodeRef = Rc<RefCell<dyn ResourceConfig>>;

/// One node in the configuration graph.
///
/// A node knows how to persist itself to a [`WritePort`] and repopulate
/// itself from a [`ReadPort`]; the two must be symmetric per key. It
/// does not know anything about the on-disk rendering - blocks,
/// escaping and inlining all live in the text layer.
pub trait ResourceConfig: Any {
    /// Write this node's keys to the port.
    fn save(&self, port: &mut dyn WritePort) -> Result<(), Error>;

    /// Populate this node from the port.
    fn load(&mut self, port: &dyn ReadPort) -> Result<(), Error>;

    /// Creation priority. Higher priorities must be realized earlier.
    fn priority(&self) -> i32 {
        0
    }

    /// The user-chosen name, for nodes that have one.
    ///
    /// A named node's persisted id is its name, which keeps the id
    /// stable across independent save/load cycles.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Adopt a name read from a block id. No-op for unnamed nodes.
    fn set_name(&mut self, _name: &str) {}

    /// The worker wrapped by this node, for runner variants.
    fn worker(&self) -> Option<NodeRef> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Wrap a concrete config into a shared node handle.
pub fn into_node<T: ResourceConfig>(config: T) -> NodeRef {
    Rc::new(RefCell::new(config))
}

/// Borrow a node as a concrete config type, if it is one.
pub fn borrow_as<T: ResourceConfig>(node: &NodeRef) -> Option<Ref<'_, T>> {
    Ref::filter_map(node.borrow(), |n| n.as_any().downcast_ref::<T>()).ok()
}

/// Mutably borrow a node as a concrete config type, if it is one.
pub fn borrow_as_mut<T: ResourceConfig>(node: &NodeRef) -> Option<RefMut<'_, T>> {
    RefMut::filter_map(node.borrow_mut(), |n| n.as_any_mut().downcast_mut::<T>()).ok()
}

/// Check whether a node holds a concrete config type.
pub fn is_a<T: ResourceConfig>(node: &NodeRef) -> bool {
    node.borrow().as_any().is::<T>()
}

/// Identity key for a node handle.
///
/// Stable for the life of the handle; the resolver uses it to map nodes
/// back to their ids.
pub(crate) fn node_key(node: &NodeRef) -> usize {
    Rc::as_ptr(node) as *const () as usize
}

/// The node's name, or a placeholder for error messages.
pub(crate) fn display_name(node: &NodeRef) -> String {
    match node.borrow().name() {
        Some(name) => name.to_string(),
        None => "<anonymous>".to_string(),
    }
}
