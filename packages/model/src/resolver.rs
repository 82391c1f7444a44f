//! The dependency resolver - a per-session identity map.
//!
//! One resolver spans one save or load (or one runtime realization).
//! It hands every node a session-unique string id, remembers the
//! node behind each id, and memoizes the runtime object built for a
//! node so shared dependencies are realized exactly once.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::factory::RuntimeObject;
use crate::node::{is_a, node_key, NodeRef, ResourceConfig};
use crate::registry::TypeRegistry;
use crate::Error;

struct Entry {
    id: String,
    node: NodeRef,
    object: Option<RuntimeObject>,
}

pub struct DependencyResolver {
    registry: Arc<dyn TypeRegistry>,
    entries: Vec<Entry>,
    by_node: HashMap<usize, usize>,
    next_serial: u32,
}

impl DependencyResolver {
    pub fn new(registry: Arc<dyn TypeRegistry>) -> Self {
        Self {
            registry,
            entries: Vec::new(),
            by_node: HashMap::new(),
            next_serial: 1,
        }
    }

    pub fn registry(&self) -> &Arc<dyn TypeRegistry> {
        &self.registry
    }

    /// Register a node under an id picked by the caller.
    ///
    /// Fails when either the id or the node is already taken - ids are
    /// one-to-one with nodes within a session.
    pub fn register_with_id(&mut self, id: &str, node: &NodeRef) -> Result<(), Error> {
        if self.node_of(id).is_some() || self.by_node.contains_key(&node_key(node)) {
            return Err(Error::DuplicateNode { id: id.to_string() });
        }
        self.insert(id.to_string(), node, None);
        Ok(())
    }

    /// Register a node, reusing its existing id when it has one.
    ///
    /// Named nodes are registered under their name; anonymous nodes get
    /// a session-serial id.
    pub fn register(&mut self, node: &NodeRef) -> String {
        if let Some(&index) = self.by_node.get(&node_key(node)) {
            return self.entries[index].id.clone();
        }
        let id = self.pick_id(node);
        self.insert(id.clone(), node, None);
        id
    }

    /// Register (if needed) and bind a runtime object to a node.
    /// Rebinding overwrites the previous object.
    pub fn bind(&mut self, node: &NodeRef, object: Option<RuntimeObject>) -> String {
        if let Some(&index) = self.by_node.get(&node_key(node)) {
            self.entries[index].object = object;
            return self.entries[index].id.clone();
        }
        let id = self.pick_id(node);
        self.insert(id.clone(), node, object);
        id
    }

    /// The runtime object for a node, building it on first request.
    ///
    /// The factory may recursively resolve the node's own dependencies
    /// through this resolver; each node's object is built at most once
    /// per session.
    pub fn create_singleton(&mut self, node: &NodeRef) -> Result<RuntimeObject, Error> {
        if let Some(&index) = self.by_node.get(&node_key(node)) {
            if let Some(object) = &self.entries[index].object {
                return Ok(Rc::clone(object));
            }
        }
        let factory = self.registry.factory_of(&*node.borrow())?;
        let object = factory.create(node, self)?;
        self.bind(node, Some(Rc::clone(&object)));
        Ok(object)
    }

    /// The id a node was registered under, if it was.
    pub fn id_of(&self, node: &NodeRef) -> Option<String> {
        self.by_node
            .get(&node_key(node))
            .map(|&i| self.entries[i].id.clone())
    }

    /// The node behind an id.
    pub fn node_of(&self, id: &str) -> Option<NodeRef> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| Rc::clone(&e.node))
    }

    /// The bound object behind an id.
    pub fn object_of(&self, id: &str) -> Option<RuntimeObject> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.object.as_ref().map(Rc::clone))
    }

    /// The bound object for a node.
    pub fn object_for(&self, node: &NodeRef) -> Option<RuntimeObject> {
        self.by_node
            .get(&node_key(node))
            .and_then(|&i| self.entries[i].object.as_ref().map(Rc::clone))
    }

    /// Move an id from one node to another, keeping its bound object.
    ///
    /// Used when a placeholder node is replaced by the real thing.
    pub fn rebind(&mut self, id: &str, node: &NodeRef) -> Result<(), Error> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::UnresolvedReference { id: id.to_string() })?;
        if self.by_node.contains_key(&node_key(node)) {
            return Err(Error::DuplicateNode { id: id.to_string() });
        }
        self.by_node.remove(&node_key(&self.entries[index].node));
        self.entries[index].node = Rc::clone(node);
        self.by_node.insert(node_key(node), index);
        Ok(())
    }

    /// The bound object of the single node of one config type that has
    /// one. Nodes registered without an object are not candidates.
    /// Errors when two bound candidates exist; `None` when none do.
    pub fn singleton_of_type<T: ResourceConfig>(&self) -> Result<Option<RuntimeObject>, Error> {
        let mut found: Option<&Entry> = None;
        for entry in &self.entries {
            if entry.object.is_none() || !is_a::<T>(&entry.node) {
                continue;
            }
            if let Some(first) = found {
                return Err(Error::AmbiguousSingleton {
                    type_name: std::any::type_name::<T>().to_string(),
                    first: first.id.clone(),
                    second: entry.id.clone(),
                });
            }
            found = Some(entry);
        }
        Ok(found.and_then(|e| e.object.as_ref().map(Rc::clone)))
    }

    /// All registered nodes, in registration order.
    pub fn nodes(&self) -> Vec<NodeRef> {
        self.entries.iter().map(|e| Rc::clone(&e.node)).collect()
    }

    fn pick_id(&mut self, node: &NodeRef) -> String {
        if let Some(name) = node.borrow().name() {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        let id = self.next_serial.to_string();
        self.next_serial += 1;
        id
    }

    fn insert(&mut self, id: String, node: &NodeRef, object: Option<RuntimeObject>) {
        let index = self.entries.len();
        self.by_node.insert(node_key(node), index);
        self.entries.push(Entry {
            id,
            node: Rc::clone(node),
            object,
        });
    }
}
