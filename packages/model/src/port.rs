//! Key-value ports - the seam between nodes and their storage.
//!
//! A node never sees the text format. It saves itself by putting keys
//! into a [`WritePort`] and loads itself by getting keys from a
//! [`ReadPort`]; references to other nodes travel as ids assigned by
//! the session's dependency resolver. The text layer implements these
//! traits on top of blocks; [`MapWritePort`]/[`MapReadPort`] implement
//! them on plain ordered pairs for block parsing and for tests.

use crate::node::{NodeRef, ResourceConfig};
use crate::resolver::DependencyResolver;
use crate::Error;

/// Sink for one node's keys during save.
///
/// Object-safe: nodes receive `&mut dyn WritePort`.
pub trait WritePort {
    /// Record one key/value pair with an optional trailing comment.
    fn put(&mut self, key: &str, value: &str, comment: &str);

    /// Record a free-standing comment line.
    fn comment(&mut self, text: &str);

    /// Persist a referenced node (on first sight) and return its id.
    fn save_node(&mut self, node: &NodeRef) -> Result<String, Error>;

    fn put_bool(&mut self, key: &str, value: bool, comment: &str) {
        self.put(key, if value { "true" } else { "false" }, comment);
    }

    /// Record an integer, skipping it entirely when it equals the
    /// default. Keeps hand-edited files short.
    fn put_i32(&mut self, key: &str, value: i32, default: i32, comment: &str) {
        if value != default {
            self.put(key, &value.to_string(), comment);
        }
    }

    /// Persist every node in the list and record the comma-separated
    /// ids under `key`.
    fn put_node_list(&mut self, key: &str, nodes: &[NodeRef], comment: &str) -> Result<(), Error> {
        let mut ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            ids.push(self.save_node(node)?);
        }
        self.put(key, &ids.join(", "), comment);
        Ok(())
    }
}

/// Source of one node's keys during load.
///
/// Object-safe: nodes receive `&dyn ReadPort`.
pub trait ReadPort {
    /// Value for a key, or `None` when absent. Values may be empty.
    fn get(&self, key: &str) -> Option<String>;

    /// All keys, in insertion order.
    fn keys(&self) -> Vec<String>;

    /// Turn a persisted id back into the node it refers to.
    fn resolve(&self, id: &str) -> Result<NodeRef, Error>;

    fn require(&self, key: &str) -> Result<String, Error> {
        self.get(key).ok_or_else(|| Error::MissingKey {
            key: key.to_string(),
        })
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn get_bool(&self, key: &str, default: bool) -> Result<bool, Error> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                "" => Ok(default),
                _ => Err(Error::InvalidValue {
                    key: key.to_string(),
                    value: v,
                    message: "expected true or false".to_string(),
                }),
            },
        }
    }

    fn get_i32(&self, key: &str, default: i32) -> Result<i32, Error> {
        match self.get(key) {
            None => Ok(default),
            Some(v) if v.is_empty() => Ok(default),
            Some(v) => v.parse().map_err(|_| Error::InvalidValue {
                key: key.to_string(),
                value: v,
                message: "expected an integer".to_string(),
            }),
        }
    }

    /// Resolve a comma-separated id list. An absent key is an empty
    /// list.
    fn resolve_list(&self, key: &str) -> Result<Vec<NodeRef>, Error> {
        let Some(raw) = self.get(key) else {
            return Ok(Vec::new());
        };
        let mut nodes = Vec::new();
        for id in raw.split(',') {
            let id = id.trim();
            if id.is_empty() {
                continue;
            }
            nodes.push(self.resolve(id)?);
        }
        Ok(nodes)
    }
}

/// Write port that collects ordered `(key, value)` pairs.
///
/// Referenced nodes are registered in the resolver (so they get stable
/// ids) but not recursively persisted; the pairs describe exactly one
/// node. Comments are dropped - they are cosmetic.
pub struct MapWritePort<'r> {
    pairs: Vec<(String, String)>,
    resolver: &'r mut DependencyResolver,
}

impl<'r> MapWritePort<'r> {
    pub fn new(resolver: &'r mut DependencyResolver) -> Self {
        Self {
            pairs: Vec::new(),
            resolver,
        }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }

    /// Collect one node's pairs in a single call.
    pub fn save(
        config: &dyn ResourceConfig,
        resolver: &'r mut DependencyResolver,
    ) -> Result<Vec<(String, String)>, Error> {
        let mut port = MapWritePort::new(resolver);
        config.save(&mut port)?;
        Ok(port.into_pairs())
    }
}

impl WritePort for MapWritePort<'_> {
    fn put(&mut self, key: &str, value: &str, _comment: &str) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    fn comment(&mut self, _text: &str) {}

    fn save_node(&mut self, node: &NodeRef) -> Result<String, Error> {
        Ok(self.resolver.register(node))
    }
}

/// Read port over ordered `(key, value)` pairs.
pub struct MapReadPort<'r> {
    pairs: &'r [(String, String)],
    resolver: &'r DependencyResolver,
}

impl<'r> MapReadPort<'r> {
    pub fn new(pairs: &'r [(String, String)], resolver: &'r DependencyResolver) -> Self {
        Self { pairs, resolver }
    }
}

impl ReadPort for MapReadPort<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn keys(&self) -> Vec<String> {
        self.pairs.iter().map(|(k, _)| k.clone()).collect()
    }

    fn resolve(&self, id: &str) -> Result<NodeRef, Error> {
        self.resolver
            .node_of(id)
            .ok_or_else(|| Error::UnresolvedReference { id: id.to_string() })
    }
}
