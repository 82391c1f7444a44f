//! Degraded-mode placeholder nodes.
//!
//! When a file mentions tags the registry has never heard of, the
//! degraded reader still wants to finish the load so tools can inspect
//! the rest of the graph. These placeholders hold the raw pairs of an
//! unknown block verbatim. They are read-only: persisting one would
//! silently launder a block this process does not understand, so
//! `save` refuses.

use std::any::Any;
use std::rc::Rc;

use crate::node::{NodeRef, ResourceConfig};
use crate::port::{ReadPort, WritePort};
use crate::Error;

/// Placeholder for an unknown plain resource or worker tag.
pub struct GenericResourceConfig {
    tag: String,
    name: Option<String>,
    pairs: Vec<(String, String)>,
}

impl GenericResourceConfig {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            name: None,
            pairs: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The block's pairs, verbatim and in file order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl ResourceConfig for GenericResourceConfig {
    fn save(&self, _port: &mut dyn WritePort) -> Result<(), Error> {
        Err(Error::ReadOnly {
            tag: self.tag.clone(),
        })
    }

    fn load(&mut self, port: &dyn ReadPort) -> Result<(), Error> {
        self.pairs = port
            .keys()
            .into_iter()
            .filter_map(|key| port.get(&key).map(|value| (key, value)))
            .collect();
        Ok(())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Placeholder for an unknown runner tag.
///
/// Keeps the worker link alive so the service graph stays connected.
pub struct GenericRunnerConfig {
    tag: String,
    pairs: Vec<(String, String)>,
    worker: Option<NodeRef>,
}

impl GenericRunnerConfig {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            pairs: Vec::new(),
            worker: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn set_worker(&mut self, worker: Option<NodeRef>) {
        self.worker = worker;
    }
}

impl ResourceConfig for GenericRunnerConfig {
    fn save(&self, _port: &mut dyn WritePort) -> Result<(), Error> {
        Err(Error::ReadOnly {
            tag: self.tag.clone(),
        })
    }

    fn load(&mut self, port: &dyn ReadPort) -> Result<(), Error> {
        let mut pairs = Vec::new();
        for key in port.keys() {
            let Some(value) = port.get(&key) else { continue };
            if key == crate::runner::LocalRunnerConfig::WORKER {
                self.worker = Some(port.resolve(&value)?);
                continue;
            }
            pairs.push((key, value));
        }
        self.pairs = pairs;
        Ok(())
    }

    fn worker(&self) -> Option<NodeRef> {
        self.worker.as_ref().map(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::node::into_node;
    use crate::port::{MapReadPort, MapWritePort};
    use crate::registry::DegradedRegistry;
    use crate::resolver::DependencyResolver;

    fn resolver() -> DependencyResolver {
        DependencyResolver::new(Arc::new(DegradedRegistry::new()))
    }

    #[test]
    fn placeholder_keeps_pairs_verbatim() {
        let resolver = resolver();
        let pairs = vec![
            ("zebra".to_string(), "1".to_string()),
            ("alpha".to_string(), "2".to_string()),
        ];
        let port = MapReadPort::new(&pairs, &resolver);
        let mut generic = GenericResourceConfig::new("mysteryEngine");
        generic.load(&port).unwrap();

        assert_eq!(generic.pairs(), pairs.as_slice());
        assert_eq!(generic.get("zebra"), Some("1"));
    }

    #[test]
    fn placeholder_refuses_to_save() {
        let mut resolver = resolver();
        let generic = GenericResourceConfig::new("mysteryEngine");
        let err = MapWritePort::save(&generic, &mut resolver).unwrap_err();
        assert!(matches!(err, Error::ReadOnly { .. }));
        assert!(format!("{}", err).contains("mysteryEngine"));
    }

    #[test]
    fn generic_runner_preserves_worker_link() {
        let mut resolver = resolver();
        let worker = into_node(GenericResourceConfig::new("mysteryWorker"));
        let id = resolver.register(&worker);

        let pairs = vec![
            ("queueName".to_string(), "jobs".to_string()),
            ("worker".to_string(), id),
        ];
        let port = MapReadPort::new(&pairs, &resolver);
        let mut runner = GenericRunnerConfig::new("gridRunner");
        runner.load(&port).unwrap();

        assert!(runner.worker().is_some());
        assert_eq!(
            runner.pairs(),
            &[("queueName".to_string(), "jobs".to_string())]
        );
    }
}
