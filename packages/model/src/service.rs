//! Service nodes.
//!
//! A service is a named, addressable endpoint on a daemon: messages
//! sent to the service name end up at the worker its runner executes.
//! The service itself only persists the runner reference; the text
//! layer flattens runner and worker into the service block.

use std::any::Any;
use std::rc::Weak;

use crate::node::{NodeRef, ResourceConfig};
use crate::port::{ReadPort, WritePort};
use crate::Error;

#[derive(Default)]
pub struct ServiceConfig {
    name: String,
    runner: Option<NodeRef>,
    daemon: Option<Weak<std::cell::RefCell<dyn ResourceConfig>>>,
}

impl ServiceConfig {
    pub const TAG: &'static str = "service";
    pub const RUNNER: &'static str = "runner";

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_runner(name: &str, runner: NodeRef) -> Self {
        Self {
            name: name.to_string(),
            runner: Some(runner),
            daemon: None,
        }
    }

    pub fn runner(&self) -> Option<NodeRef> {
        self.runner.clone()
    }

    pub fn set_runner(&mut self, runner: Option<NodeRef>) {
        self.runner = runner;
    }

    pub fn daemon(&self) -> Option<NodeRef> {
        self.daemon.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_daemon(
        &mut self,
        daemon: Option<Weak<std::cell::RefCell<dyn ResourceConfig>>>,
    ) {
        self.daemon = daemon;
    }
}

impl ResourceConfig for ServiceConfig {
    fn save(&self, port: &mut dyn WritePort) -> Result<(), Error> {
        match &self.runner {
            Some(runner) => {
                let id = port.save_node(runner)?;
                port.put(Self::RUNNER, &id, "Runner that executes the worker");
                Ok(())
            }
            None => Err(Error::Model {
                message: format!("service '{}' has no runner", display_name_or(&self.name)),
            }),
        }
    }

    fn load(&mut self, port: &dyn ReadPort) -> Result<(), Error> {
        let id = port.require(Self::RUNNER)?;
        self.runner = Some(port.resolve(&id)?);
        Ok(())
    }

    fn name(&self) -> Option<&str> {
        if self.name.is_empty() {
            None
        } else {
            Some(&self.name)
        }
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn display_name_or(name: &str) -> &str {
    if name.is_empty() {
        "<anonymous>"
    } else {
        name
    }
}

/// The worker a service's runner wraps, following both links.
pub fn service_worker(service: &NodeRef) -> Option<NodeRef> {
    let service = crate::node::borrow_as::<ServiceConfig>(service)?;
    let runner = service.runner()?;
    let worker = runner.borrow().worker();
    worker
}
