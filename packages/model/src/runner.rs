//! Runner nodes - execution strategies wrapping a worker.
//!
//! The one built-in strategy runs the worker in a local thread pool.
//! Other strategies (grid engines, remote submission) register their
//! own tags through the registry; anything ending in `Runner` is
//! treated as a runner by the degraded reader.

use std::any::Any;
use std::rc::Rc;

use crate::node::{NodeRef, ResourceConfig};
use crate::port::{ReadPort, WritePort};
use crate::Error;

/// Runs the wrapped worker on a pool of local threads.
pub struct LocalRunnerConfig {
    num_threads: i32,
    log_output_folder: String,
    worker: NodeRef,
}

impl LocalRunnerConfig {
    pub const TAG: &'static str = "localRunner";
    pub const NUM_THREADS: &'static str = "numThreads";
    pub const LOG_OUTPUT_FOLDER: &'static str = "logOutputFolder";
    pub const WORKER: &'static str = "worker";

    pub const DEFAULT_NUM_THREADS: i32 = 1;
    pub const DEFAULT_LOG_FOLDER: &'static str = ".";

    pub fn new(worker: NodeRef) -> Self {
        Self {
            num_threads: Self::DEFAULT_NUM_THREADS,
            log_output_folder: Self::DEFAULT_LOG_FOLDER.to_string(),
            worker,
        }
    }

    pub fn num_threads(&self) -> i32 {
        self.num_threads
    }

    pub fn set_num_threads(&mut self, num_threads: i32) {
        self.num_threads = num_threads;
    }

    pub fn log_output_folder(&self) -> &str {
        &self.log_output_folder
    }

    pub fn set_log_output_folder(&mut self, folder: &str) {
        self.log_output_folder = folder.to_string();
    }

    pub fn set_worker(&mut self, worker: NodeRef) {
        self.worker = worker;
    }
}

impl ResourceConfig for LocalRunnerConfig {
    fn save(&self, port: &mut dyn WritePort) -> Result<(), Error> {
        port.put_i32(
            Self::NUM_THREADS,
            self.num_threads,
            Self::DEFAULT_NUM_THREADS,
            "Number of worker threads",
        );
        if self.log_output_folder != Self::DEFAULT_LOG_FOLDER {
            port.put(
                Self::LOG_OUTPUT_FOLDER,
                &self.log_output_folder,
                "Where to write the worker logs",
            );
        }
        let id = port.save_node(&self.worker)?;
        port.put(Self::WORKER, &id, "The worker to run");
        Ok(())
    }

    fn load(&mut self, port: &dyn ReadPort) -> Result<(), Error> {
        self.num_threads = port.get_i32(Self::NUM_THREADS, Self::DEFAULT_NUM_THREADS)?;
        self.log_output_folder = port.get_or(Self::LOG_OUTPUT_FOLDER, Self::DEFAULT_LOG_FOLDER);
        let id = port.require(Self::WORKER)?;
        self.worker = port.resolve(&id)?;
        Ok(())
    }

    fn worker(&self) -> Option<NodeRef> {
        Some(Rc::clone(&self.worker))
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

    struct Blank;

    impl ResourceConfig for Blank {
        fn save(&self, _port: &mut dyn WritePort) -> Result<(), Error> {
            Ok(())
        }

        fn load(&mut self, _port: &dyn ReadPort) -> Result<(), Error> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn resolver() -> DependencyResolver {
        DependencyResolver::new(Arc::new(DegradedRegistry::new()))
    }

    #[test]
    fn defaults_stay_out_of_the_output() {
        let mut resolver = resolver();
        let worker = into_node(Blank);
        let runner = LocalRunnerConfig::new(Rc::clone(&worker));

        let pairs = MapWritePort::save(&runner, &mut resolver).unwrap();
        let keys: Vec<_> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec![LocalRunnerConfig::WORKER]);
    }

    #[test]
    fn non_defaults_are_persisted() {
        let mut resolver = resolver();
        let worker = into_node(Blank);
        let mut runner = LocalRunnerConfig::new(Rc::clone(&worker));
        runner.set_num_threads(4);
        runner.set_log_output_folder("logs/search");

        let pairs = MapWritePort::save(&runner, &mut resolver).unwrap();
        let keys: Vec<_> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                LocalRunnerConfig::NUM_THREADS,
                LocalRunnerConfig::LOG_OUTPUT_FOLDER,
                LocalRunnerConfig::WORKER,
            ]
        );
    }

    #[test]
    fn load_applies_defaults_when_absent() {
        let mut resolver = resolver();
        let worker = into_node(Blank);
        let id = resolver.register(&worker);

        let pairs = vec![(LocalRunnerConfig::WORKER.to_string(), id)];
        let port = MapReadPort::new(&pairs, &resolver);
        let mut runner = LocalRunnerConfig::new(into_node(Blank));
        runner.set_num_threads(9);
        runner.load(&port).unwrap();

        assert_eq!(runner.num_threads(), LocalRunnerConfig::DEFAULT_NUM_THREADS);
        assert_eq!(
            runner.log_output_folder(),
            LocalRunnerConfig::DEFAULT_LOG_FOLDER
        );
        assert!(runner.worker().is_some());
    }

    #[test]
    fn load_requires_worker() {
        let resolver = resolver();
        let pairs = vec![(LocalRunnerConfig::NUM_THREADS.to_string(), "3".to_string())];
        let port = MapReadPort::new(&pairs, &resolver);
        let mut runner = LocalRunnerConfig::new(into_node(Blank));
        let err = runner.load(&port).unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
    }
}
