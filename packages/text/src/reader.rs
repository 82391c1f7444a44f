//! Parsing the text format back into a configuration graph.
//!
//! The reader is a line loop: decoded lines are either block delimiters
//! or key/value pairs. Blocks never nest, and a block only ever refers
//! to ids of blocks that came before it, so one pass suffices. Service
//! blocks are unflattened back into service, runner and worker nodes;
//! the synthetic nodes get ids derived from the service name. Pairs
//! outside any block belong to the application root and are applied
//! once the whole file has been read.

use std::io::BufRead;
use std::rc::Rc;
use std::sync::Arc;

use gridconf_model::{
    borrow_as, ApplicationConfig, DaemonConfig, DependencyResolver, Error as ModelError,
    LocalRunnerConfig, MapReadPort, NodeRef, ServiceConfig, TypeRegistry,
};

use crate::writer::{RUNNER_PREFIX, RUNNER_TYPE, RUNNER_WORKER_TYPE};
use crate::Error;

pub struct TopologyReader<R: BufRead> {
    input: R,
    registry: Arc<dyn TypeRegistry>,
    resolver: DependencyResolver,
}

struct OpenBlock {
    tag: String,
    id: String,
    pairs: Vec<(String, String)>,
}

impl<R: BufRead> TopologyReader<R> {
    pub fn new(input: R, registry: Arc<dyn TypeRegistry>) -> Self {
        let resolver = DependencyResolver::new(Arc::clone(&registry));
        Self {
            input,
            registry,
            resolver,
        }
    }

    /// Read the whole file and return the application root.
    pub fn load(&mut self) -> Result<NodeRef, Error> {
        let mut line = String::new();
        let mut line_no = 0usize;
        let mut open: Option<OpenBlock> = None;
        let mut root_pairs: Vec<(String, String)> = Vec::new();
        let mut daemons: Vec<NodeRef> = Vec::new();
        let mut application: Option<NodeRef> = None;

        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;
            let raw = line.trim_end_matches(['\n', '\r']);
            let decoded = gridconf_escape::decode(raw);
            if decoded.is_empty() {
                continue;
            }

            if let Some(inner) = decoded.strip_prefix('<') {
                let inner = inner.strip_suffix('>').ok_or_else(|| Error::Parse {
                    line: line_no,
                    message: format!("malformed block delimiter '{}'", decoded),
                })?;
                let inner = inner.trim();
                if let Some(close_tag) = inner.strip_prefix('/') {
                    let block = open.take().ok_or_else(|| Error::Parse {
                        line: line_no,
                        message: format!("closing </{}> without an open block", close_tag),
                    })?;
                    if close_tag.trim() != block.tag {
                        return Err(Error::Parse {
                            line: line_no,
                            message: format!(
                                "closing </{}> does not match open <{}>",
                                close_tag.trim(),
                                block.tag
                            ),
                        });
                    }
                    self.finish_block(block, line_no, &mut daemons, &mut application)?;
                } else {
                    if open.is_some() {
                        return Err(Error::Parse {
                            line: line_no,
                            message: format!("block <{}> opened inside another block", inner),
                        });
                    }
                    let mut tokens = inner.split_whitespace();
                    let tag = tokens.next().unwrap_or_default().to_string();
                    let id = tokens.next().map(str::to_string).ok_or_else(|| {
                        Error::Parse {
                            line: line_no,
                            message: format!("block <{}> is missing an id", tag),
                        }
                    })?;
                    if tokens.next().is_some() {
                        return Err(Error::Parse {
                            line: line_no,
                            message: format!("unexpected text after '<{} {}'", tag, id),
                        });
                    }
                    open = Some(OpenBlock {
                        tag,
                        id,
                        pairs: Vec::new(),
                    });
                }
                continue;
            }

            let (key, value) = split_pair(&decoded);
            match &mut open {
                Some(block) => block.pairs.push((key, value)),
                None => root_pairs.push((key, value)),
            }
        }

        if let Some(block) = open {
            return Err(Error::Parse {
                line: line_no,
                message: format!("block <{}> is never closed", block.tag),
            });
        }

        let application = match application {
            Some(app) => app,
            None => self
                .registry
                .node_for_tag(ApplicationConfig::TAG)
                .map_err(Error::Model)?,
        };
        {
            let port = MapReadPort::new(&root_pairs, &self.resolver);
            application.borrow_mut().load(&port).map_err(Error::Model)?;
        }
        for daemon in daemons {
            let already = borrow_as::<ApplicationConfig>(&application)
                .map(|app| app.daemons().iter().any(|d| Rc::ptr_eq(d, &daemon)))
                .unwrap_or(false);
            if !already {
                ApplicationConfig::add_daemon(&application, &daemon).map_err(Error::Model)?;
            }
        }
        // Loading replaced member lists wholesale, so the daemon and
        // service back-references still need wiring up.
        ApplicationConfig::relink(&application).map_err(Error::Model)?;
        log::debug!(
            "loaded configuration with {} registered nodes",
            self.resolver.nodes().len()
        );
        Ok(application)
    }

    /// The resolver holding every id this load assigned.
    pub fn into_resolver(self) -> DependencyResolver {
        self.resolver
    }

    fn finish_block(
        &mut self,
        block: OpenBlock,
        line: usize,
        daemons: &mut Vec<NodeRef>,
        application: &mut Option<NodeRef>,
    ) -> Result<(), Error> {
        let at = |e: ModelError| Error::Parse {
            line,
            message: e.to_string(),
        };
        match block.tag.as_str() {
            ServiceConfig::TAG => self.create_service(&block, line)?,
            _ => {
                let node = self.registry.node_for_tag(&block.tag).map_err(at)?;
                node.borrow_mut().set_name(&block.id);
                {
                    let port = MapReadPort::new(&block.pairs, &self.resolver);
                    node.borrow_mut().load(&port).map_err(at)?;
                }
                self.resolver.register_with_id(&block.id, &node).map_err(at)?;
                if block.tag == DaemonConfig::TAG {
                    daemons.push(node);
                } else if block.tag == ApplicationConfig::TAG {
                    *application = Some(node);
                }
            }
        }
        Ok(())
    }

    /// Unflatten a service block into worker, runner and service nodes.
    fn create_service(&mut self, block: &OpenBlock, line: usize) -> Result<(), Error> {
        let at = |e: ModelError| Error::Parse {
            line,
            message: e.to_string(),
        };

        let mut runner_tag = LocalRunnerConfig::TAG.to_string();
        let mut worker_tag: Option<String> = None;
        let mut runner_pairs: Vec<(String, String)> = Vec::new();
        let mut worker_pairs: Vec<(String, String)> = Vec::new();
        for (key, value) in &block.pairs {
            if key == RUNNER_TYPE {
                runner_tag = value.clone();
            } else if key == RUNNER_WORKER_TYPE {
                worker_tag = Some(value.clone());
            } else if let Some(rest) = key.strip_prefix(RUNNER_PREFIX) {
                runner_pairs.push((rest.to_string(), value.clone()));
            } else if key == "name" {
                // The block id is the name.
            } else {
                worker_pairs.push((key.clone(), value.clone()));
            }
        }
        let worker_tag = worker_tag.ok_or_else(|| Error::Parse {
            line,
            message: format!(
                "service '{}' is missing {}",
                block.id, RUNNER_WORKER_TYPE
            ),
        })?;

        let worker = self.registry.node_for_tag(&worker_tag).map_err(at)?;
        {
            let port = MapReadPort::new(&worker_pairs, &self.resolver);
            worker.borrow_mut().load(&port).map_err(at)?;
        }
        let worker_id = format!("_service_{}_worker", block.id);
        self.resolver.register_with_id(&worker_id, &worker).map_err(at)?;

        let runner = self.registry.node_for_tag(&runner_tag).map_err(at)?;
        runner_pairs.push((LocalRunnerConfig::WORKER.to_string(), worker_id));
        {
            let port = MapReadPort::new(&runner_pairs, &self.resolver);
            runner.borrow_mut().load(&port).map_err(at)?;
        }
        let runner_id = format!("_service_{}_runner", block.id);
        self.resolver.register_with_id(&runner_id, &runner).map_err(at)?;

        let service = self.registry.node_for_tag(ServiceConfig::TAG).map_err(at)?;
        service.borrow_mut().set_name(&block.id);
        {
            let pairs = vec![(ServiceConfig::RUNNER.to_string(), runner_id)];
            let port = MapReadPort::new(&pairs, &self.resolver);
            service.borrow_mut().load(&port).map_err(at)?;
        }
        self.resolver.register_with_id(&block.id, &service).map_err(at)?;
        Ok(())
    }
}

/// Split a decoded line into key and value at the first blank run.
fn split_pair(decoded: &str) -> (String, String) {
    match decoded.find([' ', '\t']) {
        Some(at) => (
            decoded[..at].to_string(),
            decoded[at..].trim().to_string(),
        ),
        None => (decoded.to_string(), String::new()),
    }
}
