//! Rendering a configuration graph to the text format.
//!
//! Blocks are never nested: a node that references other nodes causes
//! those nodes to be written as their own blocks first, then refers to
//! them by id. The one exception is a service, whose runner and worker
//! are flattened into the service block - runner keys get a `runner.`
//! prefix, the worker's keys appear unprefixed, and `runner.workerType`
//! records which worker type they belong to.

use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;

use gridconf_model::{
    borrow_as, ApplicationConfig, DependencyResolver, Error as ModelError, LocalRunnerConfig,
    NodeRef, ServiceConfig, TypeRegistry, WritePort,
};

use crate::Error;

pub(crate) const RUNNER_PREFIX: &str = "runner.";
pub(crate) const RUNNER_TYPE: &str = "runner.type";
pub(crate) const RUNNER_WORKER_TYPE: &str = "runner.workerType";

const INDENT: &str = "        ";
/// Values at least this long are left out of column alignment.
const MAX_ALIGNED_VALUE: usize = 50;

/// Streams a configuration graph to a writer.
///
/// The whole rendering is buffered; nothing reaches the underlying
/// writer until the graph has been walked without error.
pub struct TopologyWriter<W: Write> {
    out: W,
    registry: Arc<dyn TypeRegistry>,
    resolver: DependencyResolver,
}

impl<W: Write> TopologyWriter<W> {
    pub fn new(out: W, registry: Arc<dyn TypeRegistry>) -> Self {
        let resolver = DependencyResolver::new(Arc::clone(&registry));
        Self {
            out,
            registry,
            resolver,
        }
    }

    /// Render the application and everything reachable from it.
    pub fn save(&mut self, application: &NodeRef) -> Result<(), Error> {
        let mut buf = String::new();
        {
            let mut core = Core {
                buf: &mut buf,
                registry: &*self.registry,
                resolver: &mut self.resolver,
            };
            core.write_application(application)?;
        }
        log::debug!("rendered configuration, {} bytes", buf.len());
        self.out.write_all(buf.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    /// The resolver with the ids this save assigned.
    pub fn into_resolver(self) -> DependencyResolver {
        self.resolver
    }
}

struct Row {
    key: String,
    value: String,
    comment: String,
}

struct Core<'a> {
    buf: &'a mut String,
    registry: &'a dyn TypeRegistry,
    resolver: &'a mut DependencyResolver,
}

impl Core<'_> {
    fn write_application(&mut self, application: &NodeRef) -> Result<(), ModelError> {
        self.write_header();

        let mut port = SectionPort {
            core: self,
            rows: Vec::new(),
        };
        application.borrow().save(&mut port)?;
        let mut rows = port.rows;
        // Every daemon became its own block; the reference list is
        // redundant and the reader reattaches daemons from the blocks.
        rows.retain(|row| row.key != ApplicationConfig::DAEMONS);
        if !rows.is_empty() {
            self.buf.push('\n');
            render_rows(&rows, "", self.buf);
        }
        Ok(())
    }

    fn write_header(&mut self) {
        self.buf.push_str("# Application configuration\n");
        self.buf.push_str("# Supported types:\n");
        let tags = self.registry.known_tags();
        let width = tags.iter().map(String::len).max().unwrap_or(0);
        for tag in tags {
            let user_name = self.registry.user_name_of(&tag).unwrap_or_default();
            let line = format!("#    {:width$}  {}", tag, user_name, width = width);
            self.buf.push_str(line.trim_end());
            self.buf.push('\n');
        }
    }

    /// Write one node as a block (unless already written) and return
    /// its id.
    fn write_node(&mut self, node: &NodeRef) -> Result<String, ModelError> {
        if let Some(id) = self.resolver.id_of(node) {
            return Ok(id);
        }
        let tag = self.registry.tag_of(&*node.borrow())?;
        let id = match node.borrow().name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.auto_id(&tag),
        };
        self.resolver.register_with_id(&id, node)?;

        if tag == ServiceConfig::TAG {
            self.write_service(node, &id)?;
        } else {
            let mut port = SectionPort {
                core: self,
                rows: Vec::new(),
            };
            node.borrow().save(&mut port)?;
            let rows = port.rows;
            self.emit_block(&tag, &id, &rows);
        }
        Ok(id)
    }

    /// A service block inlines its runner and worker.
    fn write_service(&mut self, service: &NodeRef, id: &str) -> Result<(), ModelError> {
        let runner = borrow_as::<ServiceConfig>(service)
            .and_then(|s| s.runner())
            .ok_or_else(|| ModelError::Model {
                message: format!("service '{}' has no runner", id),
            })?;
        let runner_tag = self.registry.tag_of(&*runner.borrow())?;
        if self.resolver.id_of(&runner).is_none() {
            self.resolver
                .register_with_id(&format!("_service_{}_runner", id), &runner)?;
        }

        let mut rows = Vec::new();
        if runner_tag != LocalRunnerConfig::TAG {
            rows.push(Row {
                key: RUNNER_TYPE.to_string(),
                value: gridconf_escape::encode(&runner_tag),
                comment: "Type of the runner".to_string(),
            });
        }
        let worker = runner.borrow().worker();

        let mut port = SectionPort { core: self, rows };
        {
            let mut runner_port = RunnerPort {
                section: &mut port,
                worker,
                service_id: id.to_string(),
            };
            runner.borrow().save(&mut runner_port)?;
        }
        let rows = port.rows;
        self.emit_block(ServiceConfig::TAG, id, &rows);
        Ok(())
    }

    /// Smallest unused `_<tag>_<n>` id.
    fn auto_id(&self, tag: &str) -> String {
        let mut n = 1;
        loop {
            let id = format!("_{}_{}", tag, n);
            if self.resolver.node_of(&id).is_none() {
                return id;
            }
            n += 1;
        }
    }

    fn emit_block(&mut self, tag: &str, id: &str, rows: &[Row]) {
        self.buf.push('\n');
        self.buf.push_str(&format!(
            "<{} {}>\n",
            gridconf_escape::encode(tag),
            gridconf_escape::encode(id)
        ));
        render_rows(rows, INDENT, self.buf);
        self.buf.push_str(&format!("</{}>\n", gridconf_escape::encode(tag)));
    }
}

/// Align keys into one column and comments into another. Values longer
/// than [`MAX_ALIGNED_VALUE`] would push every comment far to the
/// right, so they overflow their column instead.
fn render_rows(rows: &[Row], indent: &str, buf: &mut String) {
    let key_width = rows
        .iter()
        .filter(|r| !r.key.is_empty())
        .map(|r| r.key.len())
        .max()
        .unwrap_or(0);
    let value_width = rows
        .iter()
        .filter(|r| !r.key.is_empty() && r.value.len() < MAX_ALIGNED_VALUE)
        .map(|r| r.value.len())
        .max()
        .unwrap_or(0);

    for row in rows {
        let mut line = String::new();
        line.push_str(indent);
        if row.key.is_empty() {
            line.push_str("# ");
            line.push_str(&row.comment);
        } else {
            line.push_str(&row.key);
            for _ in row.key.len()..key_width + 2 {
                line.push(' ');
            }
            line.push_str(&row.value);
            if !row.comment.is_empty() {
                let pad = (value_width + 2).saturating_sub(row.value.len()).max(2);
                for _ in 0..pad {
                    line.push(' ');
                }
                line.push_str("# ");
                line.push_str(&row.comment);
            }
        }
        buf.push_str(line.trim_end());
        buf.push('\n');
    }
}

struct SectionPort<'c, 'a> {
    core: &'c mut Core<'a>,
    rows: Vec<Row>,
}

impl WritePort for SectionPort<'_, '_> {
    fn put(&mut self, key: &str, value: &str, comment: &str) {
        // The block id already carries the name.
        if key == "name" {
            return;
        }
        self.rows.push(Row {
            key: gridconf_escape::encode(key),
            value: gridconf_escape::encode(value),
            comment: comment.to_string(),
        });
    }

    fn comment(&mut self, text: &str) {
        self.rows.push(Row {
            key: String::new(),
            value: String::new(),
            comment: text.to_string(),
        });
    }

    fn save_node(&mut self, node: &NodeRef) -> Result<String, ModelError> {
        self.core.write_node(node)
    }
}

/// Port a runner saves through while being inlined into a service
/// block. Keys get the `runner.` prefix; the worker reference becomes
/// `runner.workerType` plus the worker's own (unprefixed) keys.
struct RunnerPort<'p, 'c, 'a> {
    section: &'p mut SectionPort<'c, 'a>,
    worker: Option<NodeRef>,
    service_id: String,
}

impl WritePort for RunnerPort<'_, '_, '_> {
    fn put(&mut self, key: &str, value: &str, comment: &str) {
        // The worker reference is rendered as runner.workerType.
        if key == LocalRunnerConfig::WORKER {
            return;
        }
        self.section.rows.push(Row {
            key: gridconf_escape::encode(&format!("{}{}", RUNNER_PREFIX, key)),
            value: gridconf_escape::encode(value),
            comment: comment.to_string(),
        });
    }

    fn comment(&mut self, text: &str) {
        self.section.comment(text);
    }

    fn save_node(&mut self, node: &NodeRef) -> Result<String, ModelError> {
        let is_worker = self
            .worker
            .as_ref()
            .is_some_and(|worker| Rc::ptr_eq(worker, node));
        if !is_worker {
            return self.section.core.write_node(node);
        }
        let worker_tag = self.section.core.registry.tag_of(&*node.borrow())?;
        self.section.rows.push(Row {
            key: RUNNER_WORKER_TYPE.to_string(),
            value: gridconf_escape::encode(&worker_tag),
            comment: "Type of the worker".to_string(),
        });
        let worker_id = match self.section.core.resolver.id_of(node) {
            Some(id) => id,
            None => {
                let id = format!("_service_{}_worker", self.service_id);
                self.section.core.resolver.register_with_id(&id, node)?;
                id
            }
        };
        node.borrow().save(&mut *self.section)?;
        Ok(worker_id)
    }
}
