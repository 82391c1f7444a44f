//! The gridconf text format - reading and writing configuration files.
//!
//! The format is line oriented: `#` starts a comment, `\` escapes, and
//! `<tag id>` ... `</tag>` delimits one node's block. Blocks never
//! nest; nodes refer to each other by id, and a service block inlines
//! its runner and worker. [`TopologyWriter`] and [`TopologyReader`]
//! work over any `Write`/`BufRead`; [`write_file`] and [`read_file`]
//! are the file-path conveniences.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use gridconf_model::{DependencyResolver, NodeRef, TypeRegistry};

mod error;
mod reader;
mod writer;

pub use error::Error;
pub use reader::TopologyReader;
pub use writer::TopologyWriter;

/// Load an application graph from a file.
///
/// Returns the application root together with the resolver that maps
/// every id in the file to its node.
pub fn read_file(
    path: &Path,
    registry: Arc<dyn TypeRegistry>,
) -> Result<(NodeRef, DependencyResolver), Error> {
    log::debug!("reading configuration from {}", path.display());
    let file = fs::File::open(path).map_err(|source| Error::File {
        path: display_path(path),
        source,
    })?;
    let mut reader = TopologyReader::new(io::BufReader::new(file), registry);
    let application = reader.load()?;
    Ok((application, reader.into_resolver()))
}

/// Save an application graph to a file.
///
/// Returns the resolver with the ids assigned during the save.
pub fn write_file(
    path: &Path,
    application: &NodeRef,
    registry: Arc<dyn TypeRegistry>,
) -> Result<DependencyResolver, Error> {
    log::debug!("writing configuration to {}", path.display());
    let file = fs::File::create(path).map_err(|source| Error::File {
        path: display_path(path),
        source,
    })?;
    let mut writer = TopologyWriter::new(io::BufWriter::new(file), registry);
    writer.save(application)?;
    Ok(writer.into_resolver())
}

/// Absolute path for error messages, best effort.
fn display_path(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
