//! Error types for the model layer.
//!
//! Every failure here makes the whole configuration unusable: callers
//! abort the surrounding load/save/resolve operation, there is no
//! partial result and no retry.

/// Errors raised by the node model, registry and resolver.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A node was registered twice within one resolver session.
    #[error("node '{id}' is already registered in this resolver session")]
    DuplicateNode { id: String },

    /// A referenced id has no node behind it.
    #[error("no configuration found for referenced id '{id}'")]
    UnresolvedReference { id: String },

    /// A type tag was requested that the registry does not know.
    #[error("unknown type tag '{tag}', supported tags are: {known}")]
    UnknownTag { tag: String, known: String },

    /// A node's concrete type is not registered (or carries no factory).
    #[error("configuration type is not registered, supported tags are: {known}")]
    UnknownVariant { known: String },

    /// A singleton-by-capability lookup matched more than one object.
    #[error("more than one configured object matches {type_name}: 1) '{first}' 2) '{second}'")]
    AmbiguousSingleton {
        type_name: String,
        first: String,
        second: String,
    },

    /// A degraded placeholder was asked to persist itself.
    #[error("a degraded '{tag}' placeholder cannot be persisted")]
    ReadOnly { tag: String },

    /// A required key is missing from a read port.
    #[error("missing required key '{key}'")]
    MissingKey { key: String },

    /// A value failed to parse for its key.
    #[error("invalid value '{value}' for key '{key}': {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    /// A node of one kind appeared where another was expected.
    #[error("expected a {expected}, got node '{found}'")]
    NotA {
        expected: &'static str,
        found: String,
    },

    /// An application already holds the daemon being added.
    #[error("application already contains daemon '{name}'")]
    DuplicateDaemon { name: String },

    /// A daemon already holds the service or resource being added.
    #[error("daemon '{daemon}' already contains '{member}'")]
    DuplicateMember { daemon: String, member: String },

    /// A runtime factory failed to build its object.
    #[error("factory for '{tag}' failed: {message}")]
    Factory { tag: String, message: String },

    /// Anything else.
    #[error("{message}")]
    Model { message: String },
}
