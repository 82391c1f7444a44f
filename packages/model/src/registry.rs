//! The type registry - tags to constructors and factories.
//!
//! Collaborating crates describe their configuration types with
//! [`Descriptor`]s; the registry built from them maps type tags to node
//! constructors for the reader and runtime factories for the resolver.
//! The structural tags (`application`, `daemon`, `service`) are always
//! present.
//!
//! [`DegradedRegistry`] is the no-collaborators fallback: it can read
//! any file by fabricating placeholder nodes, at the price of refusing
//! to write them back.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::application::ApplicationConfig;
use crate::daemon::DaemonConfig;
use crate::factory::{Category, Descriptor, RuntimeFactory};
use crate::generic::{GenericResourceConfig, GenericRunnerConfig};
use crate::node::{into_node, NodeRef, ResourceConfig};
use crate::service::ServiceConfig;
use crate::Error;

/// Maps type tags to the nodes and factories behind them.
///
/// `Send + Sync` so one registry can be built at startup and shared.
pub trait TypeRegistry: Send + Sync {
    /// A fresh, empty node for a tag, ready for `load`.
    fn node_for_tag(&self, tag: &str) -> Result<NodeRef, Error>;

    /// The tag a concrete node persists under.
    fn tag_of(&self, config: &dyn ResourceConfig) -> Result<String, Error>;

    /// The human-readable name for a tag, for UIs and comments.
    fn user_name_of(&self, tag: &str) -> Option<String>;

    /// Structural category of a tag.
    fn category_of(&self, tag: &str) -> Option<Category>;

    /// The runtime factory for a node's type.
    fn factory_of(&self, config: &dyn ResourceConfig) -> Result<Arc<dyn RuntimeFactory>, Error>;

    /// All known tags, sorted, for file headers and error messages.
    fn known_tags(&self) -> Vec<String>;
}

struct Entry {
    descriptor: Descriptor,
}

/// Registry assembled from descriptors at startup.
pub struct StandardRegistry {
    entries: Vec<Entry>,
    by_tag: HashMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
}

/// Collects descriptors and freezes them into a [`StandardRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    descriptors: Vec<Descriptor>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: Descriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn build(self) -> Result<StandardRegistry, Error> {
        let mut entries = Vec::new();
        let mut by_tag = HashMap::new();
        let mut by_type = HashMap::new();

        let mut descriptors = structural_descriptors();
        descriptors.extend(self.descriptors);

        for descriptor in descriptors {
            if by_tag.contains_key(&descriptor.tag) {
                return Err(Error::Model {
                    message: format!("type tag '{}' registered twice", descriptor.tag),
                });
            }
            // Probe the constructor once to learn the concrete type
            // behind the tag; tag_of and factory_of key on it.
            let probe = (descriptor.constructor)();
            let type_id = probe.borrow().as_any().type_id();
            let index = entries.len();
            by_tag.insert(descriptor.tag.clone(), index);
            by_type.insert(type_id, index);
            entries.push(Entry { descriptor });
        }
        Ok(StandardRegistry {
            entries,
            by_tag,
            by_type,
        })
    }
}

fn structural_descriptors() -> Vec<Descriptor> {
    vec![
        Descriptor::new(
            ApplicationConfig::TAG,
            "Application",
            Category::Resource,
            || into_node(ApplicationConfig::new()),
        ),
        Descriptor::new(DaemonConfig::TAG, "Daemon", Category::Resource, || {
            into_node(DaemonConfig::default())
        }),
        Descriptor::new(ServiceConfig::TAG, "Service", Category::Resource, || {
            into_node(ServiceConfig::default())
        }),
    ]
}

impl StandardRegistry {
    fn entry_for(&self, config: &dyn ResourceConfig) -> Result<&Entry, Error> {
        let type_id = config.as_any().type_id();
        self.by_type
            .get(&type_id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::UnknownVariant {
                known: self.known_tags().join(", "),
            })
    }
}

impl TypeRegistry for StandardRegistry {
    fn node_for_tag(&self, tag: &str) -> Result<NodeRef, Error> {
        match self.by_tag.get(tag) {
            Some(&i) => Ok((self.entries[i].descriptor.constructor)()),
            None => Err(Error::UnknownTag {
                tag: tag.to_string(),
                known: self.known_tags().join(", "),
            }),
        }
    }

    fn tag_of(&self, config: &dyn ResourceConfig) -> Result<String, Error> {
        Ok(self.entry_for(config)?.descriptor.tag.clone())
    }

    fn user_name_of(&self, tag: &str) -> Option<String> {
        self.by_tag
            .get(tag)
            .map(|&i| self.entries[i].descriptor.user_name.clone())
    }

    fn category_of(&self, tag: &str) -> Option<Category> {
        self.by_tag
            .get(tag)
            .map(|&i| self.entries[i].descriptor.category)
    }

    fn factory_of(&self, config: &dyn ResourceConfig) -> Result<Arc<dyn RuntimeFactory>, Error> {
        let entry = self.entry_for(config)?;
        entry
            .descriptor
            .factory
            .clone()
            .ok_or_else(|| Error::Factory {
                tag: entry.descriptor.tag.clone(),
                message: "no runtime factory registered".to_string(),
            })
    }

    fn known_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.descriptor.tag.clone())
            .collect();
        tags.sort();
        tags
    }
}

/// Fallback registry for reading files without any collaborators.
///
/// Daemons and services come back as real structural nodes; every other
/// tag becomes a placeholder - runner-looking tags (`*Runner`) map to
/// [`GenericRunnerConfig`], the rest to [`GenericResourceConfig`].
#[derive(Default)]
pub struct DegradedRegistry;

impl DegradedRegistry {
    pub const RUNNER_SUFFIX: &'static str = "Runner";

    pub fn new() -> Self {
        Self
    }
}

impl TypeRegistry for DegradedRegistry {
    fn node_for_tag(&self, tag: &str) -> Result<NodeRef, Error> {
        Ok(match tag {
            ApplicationConfig::TAG => into_node(ApplicationConfig::new()),
            DaemonConfig::TAG => into_node(DaemonConfig::default()),
            ServiceConfig::TAG => into_node(ServiceConfig::default()),
            _ if tag.ends_with(Self::RUNNER_SUFFIX) => into_node(GenericRunnerConfig::new(tag)),
            _ => into_node(GenericResourceConfig::new(tag)),
        })
    }

    fn tag_of(&self, config: &dyn ResourceConfig) -> Result<String, Error> {
        let any = config.as_any();
        if any.is::<ApplicationConfig>() {
            Ok(ApplicationConfig::TAG.to_string())
        } else if any.is::<DaemonConfig>() {
            Ok(DaemonConfig::TAG.to_string())
        } else if any.is::<ServiceConfig>() {
            Ok(ServiceConfig::TAG.to_string())
        } else if let Some(generic) = any.downcast_ref::<GenericResourceConfig>() {
            Ok(generic.tag().to_string())
        } else if let Some(generic) = any.downcast_ref::<GenericRunnerConfig>() {
            Ok(generic.tag().to_string())
        } else {
            Err(Error::UnknownVariant {
                known: self.known_tags().join(", "),
            })
        }
    }

    fn user_name_of(&self, _tag: &str) -> Option<String> {
        None
    }

    fn category_of(&self, tag: &str) -> Option<Category> {
        if tag.ends_with(Self::RUNNER_SUFFIX) {
            Some(Category::Runner)
        } else {
            Some(Category::Resource)
        }
    }

    fn factory_of(&self, _config: &dyn ResourceConfig) -> Result<Arc<dyn RuntimeFactory>, Error> {
        Err(Error::UnknownVariant {
            known: self.known_tags().join(", "),
        })
    }

    fn known_tags(&self) -> Vec<String> {
        vec![
            ApplicationConfig::TAG.to_string(),
            DaemonConfig::TAG.to_string(),
            ServiceConfig::TAG.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::rc::Rc;

    use super::*;
    use crate::port::{ReadPort, WritePort};
    use crate::resolver::DependencyResolver;

    #[derive(Default)]
    struct EchoWorker {
        greeting: String,
    }

    impl ResourceConfig for EchoWorker {
        fn save(&self, port: &mut dyn WritePort) -> Result<(), Error> {
            port.put("greeting", &self.greeting, "");
            Ok(())
        }

        fn load(&mut self, port: &dyn ReadPort) -> Result<(), Error> {
            self.greeting = port.get_or("greeting", "");
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct EchoFactory;

    impl RuntimeFactory for EchoFactory {
        fn create(
            &self,
            node: &NodeRef,
            _resolver: &mut DependencyResolver,
        ) -> Result<crate::factory::RuntimeObject, Error> {
            let greeting = crate::node::borrow_as::<EchoWorker>(node)
                .map(|w| w.greeting.clone())
                .unwrap_or_default();
            Ok(Rc::new(greeting))
        }
    }

    fn echo_registry() -> StandardRegistry {
        let mut builder = RegistryBuilder::new();
        builder.register(
            Descriptor::new("echoWorker", "Echo", Category::Worker, || {
                into_node(EchoWorker::default())
            })
            .with_factory(Arc::new(EchoFactory)),
        );
        builder.build().unwrap()
    }

    #[test]
    fn structural_tags_are_preseeded() {
        let registry = RegistryBuilder::new().build().unwrap();
        assert!(registry.node_for_tag("application").is_ok());
        assert!(registry.node_for_tag("daemon").is_ok());
        assert!(registry.node_for_tag("service").is_ok());
    }

    #[test]
    fn unknown_tag_enumerates_known_tags() {
        let registry = echo_registry();
        let err = registry.node_for_tag("bogus").err().unwrap();
        let display = format!("{}", err);
        assert!(display.contains("bogus"));
        assert!(display.contains("echoWorker"));
        assert!(display.contains("daemon"));
    }

    #[test]
    fn duplicate_tag_rejected_at_build() {
        let mut builder = RegistryBuilder::new();
        builder.register(Descriptor::new("x", "X", Category::Worker, || {
            into_node(EchoWorker::default())
        }));
        builder.register(Descriptor::new("x", "X again", Category::Worker, || {
            into_node(EchoWorker::default())
        }));
        assert!(builder.build().is_err());
    }

    #[test]
    fn tag_of_round_trips_through_constructor() {
        let registry = echo_registry();
        let node = registry.node_for_tag("echoWorker").unwrap();
        assert_eq!(registry.tag_of(&*node.borrow()).unwrap(), "echoWorker");
        assert_eq!(
            registry.user_name_of("echoWorker").as_deref(),
            Some("Echo")
        );
        assert_eq!(registry.category_of("echoWorker"), Some(Category::Worker));
    }

    #[test]
    fn factory_lookup_and_absence() {
        let registry = echo_registry();
        let node = registry.node_for_tag("echoWorker").unwrap();
        assert!(registry.factory_of(&*node.borrow()).is_ok());

        let daemon = registry.node_for_tag("daemon").unwrap();
        assert!(matches!(
            registry.factory_of(&*daemon.borrow()),
            Err(Error::Factory { .. })
        ));
    }

    #[test]
    fn degraded_registry_fabricates_placeholders() {
        let registry = DegradedRegistry::new();
        let resource = registry.node_for_tag("mysteryEngine").unwrap();
        assert!(crate::node::is_a::<GenericResourceConfig>(&resource));

        let runner = registry.node_for_tag("gridRunner").unwrap();
        assert!(crate::node::is_a::<GenericRunnerConfig>(&runner));
        assert_eq!(registry.category_of("gridRunner"), Some(Category::Runner));

        let daemon = registry.node_for_tag("daemon").unwrap();
        assert!(crate::node::is_a::<DaemonConfig>(&daemon));
    }

    #[test]
    fn degraded_tag_of_reads_placeholder_tag() {
        let registry = DegradedRegistry::new();
        let node = registry.node_for_tag("mysteryEngine").unwrap();
        assert_eq!(registry.tag_of(&*node.borrow()).unwrap(), "mysteryEngine");
    }
}
