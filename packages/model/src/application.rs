//! The application root node.
//!
//! An application is the whole distributed deployment: an ordered set
//! of unique daemons, each running on one machine. The daemon list is
//! the only thing the root persists; everything else hangs off the
//! daemons.

use std::any::Any;
use std::rc::Rc;

use crate::daemon::DaemonConfig;
use crate::node::{borrow_as, borrow_as_mut, display_name, is_a, node_key, NodeRef, ResourceConfig};
use crate::port::{ReadPort, WritePort};
use crate::service::ServiceConfig;
use crate::Error;

#[derive(Default)]
pub struct ApplicationConfig {
    daemons: Vec<NodeRef>,
}

impl ApplicationConfig {
    pub const TAG: &'static str = "application";
    pub const DAEMONS: &'static str = "daemons";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn daemons(&self) -> &[NodeRef] {
        &self.daemons
    }

    /// Look up a daemon by name; errors naming the missing id.
    pub fn daemon(&self, name: &str) -> Result<NodeRef, Error> {
        self.daemons
            .iter()
            .find(|d| {
                borrow_as::<DaemonConfig>(d).is_some_and(|daemon| daemon.name_str() == name)
            })
            .cloned()
            .ok_or_else(|| Error::UnresolvedReference {
                id: name.to_string(),
            })
    }

    pub fn clear(&mut self) {
        self.daemons.clear();
    }

    /// Add a daemon, rejecting duplicates by identity and by name, and
    /// set its back-reference to this application.
    pub fn add_daemon(application: &NodeRef, daemon: &NodeRef) -> Result<(), Error> {
        if !is_a::<DaemonConfig>(daemon) {
            return Err(Error::NotA {
                expected: "daemon",
                found: display_name(daemon),
            });
        }
        {
            let mut app = borrow_as_mut::<ApplicationConfig>(application).ok_or(Error::NotA {
                expected: "application",
                found: String::new(),
            })?;
            let name = borrow_as::<DaemonConfig>(daemon)
                .map(|d| d.name_str().to_string())
                .unwrap_or_default();
            for existing in &app.daemons {
                let same_node = node_key(existing) == node_key(daemon);
                let same_name = !name.is_empty()
                    && borrow_as::<DaemonConfig>(existing)
                        .is_some_and(|d| d.name_str() == name);
                if same_node || same_name {
                    return Err(Error::DuplicateDaemon { name });
                }
            }
            app.daemons.push(Rc::clone(daemon));
        }
        if let Some(mut d) = borrow_as_mut::<DaemonConfig>(daemon) {
            d.set_application(Some(Rc::downgrade(application)));
        }
        Ok(())
    }

    /// Remove a daemon and clear its back-reference.
    pub fn remove_daemon(application: &NodeRef, daemon: &NodeRef) {
        if let Some(mut app) = borrow_as_mut::<ApplicationConfig>(application) {
            app.daemons.retain(|d| node_key(d) != node_key(daemon));
        }
        if let Some(mut d) = borrow_as_mut::<DaemonConfig>(daemon) {
            d.set_application(None);
        }
    }

    /// Restore the back-references a bulk load cannot set: each daemon
    /// points at the application, each service at its daemon.
    ///
    /// Load replaces member lists wholesale, bypassing `add_daemon` and
    /// `add_resource`; call this once the whole graph is in place.
    pub fn relink(application: &NodeRef) -> Result<(), Error> {
        let daemons = borrow_as::<ApplicationConfig>(application)
            .ok_or(Error::NotA {
                expected: "application",
                found: String::new(),
            })?
            .daemons
            .clone();
        for daemon in &daemons {
            let services = {
                let mut d = borrow_as_mut::<DaemonConfig>(daemon).ok_or_else(|| Error::NotA {
                    expected: "daemon",
                    found: display_name(daemon),
                })?;
                d.set_application(Some(Rc::downgrade(application)));
                d.services().to_vec()
            };
            for service in &services {
                if let Some(mut s) = borrow_as_mut::<ServiceConfig>(service) {
                    s.set_daemon(Some(Rc::downgrade(daemon)));
                }
            }
        }
        Ok(())
    }

    /// Collect every resource or service worker of one concrete config
    /// type across all daemons.
    pub fn modules_of_type<T: ResourceConfig>(&self) -> Vec<NodeRef> {
        let mut found = Vec::new();
        for daemon in &self.daemons {
            let Some(daemon) = borrow_as::<DaemonConfig>(daemon) else {
                continue;
            };
            for resource in daemon.resources() {
                if is_a::<T>(resource) {
                    found.push(Rc::clone(resource));
                }
            }
            for service in daemon.services() {
                let Some(service) = borrow_as::<ServiceConfig>(service) else {
                    continue;
                };
                if let Some(worker) = service.runner().and_then(|r| r.borrow().worker()) {
                    if is_a::<T>(&worker) {
                        found.push(worker);
                    }
                }
            }
        }
        found
    }

    /// The daemon owning a resource, or owning the service whose worker
    /// it is.
    pub fn daemon_for(&self, resource: &NodeRef) -> Option<NodeRef> {
        for daemon in &self.daemons {
            let owner = borrow_as::<DaemonConfig>(daemon)?;
            for candidate in owner.resources() {
                if node_key(candidate) == node_key(resource) {
                    return Some(Rc::clone(daemon));
                }
            }
            for service in owner.services() {
                let Some(service) = borrow_as::<ServiceConfig>(service) else {
                    continue;
                };
                if let Some(worker) = service.runner().and_then(|r| r.borrow().worker()) {
                    if node_key(&worker) == node_key(resource) {
                        return Some(Rc::clone(daemon));
                    }
                }
            }
        }
        None
    }
}

impl ResourceConfig for ApplicationConfig {
    fn save(&self, port: &mut dyn WritePort) -> Result<(), Error> {
        port.put_node_list(
            Self::DAEMONS,
            &self.daemons,
            "Comma separated list of daemons",
        )
    }

    fn load(&mut self, port: &dyn ReadPort) -> Result<(), Error> {
        // The text writer drops the daemons key (every daemon is its
        // own block); only replace the list when the key is present.
        if port.get(Self::DAEMONS).is_some() {
            let daemons = port.resolve_list(Self::DAEMONS)?;
            for daemon in &daemons {
                if !is_a::<DaemonConfig>(daemon) {
                    return Err(Error::NotA {
                        expected: "daemon",
                        found: display_name(daemon),
                    });
                }
            }
            self.daemons = daemons;
        }
        Ok(())
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
    use crate::registry::DegradedRegistry;
    use crate::resolver::DependencyResolver;

    fn named_daemon(name: &str) -> NodeRef {
        into_node(DaemonConfig::new(name))
    }

    #[test]
    fn add_daemon_sets_back_reference() {
        let app = into_node(ApplicationConfig::new());
        let daemon = named_daemon("main");
        ApplicationConfig::add_daemon(&app, &daemon).unwrap();

        let back = borrow_as::<DaemonConfig>(&daemon)
            .unwrap()
            .application()
            .unwrap();
        assert_eq!(node_key(&back), node_key(&app));
        assert_eq!(borrow_as::<ApplicationConfig>(&app).unwrap().daemons().len(), 1);
    }

    #[test]
    fn duplicate_daemon_rejected() {
        let app = into_node(ApplicationConfig::new());
        let daemon = named_daemon("main");
        ApplicationConfig::add_daemon(&app, &daemon).unwrap();

        let err = ApplicationConfig::add_daemon(&app, &daemon).unwrap_err();
        assert!(matches!(err, Error::DuplicateDaemon { .. }));

        // Same name on a different node is also a duplicate.
        let twin = named_daemon("main");
        let err = ApplicationConfig::add_daemon(&app, &twin).unwrap_err();
        assert!(matches!(err, Error::DuplicateDaemon { .. }));
    }

    #[test]
    fn remove_daemon_clears_back_reference() {
        let app = into_node(ApplicationConfig::new());
        let daemon = named_daemon("main");
        ApplicationConfig::add_daemon(&app, &daemon).unwrap();
        ApplicationConfig::remove_daemon(&app, &daemon);

        assert!(borrow_as::<DaemonConfig>(&daemon)
            .unwrap()
            .application()
            .is_none());
        assert!(borrow_as::<ApplicationConfig>(&app)
            .unwrap()
            .daemons()
            .is_empty());
    }

    #[test]
    fn daemon_lookup_by_name() {
        let app = into_node(ApplicationConfig::new());
        ApplicationConfig::add_daemon(&app, &named_daemon("alpha")).unwrap();
        ApplicationConfig::add_daemon(&app, &named_daemon("beta")).unwrap();

        let found = borrow_as::<ApplicationConfig>(&app)
            .unwrap()
            .daemon("beta")
            .unwrap();
        assert_eq!(
            borrow_as::<DaemonConfig>(&found).unwrap().name_str(),
            "beta"
        );
        let err = borrow_as::<ApplicationConfig>(&app)
            .unwrap()
            .daemon("gamma")
            .err()
            .unwrap();
        assert!(format!("{}", err).contains("gamma"));
    }

    #[test]
    fn relink_restores_cleared_back_references() {
        let app = into_node(ApplicationConfig::new());
        let daemon = named_daemon("main");
        ApplicationConfig::add_daemon(&app, &daemon).unwrap();
        let service = into_node(ServiceConfig::new("svc"));
        DaemonConfig::add_resource(&daemon, &service).unwrap();

        // A bulk load replaces the member lists without touching the
        // weak links; simulate that by clearing them.
        borrow_as_mut::<DaemonConfig>(&daemon)
            .unwrap()
            .set_application(None);
        borrow_as_mut::<ServiceConfig>(&service)
            .unwrap()
            .set_daemon(None);

        ApplicationConfig::relink(&app).unwrap();

        let back = borrow_as::<DaemonConfig>(&daemon)
            .unwrap()
            .application()
            .unwrap();
        assert_eq!(node_key(&back), node_key(&app));
        let back = borrow_as::<ServiceConfig>(&service)
            .unwrap()
            .daemon()
            .unwrap();
        assert_eq!(node_key(&back), node_key(&daemon));
    }

    #[test]
    fn modules_of_type_sees_resources_and_workers() {
        use crate::runner::LocalRunnerConfig;

        struct Probe;

        impl ResourceConfig for Probe {
            fn save(&self, _port: &mut dyn crate::port::WritePort) -> Result<(), Error> {
                Ok(())
            }

            fn load(&mut self, _port: &dyn crate::port::ReadPort) -> Result<(), Error> {
                Ok(())
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }

        let app = into_node(ApplicationConfig::new());
        let daemon = named_daemon("main");
        ApplicationConfig::add_daemon(&app, &daemon).unwrap();

        let plain = into_node(Probe);
        DaemonConfig::add_resource(&daemon, &plain).unwrap();
        let worker = into_node(Probe);
        let runner = into_node(LocalRunnerConfig::new(Rc::clone(&worker)));
        let service = into_node(ServiceConfig::with_runner("svc", runner));
        DaemonConfig::add_resource(&daemon, &service).unwrap();

        let app_ref = borrow_as::<ApplicationConfig>(&app).unwrap();
        let found = app_ref.modules_of_type::<Probe>();
        assert_eq!(found.len(), 2);

        // Both the plain resource and the service worker map back to
        // the owning daemon.
        let owner = app_ref.daemon_for(&plain).unwrap();
        assert_eq!(node_key(&owner), node_key(&daemon));
        let owner = app_ref.daemon_for(&worker).unwrap();
        assert_eq!(node_key(&owner), node_key(&daemon));
        assert!(app_ref.daemon_for(&into_node(Probe)).is_none());
    }

    #[test]
    fn save_load_symmetric_through_map_ports() {
        use crate::port::{MapReadPort, MapWritePort};

        let registry: Arc<dyn crate::registry::TypeRegistry> = Arc::new(DegradedRegistry::new());
        let mut resolver = DependencyResolver::new(Arc::clone(&registry));

        let app = into_node(ApplicationConfig::new());
        let daemon = named_daemon("main");
        ApplicationConfig::add_daemon(&app, &daemon).unwrap();

        let pairs = MapWritePort::save(&*app.borrow(), &mut resolver).unwrap();
        assert_eq!(pairs, vec![("daemons".to_string(), "main".to_string())]);

        let mut restored = ApplicationConfig::new();
        let port = MapReadPort::new(&pairs, &resolver);
        restored.load(&port).unwrap();
        assert_eq!(restored.daemons().len(), 1);
    }
}
