//! Daemon nodes - one per machine.
//!
//! A daemon binds an ordered set of services and plain resources to a
//! host: its name, host address, operating system flavor and the local
//! folders the runtime needs. Services and resources live in separate
//! lists but share the add/remove entry points, which route on node
//! type.

use std::any::Any;
use std::rc::{Rc, Weak};

use crate::node::{
    borrow_as_mut, display_name, is_a, node_key, NodeRef, ResourceConfig,
};
use crate::port::{ReadPort, WritePort};
use crate::service::ServiceConfig;
use crate::Error;

#[derive(Default)]
pub struct DaemonConfig {
    name: String,
    host_name: String,
    os_name: String,
    os_arch: String,
    shared_file_space_path: String,
    temp_folder_path: String,
    dump_errors: bool,
    dump_folder_path: String,
    log_output_folder: String,
    services: Vec<NodeRef>,
    resources: Vec<NodeRef>,
    application: Option<Weak<std::cell::RefCell<dyn ResourceConfig>>>,
}

impl DaemonConfig {
    pub const TAG: &'static str = "daemon";
    pub const NAME: &'static str = "name";
    pub const HOST_NAME: &'static str = "hostName";
    pub const OS_NAME: &'static str = "osName";
    pub const OS_ARCH: &'static str = "osArch";
    pub const SHARED_FILE_SPACE_PATH: &'static str = "sharedFileSpacePath";
    pub const TEMP_FOLDER_PATH: &'static str = "tempFolderPath";
    pub const DUMP_ERRORS: &'static str = "dumpErrors";
    pub const DUMP_FOLDER_PATH: &'static str = "dumpFolderPath";
    pub const LOG_OUTPUT_FOLDER: &'static str = "logOutputFolder";
    pub const SERVICES: &'static str = "services";
    pub const RESOURCES: &'static str = "resources";

    pub const DEFAULT_LOG_FOLDER: &'static str = "var/log";

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            log_output_folder: Self::DEFAULT_LOG_FOLDER.to_string(),
            ..Self::default()
        }
    }

    /// A daemon describing the machine this process runs on, with
    /// conventional folder defaults.
    pub fn default_config(name: &str) -> Self {
        let mut daemon = Self::new(name);
        daemon.os_name = std::env::consts::OS.to_string();
        daemon.os_arch = std::env::consts::ARCH.to_string();
        daemon.shared_file_space_path = "/".to_string();
        daemon.temp_folder_path = "var/tmp".to_string();
        daemon.dump_folder_path = "var/tmp/dump".to_string();
        daemon
    }

    pub fn name_str(&self) -> &str {
        &self.name
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn set_host_name(&mut self, host_name: &str) {
        self.host_name = host_name.to_string();
    }

    pub fn os_name(&self) -> &str {
        &self.os_name
    }

    pub fn set_os_name(&mut self, os_name: &str) {
        self.os_name = os_name.to_string();
    }

    pub fn os_arch(&self) -> &str {
        &self.os_arch
    }

    pub fn set_os_arch(&mut self, os_arch: &str) {
        self.os_arch = os_arch.to_string();
    }

    pub fn shared_file_space_path(&self) -> &str {
        &self.shared_file_space_path
    }

    pub fn set_shared_file_space_path(&mut self, path: &str) {
        self.shared_file_space_path = path.to_string();
    }

    pub fn temp_folder_path(&self) -> &str {
        &self.temp_folder_path
    }

    pub fn set_temp_folder_path(&mut self, path: &str) {
        self.temp_folder_path = path.to_string();
    }

    pub fn dump_errors(&self) -> bool {
        self.dump_errors
    }

    pub fn set_dump_errors(&mut self, dump: bool) {
        self.dump_errors = dump;
    }

    pub fn dump_folder_path(&self) -> &str {
        &self.dump_folder_path
    }

    pub fn set_dump_folder_path(&mut self, path: &str) {
        self.dump_folder_path = path.to_string();
    }

    pub fn log_output_folder(&self) -> &str {
        &self.log_output_folder
    }

    pub fn set_log_output_folder(&mut self, folder: &str) {
        self.log_output_folder = folder.to_string();
    }

    pub fn services(&self) -> &[NodeRef] {
        &self.services
    }

    pub fn resources(&self) -> &[NodeRef] {
        &self.resources
    }

    pub fn application(&self) -> Option<NodeRef> {
        self.application.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_application(
        &mut self,
        application: Option<Weak<std::cell::RefCell<dyn ResourceConfig>>>,
    ) {
        self.application = application;
    }

    /// Case-insensitive OS flavor checks, matching how the OS name is
    /// typically recorded ("linux", "windows", "macos", "Mac OS X").
    pub fn is_windows(&self) -> bool {
        self.os_name.to_lowercase().contains("windows")
    }

    pub fn is_linux(&self) -> bool {
        self.os_name.to_lowercase().contains("linux")
    }

    pub fn is_mac(&self) -> bool {
        let os = self.os_name.to_lowercase();
        os.contains("mac") || os.contains("darwin")
    }

    /// Add a service or plain resource, routing on node type. Services
    /// get their daemon back-reference set.
    pub fn add_resource(daemon: &NodeRef, resource: &NodeRef) -> Result<(), Error> {
        let is_service = is_a::<ServiceConfig>(resource);
        {
            let mut this = borrow_as_mut::<DaemonConfig>(daemon).ok_or(Error::NotA {
                expected: "daemon",
                found: String::new(),
            })?;
            let list = if is_service {
                &this.services
            } else {
                &this.resources
            };
            if list.iter().any(|n| node_key(n) == node_key(resource)) {
                return Err(Error::DuplicateMember {
                    daemon: this.name.clone(),
                    member: display_name(resource),
                });
            }
            if is_service {
                this.services.push(Rc::clone(resource));
            } else {
                this.resources.push(Rc::clone(resource));
            }
        }
        if is_service {
            if let Some(mut service) = borrow_as_mut::<ServiceConfig>(resource) {
                service.set_daemon(Some(Rc::downgrade(daemon)));
            }
        }
        Ok(())
    }

    /// Remove a service or plain resource; clears the service
    /// back-reference.
    pub fn remove_resource(daemon: &NodeRef, resource: &NodeRef) {
        if let Some(mut this) = borrow_as_mut::<DaemonConfig>(daemon) {
            this.services.retain(|n| node_key(n) != node_key(resource));
            this.resources.retain(|n| node_key(n) != node_key(resource));
        }
        if let Some(mut service) = borrow_as_mut::<ServiceConfig>(resource) {
            service.set_daemon(None);
        }
    }

    /// First plain resource of a concrete config type, if any.
    pub fn first_resource_of_type<T: ResourceConfig>(&self) -> Option<NodeRef> {
        self.resources.iter().find(|r| is_a::<T>(r)).cloned()
    }
}

impl ResourceConfig for DaemonConfig {
    fn save(&self, port: &mut dyn WritePort) -> Result<(), Error> {
        port.put(Self::NAME, &self.name, "Daemon name");
        port.put(Self::HOST_NAME, &self.host_name, "Host the daemon runs on");
        port.put(Self::OS_NAME, &self.os_name, "Host system operating system name: e.g. Windows or Linux.");
        port.put(Self::OS_ARCH, &self.os_arch, "Host system architecture: x86, x86_64");
        port.put(
            Self::SHARED_FILE_SPACE_PATH,
            &self.shared_file_space_path,
            "Directory on a shared file system can be accessed from all the daemons",
        );
        port.put(
            Self::TEMP_FOLDER_PATH,
            &self.temp_folder_path,
            "Temporary folder that can be used for caching. Transferred files are stored here",
        );
        port.put_bool(
            Self::DUMP_ERRORS,
            self.dump_errors,
            "Not implemented yet. When a work packet fails, its data is stored in the dump folder",
        );
        port.put(
            Self::DUMP_FOLDER_PATH,
            &self.dump_folder_path,
            "Not implemented yet. Dump folder location",
        );
        port.put(
            Self::LOG_OUTPUT_FOLDER,
            &self.log_output_folder,
            "Where to write logs",
        );
        // Resources first, highest priority first; services follow in
        // their stated order. This makes dependencies appear before
        // their dependents in the rendered file.
        let mut resources = self.resources.clone();
        resources.sort_by_key(|r| std::cmp::Reverse(r.borrow().priority()));
        port.put_node_list(
            Self::RESOURCES,
            &resources,
            "Comma separated list of provided resources",
        )?;
        port.put_node_list(
            Self::SERVICES,
            &self.services,
            "Comma separated list of provided services",
        )?;
        Ok(())
    }

    fn load(&mut self, port: &dyn ReadPort) -> Result<(), Error> {
        if let Some(name) = port.get(Self::NAME) {
            self.name = name;
        }
        self.host_name = port.get_or(Self::HOST_NAME, "");
        self.os_name = port.get_or(Self::OS_NAME, "");
        self.os_arch = port.get_or(Self::OS_ARCH, "");
        self.shared_file_space_path = port.get_or(Self::SHARED_FILE_SPACE_PATH, "");
        self.temp_folder_path = port.get_or(Self::TEMP_FOLDER_PATH, "");
        self.dump_errors = port.get_bool(Self::DUMP_ERRORS, false)?;
        self.dump_folder_path = port.get_or(Self::DUMP_FOLDER_PATH, "");
        self.log_output_folder = port.get_or(Self::LOG_OUTPUT_FOLDER, Self::DEFAULT_LOG_FOLDER);
        self.resources = port.resolve_list(Self::RESOURCES)?;
        self.services = port.resolve_list(Self::SERVICES)?;
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
