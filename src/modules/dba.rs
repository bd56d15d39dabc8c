// dba module
// Cluster-administration façade. The façade validates names, arity and
// option sets; the operations themselves run behind the ClusterAdmin
// seam, which a deployment wires to its provisioning machinery.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::bridge::{ensure_count, ensure_count_range, Member, ObjectBridge};
use crate::error::{ShellError, ShellResult};
use crate::uri::ConnectionData;
use crate::value::{Value, ValueMap};

/// SSL requirement between cluster members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSslMode {
    Auto,
    Disabled,
    Required,
}

impl MemberSslMode {
    fn parse(text: &str) -> ShellResult<MemberSslMode> {
        match text {
            "AUTO" => Ok(MemberSslMode::Auto),
            "DISABLED" => Ok(MemberSslMode::Disabled),
            "REQUIRED" => Ok(MemberSslMode::Required),
            _ => Err(ShellError::ArgumentError(
                "Invalid value for memberSslMode option. \
                 Supported values: AUTO,DISABLED,REQUIRED."
                    .to_string(),
            )),
        }
    }
}

/// Validated createCluster options.
#[derive(Debug, Default, Clone)]
pub struct CreateClusterOptions {
    pub member_ssl_mode: Option<MemberSslMode>,
    pub adopt_from_gr: bool,
    pub ip_whitelist: Option<String>,
}

impl CreateClusterOptions {
    /// Parses and validates the option map of createCluster.
    pub fn from_map(map: &ValueMap) -> ShellResult<CreateClusterOptions> {
        let mut options = CreateClusterOptions::default();
        let mut invalid: Vec<String> = Vec::new();
        for (key, value) in map.iter() {
            match key {
                "memberSslMode" => {
                    let text = value.as_string().map_err(|_| {
                        ShellError::ArgumentError(
                            "Invalid value for memberSslMode option. \
                             Supported values: AUTO,DISABLED,REQUIRED."
                                .to_string(),
                        )
                    })?;
                    options.member_ssl_mode = Some(MemberSslMode::parse(text)?);
                }
                "adoptFromGR" => {
                    options.adopt_from_gr = value.as_bool().map_err(|_| {
                        ShellError::ArgumentError(
                            "Invalid value for adoptFromGR option: expected a boolean".to_string(),
                        )
                    })?;
                }
                "ipWhitelist" => {
                    let text = value.as_string().map_err(|_| {
                        ShellError::ArgumentError(
                            "Invalid value for ipWhitelist: string value cannot be empty."
                                .to_string(),
                        )
                    })?;
                    if text.is_empty() {
                        return Err(ShellError::ArgumentError(
                            "Invalid value for ipWhitelist: string value cannot be empty."
                                .to_string(),
                        ));
                    }
                    options.ip_whitelist = Some(text.to_string());
                }
                other => invalid.push(other.to_string()),
            }
        }
        if !invalid.is_empty() {
            return Err(ShellError::ArgumentError(format!(
                "Invalid values in the options: {}",
                invalid.join(", ")
            )));
        }
        if options.adopt_from_gr && options.member_ssl_mode.is_some() {
            return Err(ShellError::ArgumentError(
                "Cannot use memberSslMode option if adoptFromGR is set to true.".to_string(),
            ));
        }
        Ok(options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxOperation {
    Deploy,
    Start,
    Stop,
    Kill,
    Delete,
}

/// The administration backend. Validation happens in the façade; these
/// calls carry already-checked inputs.
pub trait ClusterAdmin {
    fn create_cluster(&self, name: &str, options: &CreateClusterOptions) -> ShellResult<()>;
    fn get_cluster(&self, name: Option<&str>) -> ShellResult<String>;
    fn sandbox(&self, operation: SandboxOperation, port: u16) -> ShellResult<()>;
    fn check_instance_configuration(&self, target: &ConnectionData) -> ShellResult<()>;
    fn configure_local_instance(&self, target: Option<&ConnectionData>) -> ShellResult<()>;
    fn drop_metadata_schema(&self) -> ShellResult<()>;
    fn reboot_cluster(&self, name: Option<&str>) -> ShellResult<()>;
}

/// Records calls and succeeds; the default admin when no provisioning
/// backend is wired in.
#[derive(Default)]
pub struct NoopClusterAdmin {
    pub calls: RefCell<Vec<String>>,
}

impl ClusterAdmin for NoopClusterAdmin {
    fn create_cluster(&self, name: &str, _options: &CreateClusterOptions) -> ShellResult<()> {
        self.calls.borrow_mut().push(format!("createCluster {}", name));
        Ok(())
    }

    fn get_cluster(&self, name: Option<&str>) -> ShellResult<String> {
        let name = name.unwrap_or("devCluster").to_string();
        self.calls.borrow_mut().push(format!("getCluster {}", name));
        Ok(name)
    }

    fn sandbox(&self, operation: SandboxOperation, port: u16) -> ShellResult<()> {
        self.calls
            .borrow_mut()
            .push(format!("sandbox {:?} {}", operation, port));
        Ok(())
    }

    fn check_instance_configuration(&self, target: &ConnectionData) -> ShellResult<()> {
        self.calls
            .borrow_mut()
            .push(format!("checkInstanceConfiguration {}", target.display_uri()));
        Ok(())
    }

    fn configure_local_instance(&self, _target: Option<&ConnectionData>) -> ShellResult<()> {
        self.calls
            .borrow_mut()
            .push("configureLocalInstance".to_string());
        Ok(())
    }

    fn drop_metadata_schema(&self) -> ShellResult<()> {
        self.calls.borrow_mut().push("dropMetadataSchema".to_string());
        Ok(())
    }

    fn reboot_cluster(&self, name: Option<&str>) -> ShellResult<()> {
        self.calls
            .borrow_mut()
            .push(format!("rebootCluster {}", name.unwrap_or("")));
        Ok(())
    }
}

/// An InnoDB cluster handle.
pub struct Cluster {
    name: String,
}

impl Cluster {
    pub fn new(name: &str) -> Rc<Cluster> {
        Rc::new(Cluster {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ObjectBridge for Cluster {
    fn class_name(&self) -> &str {
        "Cluster"
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::property("name"), Member::method("getName")]
    }

    fn get_property(&self, name: &str) -> ShellResult<Value> {
        match name {
            "name" => Ok(Value::from(self.name.clone())),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        match name {
            "getName" => {
                ensure_count("Cluster.getName", &args, 0)?;
                Ok(Value::from(self.name.clone()))
            }
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn append_descr(&self) -> String {
        format!("<Cluster:{}>", self.name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct Dba {
    admin: Rc<dyn ClusterAdmin>,
    verbose: Cell<bool>,
}

impl Dba {
    pub fn new(admin: Rc<dyn ClusterAdmin>) -> Rc<Dba> {
        Rc::new(Dba {
            admin,
            verbose: Cell::new(false),
        })
    }

    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.set(verbose);
    }

    fn create_cluster(&self, args: Vec<Value>) -> ShellResult<Value> {
        let api = "Dba.createCluster";
        ensure_count_range(api, &args, 1, 2)?;
        let name = match &args[0] {
            Value::String(name) => name.clone(),
            _ => return Err(ShellError::argument_kind(api, 1, "string")),
        };
        if name.is_empty() {
            return Err(ShellError::argument(api, "The Cluster name cannot be empty"));
        }
        let options = match args.get(1) {
            None | Some(Value::Undefined) => CreateClusterOptions::default(),
            Some(Value::Map(map)) => CreateClusterOptions::from_map(&map.borrow())?,
            Some(_) => return Err(ShellError::argument_kind(api, 2, "map")),
        };
        debug!(cluster = %name, "creating cluster");
        self.admin.create_cluster(&name, &options)?;
        Ok(Value::Object(Cluster::new(&name)))
    }

    fn sandbox_call(
        &self,
        api: &str,
        operation: SandboxOperation,
        args: Vec<Value>,
    ) -> ShellResult<Value> {
        ensure_count_range(api, &args, 1, 2)?;
        let port = match &args[0] {
            Value::Integer(port) if *port > 0 && *port <= u16::MAX as i64 => *port as u16,
            Value::UInteger(port) if *port > 0 && *port <= u16::MAX as u64 => *port as u16,
            _ => return Err(ShellError::argument_kind(api, 1, "valid port number")),
        };
        if let Some(options) = args.get(1) {
            if !matches!(options, Value::Map(_) | Value::Undefined) {
                return Err(ShellError::argument_kind(api, 2, "map"));
            }
        }
        self.admin.sandbox(operation, port)?;
        Ok(Value::Null)
    }
}

impl ObjectBridge for Dba {
    fn class_name(&self) -> &str {
        "Dba"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::method("createCluster"),
            Member::method("deleteSandboxInstance"),
            Member::method("deploySandboxInstance"),
            Member::method("getCluster"),
            Member::method("help"),
            Member::method("killSandboxInstance"),
            Member::method("resetSession"),
            Member::method("startSandboxInstance"),
            Member::method("checkInstanceConfiguration"),
            Member::method("stopSandboxInstance"),
            Member::method("dropMetadataSchema"),
            Member::method("configureLocalInstance"),
            Member::property("verbose"),
            Member::method("rebootClusterFromCompleteOutage"),
        ]
    }

    fn get_property(&self, name: &str) -> ShellResult<Value> {
        match name {
            "verbose" => Ok(Value::Bool(self.verbose.get())),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        match name {
            "createCluster" => self.create_cluster(args),
            "getCluster" => {
                let api = "Dba.getCluster";
                ensure_count_range(api, &args, 0, 1)?;
                let requested = match args.first() {
                    None | Some(Value::Undefined) | Some(Value::Null) => None,
                    Some(Value::String(name)) => Some(name.clone()),
                    Some(_) => return Err(ShellError::argument_kind(api, 1, "string")),
                };
                let name = self.admin.get_cluster(requested.as_deref())?;
                Ok(Value::Object(Cluster::new(&name)))
            }
            "deploySandboxInstance" => {
                self.sandbox_call("Dba.deploySandboxInstance", SandboxOperation::Deploy, args)
            }
            "startSandboxInstance" => {
                self.sandbox_call("Dba.startSandboxInstance", SandboxOperation::Start, args)
            }
            "stopSandboxInstance" => {
                self.sandbox_call("Dba.stopSandboxInstance", SandboxOperation::Stop, args)
            }
            "killSandboxInstance" => {
                self.sandbox_call("Dba.killSandboxInstance", SandboxOperation::Kill, args)
            }
            "deleteSandboxInstance" => {
                self.sandbox_call("Dba.deleteSandboxInstance", SandboxOperation::Delete, args)
            }
            "checkInstanceConfiguration" => {
                let api = "Dba.checkInstanceConfiguration";
                ensure_count_range(api, &args, 1, 2)?;
                let target = ConnectionData::from_value(&args[0], api)?;
                self.admin.check_instance_configuration(&target)?;
                let mut report = ValueMap::new();
                report.insert("status", Value::from("ok"));
                Ok(Value::map_from(report))
            }
            "configureLocalInstance" => {
                let api = "Dba.configureLocalInstance";
                ensure_count_range(api, &args, 0, 2)?;
                let target = match args.first() {
                    None | Some(Value::Undefined) => None,
                    Some(value) => Some(ConnectionData::from_value(value, api)?),
                };
                self.admin.configure_local_instance(target.as_ref())?;
                Ok(Value::Null)
            }
            "dropMetadataSchema" => {
                let api = "Dba.dropMetadataSchema";
                ensure_count_range(api, &args, 0, 1)?;
                self.admin.drop_metadata_schema()?;
                Ok(Value::Null)
            }
            "resetSession" => {
                let api = "Dba.resetSession";
                ensure_count_range(api, &args, 0, 1)?;
                if let Some(session) = args.first() {
                    if !matches!(session, Value::Object(_) | Value::Null | Value::Undefined) {
                        return Err(ShellError::argument_kind(api, 1, "session object"));
                    }
                }
                Ok(Value::Null)
            }
            "rebootClusterFromCompleteOutage" => {
                let api = "Dba.rebootClusterFromCompleteOutage";
                ensure_count_range(api, &args, 0, 2)?;
                let requested = match args.first() {
                    None | Some(Value::Undefined) | Some(Value::Null) => None,
                    Some(Value::String(name)) => Some(name.clone()),
                    Some(_) => return Err(ShellError::argument_kind(api, 1, "string")),
                };
                self.admin.reboot_cluster(requested.as_deref())?;
                let name = requested.unwrap_or_else(|| "devCluster".to_string());
                Ok(Value::Object(Cluster::new(&name)))
            }
            "help" => {
                ensure_count("Dba.help", &args, 0)?;
                Ok(Value::from(
                    "The dba module handles InnoDB cluster administration: \
                     cluster creation, sandbox instance management and \
                     instance configuration.",
                ))
            }
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
