// Session bridge
// Owns the driver connection and the last open result. Classic and X
// flavors share the implementation; they differ in class name, default
// port and scheme.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use chrono::Utc;
use tracing::debug;

use crate::bridge::{ensure_count, ensure_count_range, string_arg, Member, ObjectBridge};
use crate::db::backend::{
    expand_placeholders, CrudRequest, DriverRegistry, ServerConnection, StatementReply,
};
use crate::db::resultset::ResultSet;
use crate::db::schema::Schema;
use crate::error::{ShellError, ShellResult};
use crate::uri::{ConnectionData, DEFAULT_CLASSIC_PORT, DEFAULT_X_PORT};
use crate::uuid_gen::UuidGenerator;
use crate::value::Value;

/// Session flavor; the protocol difference is a driver concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Classic,
    X,
    Node,
}

impl SessionKind {
    pub fn class_name(&self) -> &'static str {
        match self {
            SessionKind::Classic => "ClassicSession",
            SessionKind::X => "XSession",
            SessionKind::Node => "NodeSession",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            SessionKind::Classic => DEFAULT_CLASSIC_PORT,
            SessionKind::X | SessionKind::Node => DEFAULT_X_PORT,
        }
    }

    pub fn default_scheme(&self) -> &'static str {
        match self {
            SessionKind::Classic => "mysql",
            SessionKind::X | SessionKind::Node => "mysqlx",
        }
    }
}

pub struct Session {
    kind: SessionKind,
    data: ConnectionData,
    connection: RefCell<Option<Box<dyn ServerConnection>>>,
    last_result: RefCell<Weak<ResultSet>>,
    strict_results: Cell<bool>,
    ids: UuidGenerator,
    me: RefCell<Weak<Session>>,
}

impl Session {
    /// Opens a connection through the registered driver for the scheme.
    pub fn connect(
        kind: SessionKind,
        data: ConnectionData,
        registry: &DriverRegistry,
    ) -> ShellResult<Rc<Session>> {
        let scheme = data
            .scheme
            .clone()
            .unwrap_or_else(|| kind.default_scheme().to_string());
        let driver = registry.get(&scheme)?;
        let connection = driver.connect(&data, kind.default_port())?;
        debug!(
            class = kind.class_name(),
            target = %data.display_uri(),
            "session opened"
        );
        let seed = (Utc::now().timestamp_micros().max(0) as u64) ^ (std::process::id() as u64);
        let session = Rc::new(Session {
            kind,
            data,
            connection: RefCell::new(Some(connection)),
            last_result: RefCell::new(Weak::new()),
            strict_results: Cell::new(false),
            ids: UuidGenerator::init(seed),
            me: RefCell::new(Weak::new()),
        });
        *session.me.borrow_mut() = Rc::downgrade(&session);
        Ok(session)
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn is_open(&self) -> bool {
        self.connection.borrow().is_some()
    }

    /// Password-stripped canonical URI.
    pub fn uri(&self) -> String {
        self.data.display_uri()
    }

    /// When set, executing over a still-open result fails instead of
    /// silently discarding it.
    pub fn set_strict_result_checks(&self, strict: bool) {
        self.strict_results.set(strict);
    }

    fn api(&self, method: &str) -> String {
        format!("{}.{}", self.kind.class_name(), method)
    }

    fn run(
        &self,
        api: &str,
        request: impl FnOnce(&mut dyn ServerConnection) -> ShellResult<StatementReply>,
    ) -> ShellResult<Rc<ResultSet>> {
        let mut guard = self.connection.borrow_mut();
        let connection = guard
            .as_mut()
            .ok_or_else(|| ShellError::session_closed(api))?;
        if let Some(previous) = self.last_result.borrow().upgrade() {
            if self.strict_results.get() {
                return Err(ShellError::ResultLeak(format!(
                    "{}: The previous result is still open",
                    api
                )));
            }
            previous.invalidate();
        }
        let reply = request(connection.as_mut())?;
        drop(guard);
        let result = ResultSet::new(self.me.borrow().clone(), reply);
        *self.last_result.borrow_mut() = Rc::downgrade(&result);
        Ok(result)
    }

    /// Executes a statement; `params` binds `?` positionals (array) or
    /// `:name` markers (map).
    pub fn sql(&self, statement: &str, params: &Value) -> ShellResult<Rc<ResultSet>> {
        let api = self.api("sql");
        let expanded = expand_placeholders(&api, statement, params)?;
        debug!(statement = %expanded, "executing sql");
        self.run(&api, |connection| connection.execute(&expanded))
    }

    /// Executes and fetches exactly one row as a map; `Null` on an empty
    /// result, an error when a second row exists.
    pub fn sql_one(&self, statement: &str) -> ShellResult<Value> {
        let api = self.api("sql_one");
        let result = self.sql(statement, &Value::Undefined)?;
        let row = result.next_row(false);
        let extra = result.next_row(false);
        result.invalidate();
        if !extra.is_null() {
            return Err(ShellError::ResultShapeError(format!(
                "{}: The result contains more than one row",
                api
            )));
        }
        Ok(row)
    }

    /// Runs a builder-produced CRUD request.
    pub fn execute_crud(&self, api: &str, request: &CrudRequest) -> ShellResult<Rc<ResultSet>> {
        self.run(api, |connection| connection.execute_crud(request))
    }

    /// Advances `result` to its next block.
    pub fn next_result(&self, result: &ResultSet) -> ShellResult<bool> {
        if !self.is_open() {
            return Err(ShellError::session_closed(&self.api("next_result")));
        }
        Ok(result.next_result())
    }

    /// Idempotent; errors from the driver are ignored on purpose.
    pub fn close(&self) {
        if let Some(mut connection) = self.connection.borrow_mut().take() {
            connection.close();
            self.ids.shutdown();
            debug!(class = self.kind.class_name(), "session closed");
        }
    }

    /// Interrupts the in-flight request at the driver's granularity.
    pub fn interrupt(&self) -> ShellResult<()> {
        let mut guard = self.connection.borrow_mut();
        let connection = guard
            .as_mut()
            .ok_or_else(|| ShellError::session_closed(&self.api("interrupt")))?;
        connection.cancel()
    }

    pub fn get_schema(&self, name: &str) -> ShellResult<Rc<Schema>> {
        if !self.is_open() {
            return Err(ShellError::session_closed(&self.api("getSchema")));
        }
        Ok(Schema::new(self.me.borrow().clone(), name))
    }

    pub fn default_schema(&self) -> Option<Rc<Schema>> {
        self.data
            .schema
            .as_ref()
            .map(|name| Schema::new(self.me.borrow().clone(), name))
    }

    /// Fresh document id for collection inserts.
    pub fn generate_document_id(&self) -> ShellResult<String> {
        if !self.is_open() {
            return Err(ShellError::session_closed(
                &self.api("generate_document_id"),
            ));
        }
        let bytes = self.ids.generate()?;
        let mut out = String::with_capacity(32);
        for byte in bytes {
            out.push_str(&format!("{:02x}", byte));
        }
        Ok(out)
    }

    /// Printed member overview used by the interactive prompt.
    pub fn members_banner(&self) -> String {
        format!("<Session Members: {}>", self.members().len())
    }
}

impl ObjectBridge for Session {
    fn class_name(&self) -> &str {
        self.kind.class_name()
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::property("uri"),
            Member::property("defaultSchema"),
            Member::method("sql"),
            Member::method("sql_one"),
            Member::method("close"),
            Member::method("next_result"),
            Member::method("getSchema"),
        ]
    }

    fn get_property(&self, name: &str) -> ShellResult<Value> {
        match name {
            "uri" => Ok(Value::from(self.uri())),
            "defaultSchema" => Ok(match self.default_schema() {
                Some(schema) => Value::Object(schema),
                None => Value::Null,
            }),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        match name {
            "sql" => {
                let api = self.api("sql");
                ensure_count_range(&api, &args, 1, 2)?;
                let statement = string_arg(&api, &args, 0)?;
                let params = args.get(1).cloned().unwrap_or(Value::Undefined);
                let result = self.sql(&statement, &params)?;
                Ok(Value::Object(result))
            }
            "sql_one" => {
                let api = self.api("sql_one");
                ensure_count(&api, &args, 1)?;
                let statement = string_arg(&api, &args, 0)?;
                self.sql_one(&statement)
            }
            "close" => {
                ensure_count(&self.api("close"), &args, 0)?;
                self.close();
                Ok(Value::Null)
            }
            "next_result" => {
                let api = self.api("next_result");
                ensure_count(&api, &args, 1)?;
                let object = args[0]
                    .as_object()
                    .map_err(|_| ShellError::argument_kind(&api, 1, "Result object"))?;
                let result = object
                    .as_any()
                    .downcast_ref::<ResultSet>()
                    .ok_or_else(|| ShellError::argument_kind(&api, 1, "Result object"))?;
                Ok(Value::Bool(self.next_result(result)?))
            }
            "getSchema" => {
                let api = self.api("getSchema");
                ensure_count(&api, &args, 1)?;
                let name = string_arg(&api, &args, 0)?;
                Ok(Value::Object(self.get_schema(&name)?))
            }
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn append_descr(&self) -> String {
        format!("<{}:{}>", self.class_name(), self.uri())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Keeps weak handles on every session the factories produce so the shell
/// can force-close survivors on exit.
#[derive(Default)]
pub struct SessionTracker {
    sessions: RefCell<Vec<Weak<Session>>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, session: &Rc<Session>) {
        let mut sessions = self.sessions.borrow_mut();
        sessions.retain(|weak| weak.upgrade().is_some());
        sessions.push(Rc::downgrade(session));
    }

    /// Closes every session still alive; returns how many were open.
    pub fn close_all(&self) -> usize {
        let mut closed = 0;
        for weak in self.sessions.borrow_mut().drain(..) {
            if let Some(session) = weak.upgrade() {
                if session.is_open() {
                    session.close();
                    closed += 1;
                }
            }
        }
        closed
    }
}

/// Builds the connection data for a factory call: URI or map, plus an
/// optional explicit password overriding whatever the data carried.
pub fn connection_data_from_args(api: &str, args: &[Value]) -> ShellResult<ConnectionData> {
    ensure_count_range(api, args, 1, 2)?;
    let mut data = ConnectionData::from_value(&args[0], api)?;
    if args.len() == 2 {
        match &args[1] {
            Value::String(password) => {
                data.password = Some(password.clone());
                data.password_found = true;
            }
            _ => return Err(ShellError::argument_kind(api, 2, "string")),
        }
    }
    Ok(data)
}
