// Shell core
// Owns the driver registry, the session tracker, the module bridges and
// the current input mode. Mode switches are synchronous: they reset the
// statement buffer and nothing else.

use std::rc::Rc;

use tracing::{debug, info};

use crate::db::backend::DriverRegistry;
use crate::db::drivers::default_registry;
use crate::db::session::{Session, SessionTracker};
use crate::modules::{Dba, MysqlModule, MysqlxModule, NoopClusterAdmin};
use crate::runtime::{JsRuntime, Mode, PyRuntime, ScriptError, ScriptRuntime};
use crate::value::{BridgeRef, Value};

pub struct Shell {
    mode: Mode,
    buffer: String,
    js: JsRuntime,
    python: PyRuntime,
    registry: Rc<DriverRegistry>,
    tracker: Rc<SessionTracker>,
    dba: Rc<Dba>,
    current_session: Option<Rc<Session>>,
}

impl Shell {
    /// Builds a shell over the given drivers, with the module surface
    /// installed into both script runtimes.
    pub fn new(registry: Rc<DriverRegistry>) -> Shell {
        let tracker = Rc::new(SessionTracker::new());
        let mysql: BridgeRef = MysqlModule::new(Rc::clone(&registry), Rc::clone(&tracker));
        let mysqlx: BridgeRef = MysqlxModule::new(Rc::clone(&registry), Rc::clone(&tracker));
        let dba = Dba::new(Rc::new(NoopClusterAdmin::default()));
        let dba_bridge: BridgeRef = Rc::<Dba>::clone(&dba) as BridgeRef;

        let mut js = JsRuntime::new();
        let mut python = PyRuntime::new();
        for runtime in [&mut js as &mut dyn ScriptRuntime, &mut python] {
            runtime.install_module("mysql", Rc::clone(&mysql));
            runtime.install_module("mysqlx", Rc::clone(&mysqlx));
            runtime.install_module("dba", Rc::clone(&dba_bridge));
        }
        debug!("shell initialized with mysql, mysqlx and dba modules");

        Shell {
            mode: Mode::JavaScript,
            buffer: String::new(),
            js,
            python,
            registry,
            tracker,
            dba,
            current_session: None,
        }
    }

    /// Shell over the built-in memory driver.
    pub fn with_default_drivers() -> Shell {
        Shell::new(default_registry())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Synchronous mode switch; drops any partially entered statement,
    /// keeps every session and global alive.
    pub fn switch_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!(from = self.mode.name(), to = mode.name(), "switching mode");
            self.mode = mode;
            self.buffer.clear();
        }
    }

    pub fn statement_buffer(&self) -> &str {
        &self.buffer
    }

    pub fn append_to_buffer(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn registry(&self) -> &Rc<DriverRegistry> {
        &self.registry
    }

    pub fn dba(&self) -> &Rc<Dba> {
        &self.dba
    }

    pub fn set_current_session(&mut self, session: Rc<Session>) {
        self.tracker.track(&session);
        self.current_session = Some(session);
    }

    pub fn current_session(&self) -> Option<&Rc<Session>> {
        self.current_session.as_ref()
    }

    /// Runs one statement in the current mode.
    pub fn execute(&mut self, text: &str) -> Result<Value, ScriptError> {
        match self.mode {
            Mode::JavaScript => self.js.evaluate(text),
            Mode::Python => self.python.evaluate(text),
            Mode::Sql => {
                let session = self
                    .current_session
                    .as_ref()
                    .ok_or_else(|| ScriptError::new("Internal", "Not connected."))?;
                let result = session.sql(text, &Value::Undefined)?;
                Ok(Value::Object(result))
            }
        }
    }

    /// The active runtime, when the mode has one (SQL does not).
    pub fn active_runtime(&mut self) -> Option<&mut dyn ScriptRuntime> {
        match self.mode {
            Mode::JavaScript => Some(&mut self.js),
            Mode::Python => Some(&mut self.python),
            Mode::Sql => None,
        }
    }

    /// Drains the print output of the active runtime.
    pub fn take_output(&mut self) -> Vec<String> {
        self.active_runtime()
            .map(|runtime| runtime.take_output())
            .unwrap_or_default()
    }

    /// Force-closes every session still open; used at shell exit.
    pub fn shutdown(&mut self) -> usize {
        let closed = self.tracker.close_all();
        if closed > 0 {
            info!(closed, "closed sessions left open at exit");
        }
        self.current_session = None;
        closed
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.tracker.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ObjectBridge;

    #[test]
    fn test_mode_switch_resets_buffer_only() {
        let mut shell = Shell::with_default_drivers();
        shell
            .execute("session = mysqlx.getSession('root@localhost')")
            .unwrap();
        shell.append_to_buffer("select 1");
        shell.switch_mode(Mode::Python);
        assert_eq!(shell.statement_buffer(), "");
        assert_eq!(shell.mode(), Mode::Python);

        // The JavaScript global survives the switch.
        shell.switch_mode(Mode::JavaScript);
        let value = shell.execute("session.uri").unwrap();
        assert_eq!(value, Value::from("root@localhost"));
    }

    #[test]
    fn test_modules_installed_in_both_runtimes() {
        let mut shell = Shell::with_default_drivers();
        for mode in [Mode::JavaScript, Mode::Python] {
            shell.switch_mode(mode);
            for module in ["mysql", "mysqlx", "dba"] {
                let value = shell.execute(&format!("dir({})", module)).unwrap();
                assert!(!value.as_array().unwrap().borrow().is_empty());
            }
        }
    }

    #[test]
    fn test_sql_mode_uses_current_session() {
        let mut shell = Shell::with_default_drivers();
        shell.switch_mode(Mode::Sql);
        let err = shell.execute("select 1").unwrap_err();
        assert_eq!(err.message, "Not connected.");

        let session = crate::db::session::Session::connect(
            crate::db::session::SessionKind::Node,
            crate::uri::ConnectionData::parse("root@localhost").unwrap(),
            shell.registry(),
        )
        .unwrap();
        shell.set_current_session(session);
        shell.switch_mode(Mode::Sql);
        let result = shell.execute("select 1 as sample").unwrap();
        let result = result.as_object().unwrap();
        assert_eq!(
            result.call("next", vec![]).unwrap().descr(),
            "{\"sample\": 1}"
        );
    }

    #[test]
    fn test_shutdown_closes_tracked_sessions() {
        let mut shell = Shell::with_default_drivers();
        shell
            .execute("session = mysqlx.getSession('root@localhost')")
            .unwrap();
        assert_eq!(shell.shutdown(), 1);
        let err = shell.execute("session.sql('select 1')").unwrap_err();
        assert_eq!(err.kind, "SessionClosed");
    }

    #[test]
    fn test_print_output_per_runtime() {
        let mut shell = Shell::with_default_drivers();
        shell
            .execute("session = mysqlx.getSession('root:pwd@localhost:33060')")
            .unwrap();
        shell.execute("print(session)").unwrap();
        assert_eq!(
            shell.take_output(),
            vec!["<XSession:root@localhost:33060>".to_string()]
        );
    }
}
