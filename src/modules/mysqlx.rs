// mysqlx module
// X-Protocol entry points: getSession, getNodeSession and expr.

use std::any::Any;
use std::rc::Rc;

use crate::bridge::{Expression, Member, ObjectBridge};
use crate::db::backend::DriverRegistry;
use crate::db::session::{connection_data_from_args, Session, SessionKind, SessionTracker};
use crate::error::{ShellError, ShellResult};
use crate::value::Value;

pub struct MysqlxModule {
    registry: Rc<DriverRegistry>,
    tracker: Rc<SessionTracker>,
}

impl MysqlxModule {
    pub fn new(registry: Rc<DriverRegistry>, tracker: Rc<SessionTracker>) -> Rc<MysqlxModule> {
        Rc::new(MysqlxModule { registry, tracker })
    }

    fn open_session(&self, kind: SessionKind, api: &str, args: Vec<Value>) -> ShellResult<Value> {
        let data = connection_data_from_args(api, &args)?;
        let session = Session::connect(kind, data, &self.registry)?;
        self.tracker.track(&session);
        Ok(Value::Object(session))
    }
}

impl ObjectBridge for MysqlxModule {
    fn class_name(&self) -> &str {
        "mysqlx"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::method("getSession"),
            Member::method("getNodeSession"),
            Member::method("expr"),
        ]
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        match name {
            "getSession" => self.open_session(SessionKind::X, "mysqlx.getSession", args),
            "getNodeSession" => {
                self.open_session(SessionKind::Node, "mysqlx.getNodeSession", args)
            }
            "expr" => Expression::create(args),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::drivers::default_registry;
    use crate::value::{BridgeRef, ValueMap};

    fn module() -> BridgeRef {
        MysqlxModule::new(default_registry(), Rc::new(SessionTracker::new()))
    }

    #[test]
    fn test_members() {
        let module = module();
        let names: Vec<String> = module.members().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["getSession", "getNodeSession", "expr"]);
    }

    #[test]
    fn test_session_factories() {
        let module = module();
        let session = module
            .call("getSession", vec![Value::from("root:pwd@localhost")])
            .unwrap();
        assert_eq!(
            session.as_object().unwrap().append_descr(),
            "<XSession:root@localhost>"
        );

        let node = module
            .call("getNodeSession", vec![Value::from("root@localhost:33060")])
            .unwrap();
        assert_eq!(
            node.as_object().unwrap().append_descr(),
            "<NodeSession:root@localhost:33060>"
        );
    }

    #[test]
    fn test_session_from_connection_data() {
        let module = module();
        let mut map = ValueMap::new();
        map.insert("host", Value::from("localhost"));
        map.insert("port", Value::Integer(33060));
        map.insert("schema", Value::from("world"));
        map.insert("dbUser", Value::from("root"));
        let session = module
            .call(
                "getSession",
                vec![Value::map_from(map), Value::from("secret")],
            )
            .unwrap();
        assert_eq!(
            session.as_object().unwrap().append_descr(),
            "<XSession:root@localhost:33060/world>"
        );
    }

    #[test]
    fn test_expr() {
        let module = module();
        let expr = module.call("expr", vec![Value::from("5+6")]).unwrap();
        assert_eq!(expr.as_object().unwrap().append_descr(), "<Expression>");

        let err = module.call("expr", vec![Value::Integer(5)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "mysqlx.expr: Argument #1 is expected to be a string"
        );
    }
}
