// mysql module
// Classic-protocol entry point: getClassicSession plus help.

use std::any::Any;
use std::rc::Rc;

use crate::bridge::{ensure_count, Member, ObjectBridge};
use crate::db::backend::DriverRegistry;
use crate::db::session::{connection_data_from_args, Session, SessionKind, SessionTracker};
use crate::error::{ShellError, ShellResult};
use crate::value::Value;

pub struct MysqlModule {
    registry: Rc<DriverRegistry>,
    tracker: Rc<SessionTracker>,
}

impl MysqlModule {
    pub fn new(registry: Rc<DriverRegistry>, tracker: Rc<SessionTracker>) -> Rc<MysqlModule> {
        Rc::new(MysqlModule { registry, tracker })
    }
}

impl ObjectBridge for MysqlModule {
    fn class_name(&self) -> &str {
        "mysql"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::method("getClassicSession"),
            Member::method("help"),
        ]
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        match name {
            "getClassicSession" => {
                let data = connection_data_from_args("mysql.getClassicSession", &args)?;
                let session = Session::connect(SessionKind::Classic, data, &self.registry)?;
                self.tracker.track(&session);
                Ok(Value::Object(session))
            }
            "help" => {
                ensure_count("mysql.help", &args, 0)?;
                Ok(Value::from(
                    "The mysql module gives access to classic protocol sessions.\n\
                     \n\
                     getClassicSession(connectionData[, password])\n\
                     \x20   Opens a ClassicSession against the given server.\n\
                     help()\n\
                     \x20   Prints this text.",
                ))
            }
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
    use crate::bridge::get_member;
    use crate::db::drivers::default_registry;
    use crate::value::BridgeRef;

    fn module() -> BridgeRef {
        MysqlModule::new(default_registry(), Rc::new(SessionTracker::new()))
    }

    #[test]
    fn test_members() {
        let module = module();
        let names: Vec<String> = module.members().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["getClassicSession", "help"]);
    }

    #[test]
    fn test_get_classic_session() {
        let module = module();
        let session = module
            .call("getClassicSession", vec![Value::from("root:pwd@localhost:3306")])
            .unwrap();
        let object = session.as_object().unwrap();
        assert_eq!(object.append_descr(), "<ClassicSession:root@localhost:3306>");
        assert_eq!(
            get_member(&object, "uri").unwrap(),
            Value::from("root@localhost:3306")
        );
    }

    #[test]
    fn test_argument_validation() {
        let module = module();
        let err = module.call("getClassicSession", vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid number of arguments in mysql.getClassicSession, expected 1 to 2 but got 0"
        );
        let err = module
            .call("getClassicSession", vec![Value::Integer(1)])
            .unwrap_err();
        assert_eq!(err.kind(), "ArgumentError");
    }

    #[test]
    fn test_help() {
        let module = module();
        let text = module.call("help", vec![]).unwrap();
        assert!(text.as_string().unwrap().contains("getClassicSession"));
    }
}
