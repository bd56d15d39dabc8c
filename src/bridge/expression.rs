// Expression bridge
// Wraps a server-side expression string so builders can tell it apart
// from a plain literal.

use std::any::Any;
use std::rc::Rc;

use crate::bridge::{ensure_count, string_arg, Member, ObjectBridge};
use crate::error::{ShellError, ShellResult};
use crate::value::{BridgeRef, Value};

pub struct Expression {
    data: String,
}

impl Expression {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    /// Factory behind `mysqlx.expr(text)`.
    pub fn create(args: Vec<Value>) -> ShellResult<Value> {
        ensure_count("mysqlx.expr", &args, 1)?;
        let data = string_arg("mysqlx.expr", &args, 0)?;
        Ok(Value::Object(Rc::new(Expression::new(data))))
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Downcast helper used wherever an expression is accepted in place
    /// of a literal.
    pub fn from_bridge(bridge: &BridgeRef) -> Option<&Expression> {
        bridge.as_any().downcast_ref::<Expression>()
    }
}

impl ObjectBridge for Expression {
    fn class_name(&self) -> &str {
        "Expression"
    }

    fn members(&self) -> Vec<Member> {
        vec![Member::property("data")]
    }

    fn get_property(&self, name: &str) -> ShellResult<Value> {
        match name {
            "data" => Ok(Value::String(self.data.clone())),
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

    #[test]
    fn test_create_and_print() {
        let value = Expression::create(vec![Value::from("5+6")]).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.append_descr(), "<Expression>");
        assert_eq!(
            get_member(&object, "data").unwrap(),
            Value::from("5+6")
        );
    }

    #[test]
    fn test_create_argument_errors() {
        let err = Expression::create(vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid number of arguments in mysqlx.expr, expected 1 but got 0"
        );
        let err = Expression::create(vec![Value::Integer(5)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "mysqlx.expr: Argument #1 is expected to be a string"
        );
    }

    #[test]
    fn test_downcast() {
        let value = Expression::create(vec![Value::from("a > 1")]).unwrap();
        let object = value.as_object().unwrap();
        let expr = Expression::from_bridge(&object).unwrap();
        assert_eq!(expr.data(), "a > 1");
    }
}
