// Object bridge protocol
// One polymorphic surface (class name, member table, property reads,
// method calls) exposed to every script runtime. Concrete bridges:
// sessions, result sets, schemas, CRUD builders, modules, expressions.

pub mod expression;

use std::any::Any;
use std::rc::Rc;

use crate::error::{ShellError, ShellResult};
use crate::value::{BridgeRef, NativeFunction, Value};

pub use expression::Expression;

/// How a member behaves when read through `get_member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Method,
}

/// One entry of a bridge's ordered member table.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
}

impl Member {
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Property,
        }
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
        }
    }
}

/// The uniform object surface.
///
/// Bridges are `Rc`-shared and single-threaded by construction: only one
/// script runtime is active at a time and a bridge call runs to completion
/// on the invoking thread, so no internal locking is needed.
pub trait ObjectBridge {
    fn class_name(&self) -> &str;

    /// Ordered member table; for stateful objects it reflects only the
    /// members legal in the current state.
    fn members(&self) -> Vec<Member>;

    /// Reads a data member. Method names are resolved by `get_member`, not
    /// here.
    fn get_property(&self, name: &str) -> ShellResult<Value> {
        Err(ShellError::unknown_member(self.class_name(), name))
    }

    /// Invokes a callable member.
    fn call(&self, name: &str, _args: Vec<Value>) -> ShellResult<Value> {
        Err(ShellError::unknown_member(self.class_name(), name))
    }

    /// Printed representation, e.g. `<Expression>`.
    fn append_descr(&self) -> String {
        format!("<{}>", self.class_name())
    }

    /// Concrete-type access for bridges that need downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Resolves a member: data members yield their value, callable members
/// yield a `Function` bound to the object, anything else is unknown.
pub fn get_member(object: &BridgeRef, name: &str) -> ShellResult<Value> {
    let member = object
        .members()
        .into_iter()
        .find(|m| m.name == name)
        .ok_or_else(|| ShellError::unknown_member(object.class_name(), name))?;
    match member.kind {
        MemberKind::Property => object.get_property(name),
        MemberKind::Method => Ok(Value::Function(Rc::new(BoundMethod {
            target: Rc::clone(object),
            method: name.to_string(),
        }))),
    }
}

pub fn has_member(object: &BridgeRef, name: &str) -> bool {
    object.members().iter().any(|m| m.name == name)
}

/// A callable member captured together with its receiver.
pub struct BoundMethod {
    target: BridgeRef,
    method: String,
}

impl NativeFunction for BoundMethod {
    fn name(&self) -> &str {
        &self.method
    }

    fn invoke(&self, args: Vec<Value>) -> ShellResult<Value> {
        self.target.call(&self.method, args)
    }
}

// ----------------------------------------------------------------------
// Argument validation shared by every bridge implementation
// ----------------------------------------------------------------------

pub fn ensure_count(api: &str, args: &[Value], expected: usize) -> ShellResult<()> {
    if args.len() != expected {
        return Err(ShellError::argument_count(api, expected, args.len()));
    }
    Ok(())
}

pub fn ensure_count_range(api: &str, args: &[Value], min: usize, max: usize) -> ShellResult<()> {
    if args.len() < min || args.len() > max {
        return Err(ShellError::argument_count_range(api, min, max, args.len()));
    }
    Ok(())
}

/// String at `index`; positions in messages are one-based.
pub fn string_arg(api: &str, args: &[Value], index: usize) -> ShellResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(ShellError::argument_kind(api, index + 1, "string")),
    }
}

pub fn int_arg(api: &str, args: &[Value], index: usize) -> ShellResult<i64> {
    match args.get(index) {
        Some(Value::Integer(i)) => Ok(*i),
        Some(Value::UInteger(u)) if *u <= i64::MAX as u64 => Ok(*u as i64),
        _ => Err(ShellError::argument_kind(api, index + 1, "number")),
    }
}

pub fn uint_arg(api: &str, args: &[Value], index: usize) -> ShellResult<u64> {
    match args.get(index) {
        Some(Value::UInteger(u)) => Ok(*u),
        Some(Value::Integer(i)) if *i >= 0 => Ok(*i as u64),
        _ => Err(ShellError::argument_kind(api, index + 1, "positive number")),
    }
}

/// Optional trailing bool, `default` when absent or undefined.
pub fn opt_bool_arg(api: &str, args: &[Value], index: usize, default: bool) -> ShellResult<bool> {
    match args.get(index) {
        None | Some(Value::Undefined) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        _ => Err(ShellError::argument_kind(api, index + 1, "bool")),
    }
}

pub fn map_arg(api: &str, args: &[Value], index: usize) -> ShellResult<crate::value::MapHandle> {
    match args.get(index) {
        Some(Value::Map(m)) => Ok(Rc::clone(m)),
        _ => Err(ShellError::argument_kind(api, index + 1, "map")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueMap;
    use std::cell::RefCell;

    struct Counter {
        count: RefCell<i64>,
    }

    impl ObjectBridge for Counter {
        fn class_name(&self) -> &str {
            "Counter"
        }

        fn members(&self) -> Vec<Member> {
            vec![Member::property("count"), Member::method("bump")]
        }

        fn get_property(&self, name: &str) -> ShellResult<Value> {
            match name {
                "count" => Ok(Value::Integer(*self.count.borrow())),
                other => Err(ShellError::unknown_member(self.class_name(), other)),
            }
        }

        fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
            match name {
                "bump" => {
                    ensure_count("Counter.bump", &args, 0)?;
                    *self.count.borrow_mut() += 1;
                    Ok(Value::Integer(*self.count.borrow()))
                }
                other => Err(ShellError::unknown_member(self.class_name(), other)),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn counter() -> BridgeRef {
        Rc::new(Counter {
            count: RefCell::new(0),
        })
    }

    #[test]
    fn test_property_read() {
        let obj = counter();
        assert_eq!(get_member(&obj, "count").unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_method_resolves_to_bound_function() {
        let obj = counter();
        let method = get_member(&obj, "bump").unwrap().as_function().unwrap();
        assert_eq!(method.name(), "bump");
        assert_eq!(method.invoke(vec![]).unwrap(), Value::Integer(1));
        // The binding targets the live object, not a copy.
        assert_eq!(get_member(&obj, "count").unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_unknown_member() {
        let obj = counter();
        let err = get_member(&obj, "missing").unwrap_err();
        assert_eq!(err.kind(), "UnknownMember");
        let err = obj.call("missing", vec![]).unwrap_err();
        assert_eq!(err.kind(), "UnknownMember");
    }

    #[test]
    fn test_arity_check_inside_call() {
        let obj = counter();
        let err = obj.call("bump", vec![Value::Null]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid number of arguments in Counter.bump, expected 0 but got 1"
        );
    }

    #[test]
    fn test_argument_helpers() {
        let args = vec![Value::from("text"), Value::Integer(3)];
        assert_eq!(string_arg("X.f", &args, 0).unwrap(), "text");
        assert_eq!(int_arg("X.f", &args, 1).unwrap(), 3);
        let err = string_arg("X.f", &args, 1).unwrap_err();
        assert_eq!(err.to_string(), "X.f: Argument #2 is expected to be a string");
        assert!(opt_bool_arg("X.f", &args, 5, true).unwrap());
        let map = Value::map_from(ValueMap::new());
        assert!(map_arg("X.f", &[map], 0).is_ok());
    }
}
