// Python adapter
// Native value model and marshaling for the Python surface. Reprs follow
// Python conventions: None/True/False, single-quoted strings inside
// containers, dir() sorted.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::bridge::ObjectBridge;
use crate::runtime::interp::{Interpreter, PY_DIALECT};
use crate::runtime::{Mode, ScriptError, ScriptRuntime};
use crate::value::{BridgeRef, FunctionRef, Value, ValueMap};

/// Python-side values as the adapter sees them.
#[derive(Clone)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    List(Vec<PyValue>),
    Dict(Vec<(String, PyValue)>),
    Bridge(BridgeRef),
    Function(FunctionRef),
    /// Absent-argument sentinel.
    Missing,
}

/// Python value to shell value; `None` maps to `Null`, the missing
/// sentinel to `Undefined`.
pub fn from_native(value: &PyValue) -> Value {
    match value {
        PyValue::None => Value::Null,
        PyValue::Missing => Value::Undefined,
        PyValue::Bool(b) => Value::Bool(*b),
        PyValue::Int(i) => Value::Integer(*i),
        PyValue::UInt(u) => Value::UInteger(*u),
        PyValue::Float(f) => Value::Float(*f),
        PyValue::Str(s) => Value::String(s.clone()),
        PyValue::List(items) => Value::array_from(items.iter().map(from_native).collect()),
        PyValue::Dict(entries) => {
            let mut map = ValueMap::new();
            for (key, item) in entries {
                map.insert(key.clone(), from_native(item));
            }
            Value::map_from(map)
        }
        PyValue::Bridge(bridge) => Value::Object(Rc::clone(bridge)),
        PyValue::Function(function) => Value::Function(Rc::clone(function)),
    }
}

/// Shell value to Python value; `Undefined` arrives as `None` since the
/// language has no undefined.
pub fn to_native(value: &Value) -> PyValue {
    match value {
        Value::Undefined | Value::Null => PyValue::None,
        Value::Bool(b) => PyValue::Bool(*b),
        Value::Integer(i) => PyValue::Int(*i),
        Value::UInteger(u) => PyValue::UInt(*u),
        Value::Float(f) => PyValue::Float(*f),
        Value::String(s) => PyValue::Str(s.clone()),
        Value::Array(items) => PyValue::List(items.borrow().iter().map(to_native).collect()),
        Value::Map(map) => PyValue::Dict(
            map.borrow()
                .iter()
                .map(|(key, item)| (key.to_string(), to_native(item)))
                .collect(),
        ),
        Value::MapRef(weak) => match weak.upgrade() {
            Some(map) => to_native(&Value::Map(map)),
            None => PyValue::None,
        },
        Value::Object(bridge) => PyValue::Bridge(Rc::clone(bridge)),
        Value::Function(function) => PyValue::Function(Rc::clone(function)),
    }
}

pub struct PyRuntime {
    globals: HashMap<String, Value>,
    output: RefCell<Vec<String>>,
}

impl PyRuntime {
    pub fn new() -> Self {
        Self {
            globals: HashMap::new(),
            output: RefCell::new(Vec::new()),
        }
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }
}

impl Default for PyRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(object) => object.append_descr(),
        other => py_repr(other),
    }
}

fn py_repr(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Array(items) => {
            let parts: Vec<String> = items.borrow().iter().map(py_repr).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Map(map) => {
            let parts: Vec<String> = map
                .borrow()
                .iter()
                .map(|(key, item)| format!("'{}': {}", key, py_repr(item)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::MapRef(weak) => match weak.upgrade() {
            Some(map) => py_repr(&Value::Map(map)),
            None => "None".to_string(),
        },
        Value::Object(object) => object.append_descr(),
        other => other.descr(),
    }
}

impl ScriptRuntime for PyRuntime {
    fn mode(&self) -> Mode {
        Mode::Python
    }

    fn install_module(&mut self, name: &str, module: BridgeRef) {
        self.globals.insert(name.to_string(), Value::Object(module));
    }

    fn evaluate(&mut self, text: &str) -> Result<Value, ScriptError> {
        let describe = describe_value;
        let interpreter = Interpreter {
            dialect: &PY_DIALECT,
            describe: &describe,
            output: &self.output,
        };
        interpreter
            .evaluate(&mut self.globals, text)
            .map_err(ScriptError::from)
    }

    fn describe(&self, value: &Value) -> String {
        describe_value(value)
    }

    fn take_output(&mut self) -> Vec<String> {
        std::mem::take(self.output.get_mut())
    }
}
