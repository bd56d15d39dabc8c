// JavaScript adapter
// Native value model and marshaling for the JavaScript surface, plus the
// statement evaluator wired to the JS dialect.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::bridge::ObjectBridge;
use crate::runtime::interp::{Interpreter, JS_DIALECT};
use crate::runtime::{Mode, ScriptError, ScriptRuntime};
use crate::value::{BridgeRef, FunctionRef, Value, ValueMap};

/// JavaScript-side values as the adapter sees them.
#[derive(Clone)]
pub enum JsValue {
    /// The engine's `undefined`.
    Undefined,
    Null,
    Bool(bool),
    Integer(i64),
    UInteger(u64),
    Float(f64),
    String(String),
    Array(Vec<JsValue>),
    Object(Vec<(String, JsValue)>),
    Bridge(BridgeRef),
    Function(FunctionRef),
    /// Absent-argument sentinel, distinct from `undefined`.
    Missing,
}

/// JavaScript value to shell value. `undefined` and `null` both map to
/// `Null`; only the missing-argument sentinel produces `Undefined`.
pub fn from_native(value: &JsValue) -> Value {
    match value {
        JsValue::Undefined | JsValue::Null => Value::Null,
        JsValue::Missing => Value::Undefined,
        JsValue::Bool(b) => Value::Bool(*b),
        JsValue::Integer(i) => Value::Integer(*i),
        JsValue::UInteger(u) => Value::UInteger(*u),
        JsValue::Float(f) => Value::Float(*f),
        JsValue::String(s) => Value::String(s.clone()),
        JsValue::Array(items) => {
            Value::array_from(items.iter().map(from_native).collect())
        }
        JsValue::Object(entries) => {
            let mut map = ValueMap::new();
            for (key, item) in entries {
                map.insert(key.clone(), from_native(item));
            }
            Value::map_from(map)
        }
        JsValue::Bridge(bridge) => Value::Object(Rc::clone(bridge)),
        JsValue::Function(function) => Value::Function(Rc::clone(function)),
    }
}

/// Shell value to JavaScript value.
pub fn to_native(value: &Value) -> JsValue {
    match value {
        Value::Undefined => JsValue::Undefined,
        Value::Null => JsValue::Null,
        Value::Bool(b) => JsValue::Bool(*b),
        Value::Integer(i) => JsValue::Integer(*i),
        Value::UInteger(u) => JsValue::UInteger(*u),
        Value::Float(f) => JsValue::Float(*f),
        Value::String(s) => JsValue::String(s.clone()),
        Value::Array(items) => {
            JsValue::Array(items.borrow().iter().map(to_native).collect())
        }
        Value::Map(map) => JsValue::Object(
            map.borrow()
                .iter()
                .map(|(key, item)| (key.to_string(), to_native(item)))
                .collect(),
        ),
        Value::MapRef(weak) => match weak.upgrade() {
            Some(map) => to_native(&Value::Map(map)),
            None => JsValue::Undefined,
        },
        Value::Object(bridge) => JsValue::Bridge(Rc::clone(bridge)),
        Value::Function(function) => JsValue::Function(Rc::clone(function)),
    }
}

pub struct JsRuntime {
    globals: HashMap<String, Value>,
    output: RefCell<Vec<String>>,
}

impl JsRuntime {
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

impl Default for JsRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::String(s) => s.clone(),
        Value::Object(object) => object.append_descr(),
        other => other.descr(),
    }
}

impl ScriptRuntime for JsRuntime {
    fn mode(&self) -> Mode {
        Mode::JavaScript
    }

    fn install_module(&mut self, name: &str, module: BridgeRef) {
        self.globals.insert(name.to_string(), Value::Object(module));
    }

    fn evaluate(&mut self, text: &str) -> Result<Value, ScriptError> {
        let describe = describe_value;
        let interpreter = Interpreter {
            dialect: &JS_DIALECT,
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
