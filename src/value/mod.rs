// Tagged value model
// The dynamic value shared by the SQL, JavaScript and Python surfaces.
// Containers are reference counted; cloning a Value never deep-copies.

pub mod mapper;
pub mod parser;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bridge::ObjectBridge;
use crate::error::{ShellError, ShellResult};

pub use mapper::{map_table_value, TableValue};

/// Shared array payload.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
/// Shared map payload.
pub type MapHandle = Rc<RefCell<ValueMap>>;
/// Weak map payload, the only non-owning variant.
pub type MapWeak = Weak<RefCell<ValueMap>>;
/// Shared bridge handle.
pub type BridgeRef = Rc<dyn ObjectBridge>;
/// Shared callable handle.
pub type FunctionRef = Rc<dyn NativeFunction>;

/// A callable exposed to the script runtimes.
pub trait NativeFunction {
    fn name(&self) -> &str;
    fn invoke(&self, args: Vec<Value>) -> ShellResult<Value>;
}

/// String-keyed map preserving insertion order.
///
/// Lookups are linear; shell maps are rows, option sets and member tables,
/// all small. `descr` emission sorts keys, iteration does not.
#[derive(Default, Clone)]
pub struct ValueMap {
    entries: Vec<(String, Value)>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Inserts or replaces; replacement keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl PartialEq for ValueMap {
    // Content equality, insensitive to insertion order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map(|o| o == v).unwrap_or(false))
    }
}

impl fmt::Debug for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        append_map_descr(&mut out, self);
        f.write_str(&out)
    }
}

/// Discriminant of a `Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Undefined,
    Null,
    Bool,
    Integer,
    UInteger,
    Float,
    String,
    Object,
    Array,
    Map,
    MapRef,
    Function,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Undefined => "Undefined",
            ValueType::Null => "Null",
            ValueType::Bool => "Bool",
            ValueType::Integer => "Integer",
            ValueType::UInteger => "UInteger",
            ValueType::Float => "Float",
            ValueType::String => "String",
            ValueType::Object => "Object",
            ValueType::Array => "Array",
            ValueType::Map => "Map",
            ValueType::MapRef => "MapRef",
            ValueType::Function => "Function",
        }
    }
}

/// The universal shell value.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Integer(i64),
    UInteger(u64),
    Float(f64),
    String(String),
    Object(BridgeRef),
    Array(ArrayRef),
    Map(MapHandle),
    MapRef(MapWeak),
    Function(FunctionRef),
}

impl Value {
    /// Fresh empty shared array.
    pub fn new_array() -> Value {
        Value::Array(Rc::new(RefCell::new(Vec::new())))
    }

    /// Fresh empty shared map.
    pub fn new_map() -> Value {
        Value::Map(Rc::new(RefCell::new(ValueMap::new())))
    }

    pub fn array_from(values: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(values)))
    }

    pub fn map_from(map: ValueMap) -> Value {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    pub fn object(bridge: BridgeRef) -> Value {
        Value::Object(bridge)
    }

    /// Weak view of a shared map; resolves to `Undefined` once released.
    pub fn weak_ref(map: &MapHandle) -> Value {
        Value::MapRef(Rc::downgrade(map))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Undefined => ValueType::Undefined,
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Integer(_) => ValueType::Integer,
            Value::UInteger(_) => ValueType::UInteger,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Object(_) => ValueType::Object,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
            Value::MapRef(_) => ValueType::MapRef,
            Value::Function(_) => ValueType::Function,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    // ------------------------------------------------------------------
    // Typed extraction. Strict: the variant must match.
    // ------------------------------------------------------------------

    pub fn as_bool(&self) -> ShellResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(ShellError::type_mismatch("Bool", other.type_name())),
        }
    }

    pub fn as_int(&self) -> ShellResult<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            other => Err(ShellError::type_mismatch("Integer", other.type_name())),
        }
    }

    pub fn as_uint(&self) -> ShellResult<u64> {
        match self {
            Value::UInteger(u) => Ok(*u),
            other => Err(ShellError::type_mismatch("UInteger", other.type_name())),
        }
    }

    pub fn as_double(&self) -> ShellResult<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            other => Err(ShellError::type_mismatch("Float", other.type_name())),
        }
    }

    pub fn as_string(&self) -> ShellResult<&str> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(ShellError::type_mismatch("String", other.type_name())),
        }
    }

    pub fn as_object(&self) -> ShellResult<BridgeRef> {
        match self {
            Value::Object(o) => Ok(Rc::clone(o)),
            other => Err(ShellError::type_mismatch("Object", other.type_name())),
        }
    }

    pub fn as_array(&self) -> ShellResult<ArrayRef> {
        match self {
            Value::Array(a) => Ok(Rc::clone(a)),
            other => Err(ShellError::type_mismatch("Array", other.type_name())),
        }
    }

    pub fn as_map(&self) -> ShellResult<MapHandle> {
        match self {
            Value::Map(m) => Ok(Rc::clone(m)),
            other => Err(ShellError::type_mismatch("Map", other.type_name())),
        }
    }

    pub fn as_function(&self) -> ShellResult<FunctionRef> {
        match self {
            Value::Function(f) => Ok(Rc::clone(f)),
            other => Err(ShellError::type_mismatch("Function", other.type_name())),
        }
    }

    // ------------------------------------------------------------------
    // Explicit numeric conversion. Never silent; fails on range loss.
    // ------------------------------------------------------------------

    pub fn to_int(&self) -> ShellResult<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            Value::UInteger(u) => i64::try_from(*u)
                .map_err(|_| ShellError::type_mismatch("Integer", "UInteger out of range")),
            other => Err(ShellError::type_mismatch("Integer", other.type_name())),
        }
    }

    pub fn to_uint(&self) -> ShellResult<u64> {
        match self {
            Value::UInteger(u) => Ok(*u),
            Value::Integer(i) => u64::try_from(*i)
                .map_err(|_| ShellError::type_mismatch("UInteger", "negative Integer")),
            other => Err(ShellError::type_mismatch("UInteger", other.type_name())),
        }
    }

    pub fn to_double(&self) -> ShellResult<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            Value::UInteger(u) => Ok(*u as f64),
            other => Err(ShellError::type_mismatch("Float", other.type_name())),
        }
    }

    // ------------------------------------------------------------------
    // Canonical text
    // ------------------------------------------------------------------

    /// Canonical textual description, the format asserted by tests.
    pub fn descr(&self) -> String {
        let mut out = String::new();
        self.append_descr(&mut out);
        out
    }

    pub fn append_descr(&self, out: &mut String) {
        match self {
            Value::Undefined => out.push_str("undefined"),
            Value::Null => out.push_str("null"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Integer(i) => out.push_str(&i.to_string()),
            Value::UInteger(u) => out.push_str(&u.to_string()),
            Value::Float(f) => append_float_descr(out, *f),
            Value::String(s) => append_quoted(out, s),
            Value::Object(o) => out.push_str(&o.append_descr()),
            Value::Array(a) => {
                out.push('[');
                for (i, item) in a.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.append_descr(out);
                }
                out.push(']');
            }
            Value::Map(m) => append_map_descr(out, &m.borrow()),
            Value::MapRef(weak) => match weak.upgrade() {
                Some(m) => append_map_descr(out, &m.borrow()),
                None => out.push_str("undefined"),
            },
            Value::Function(f) => {
                out.push('<');
                out.push_str("Function:");
                out.push_str(f.name());
                out.push('>');
            }
        }
    }

    /// Parses the canonical text back into a value.
    pub fn parse(text: &str) -> ShellResult<Value> {
        parser::parse(text)
    }

    /// Builds a value from a JSON document. Integers prefer the signed
    /// variant; object keys arrive in serde_json's order.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInteger(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::array_from(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => {
                let mut map = ValueMap::new();
                for (key, item) in entries {
                    map.insert(key.clone(), Value::from_json(item));
                }
                Value::map_from(map)
            }
        }
    }

    /// Converts into a JSON value; handles and callables have no JSON form.
    pub fn to_json(&self) -> ShellResult<serde_json::Value> {
        match self {
            Value::Undefined | Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            Value::Integer(i) => Ok(serde_json::Value::from(*i)),
            Value::UInteger(u) => Ok(serde_json::Value::from(*u)),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    ShellError::TypeMismatch("Non-finite float has no JSON form".to_string())
                }),
            Value::String(s) => Ok(serde_json::Value::String(s.clone())),
            Value::Array(items) => Ok(serde_json::Value::Array(
                items
                    .borrow()
                    .iter()
                    .map(|item| item.to_json())
                    .collect::<ShellResult<_>>()?,
            )),
            Value::Map(map) => {
                let mut entries = serde_json::Map::new();
                for (key, item) in map.borrow().iter() {
                    entries.insert(key.to_string(), item.to_json()?);
                }
                Ok(serde_json::Value::Object(entries))
            }
            Value::MapRef(weak) => match weak.upgrade() {
                Some(map) => Value::Map(map).to_json(),
                None => Ok(serde_json::Value::Null),
            },
            other => Err(ShellError::TypeMismatch(format!(
                "{} has no JSON form",
                other.type_name()
            ))),
        }
    }
}

fn append_map_descr(out: &mut String, map: &ValueMap) {
    // Emission is sorted even though iteration order is insertion order.
    let mut keys: Vec<&str> = map.keys().collect();
    keys.sort_unstable();
    out.push('{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        append_quoted(out, key);
        out.push_str(": ");
        if let Some(value) = map.get(key) {
            value.append_descr(out);
        }
    }
    out.push('}');
}

fn append_float_descr(out: &mut String, f: f64) {
    let text = f.to_string();
    out.push_str(&text);
    // Display drops the fraction on integral floats; keep one so the
    // variant survives a parse round trip.
    if f.is_finite() && !text.contains(['.', 'e', 'E']) {
        out.push_str(".0");
    }
}

fn append_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::UInteger(a), Value::UInteger(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            // Containers compare by content so a parsed copy equals its source.
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            // Opaque handles compare by identity.
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::MapRef(a), Value::MapRef(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.descr())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInteger(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_descr() {
        assert_eq!(Value::Null.descr(), "null");
        assert_eq!(Value::Undefined.descr(), "undefined");
        assert_eq!(Value::Bool(true).descr(), "true");
        assert_eq!(Value::Integer(-7).descr(), "-7");
        assert_eq!(Value::UInteger(18446744073709551615).descr(), "18446744073709551615");
        assert_eq!(Value::Float(5.0).descr(), "5.0");
        assert_eq!(Value::Float(1.25).descr(), "1.25");
        // Integral floats past Display's fraction range still keep one.
        assert_eq!(Value::Float(1e16).descr(), "10000000000000000.0");
        assert_eq!(Value::Float(-4.5e15).descr(), "-4500000000000000.0");
        assert_eq!(Value::String("a\"b\n".into()).descr(), "\"a\\\"b\\n\"");
    }

    #[test]
    fn test_map_descr_sorted_keys() {
        let mut map = ValueMap::new();
        map.insert("idalpha", Value::Integer(1));
        map.insert("alphacol", Value::from("first"));
        let value = Value::map_from(map);
        // Insertion order has idalpha first, emission is lexicographic.
        assert_eq!(value.descr(), "{\"alphacol\": \"first\", \"idalpha\": 1}");
    }

    #[test]
    fn test_map_iteration_is_insertion_ordered() {
        let mut map = ValueMap::new();
        map.insert("zeta", Value::Integer(1));
        map.insert("alpha", Value::Integer(2));
        map.insert("zeta", Value::Integer(3));
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(map.get("zeta").and_then(|v| v.as_int().ok()), Some(3));
    }

    #[test]
    fn test_array_descr_compact() {
        let value = Value::array_from(vec![Value::Integer(3), Value::from("third")]);
        assert_eq!(value.descr(), "[3,\"third\"]");
    }

    #[test]
    fn test_typed_extraction_is_strict() {
        let err = Value::Integer(1).as_bool().unwrap_err();
        assert_eq!(err.kind(), "TypeMismatch");
        let err = Value::UInteger(1).as_int().unwrap_err();
        assert_eq!(err.kind(), "TypeMismatch");
        assert_eq!(Value::UInteger(1).to_int().unwrap(), 1);
        assert!(Value::Integer(-1).to_uint().is_err());
    }

    #[test]
    fn test_shared_map_mutation_is_visible() {
        let value = Value::new_map();
        let alias = value.clone();
        value.as_map().unwrap().borrow_mut().insert("k", Value::Integer(1));
        assert_eq!(alias.descr(), "{\"k\": 1}");
    }

    #[test]
    fn test_map_ref_does_not_keep_target_alive() {
        let handle = match Value::new_map() {
            Value::Map(m) => m,
            _ => unreachable!(),
        };
        let weak = Value::weak_ref(&handle);
        assert_eq!(weak.descr(), "{}");
        drop(handle);
        assert_eq!(weak.descr(), "undefined");
    }

    #[test]
    fn test_json_conversion() {
        let json: serde_json::Value =
            serde_json::from_str("{\"name\": \"nut\", \"qty\": 4, \"tags\": [\"a\"]}").unwrap();
        let value = Value::from_json(&json);
        assert_eq!(value.descr(), "{\"name\": \"nut\", \"qty\": 4, \"tags\": [\"a\"]}");
        assert_eq!(value.to_json().unwrap(), json);

        assert_eq!(
            Value::Undefined.to_json().unwrap(),
            serde_json::Value::Null
        );
        assert!(Value::new_map().to_json().is_ok());
    }

    #[test]
    fn test_equality_scalars_and_containers() {
        assert_eq!(Value::Integer(1), Value::Integer(1));
        assert_ne!(Value::Integer(1), Value::UInteger(1));
        assert_ne!(Value::Null, Value::Undefined);

        let a = Value::array_from(vec![Value::Integer(1)]);
        let b = Value::array_from(vec![Value::Integer(1)]);
        assert_eq!(a, b);

        let mut m1 = ValueMap::new();
        m1.insert("a", Value::Integer(1));
        m1.insert("b", Value::Integer(2));
        let mut m2 = ValueMap::new();
        m2.insert("b", Value::Integer(2));
        m2.insert("a", Value::Integer(1));
        assert_eq!(Value::map_from(m1), Value::map_from(m2));
    }
}
