// Server driver abstraction
// The wire protocol lives outside this crate; sessions talk to a driver
// through these synchronous traits. A bridge call blocks until the driver
// answers or fails.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::debug;

use crate::error::{ShellError, ShellResult};
use crate::uri::ConnectionData;
use crate::value::{TableValue, Value, ValueMap};

/// Column description, mirroring the classic protocol field packet.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub catalog: String,
    pub db: String,
    pub table: String,
    pub org_table: String,
    pub name: String,
    pub org_name: String,
    pub charset: u64,
    pub length: u64,
    pub type_code: u64,
    pub flags: u64,
    pub decimal: u64,
}

impl ColumnMeta {
    /// The metadata map exposed by `getColumnMetadata`; exactly these keys.
    pub fn to_value(&self) -> Value {
        let mut map = ValueMap::new();
        map.insert("catalog", Value::from(self.catalog.clone()));
        map.insert("db", Value::from(self.db.clone()));
        map.insert("table", Value::from(self.table.clone()));
        map.insert("org_table", Value::from(self.org_table.clone()));
        map.insert("name", Value::from(self.name.clone()));
        map.insert("org_name", Value::from(self.org_name.clone()));
        map.insert("charset", Value::UInteger(self.charset));
        map.insert("length", Value::UInteger(self.length));
        map.insert("type", Value::UInteger(self.type_code));
        map.insert("flags", Value::UInteger(self.flags));
        map.insert("decimal", Value::UInteger(self.decimal));
        Value::map_from(map)
    }
}

/// One result block: row data plus the per-block counters.
#[derive(Debug, Default)]
pub struct ResultBlock {
    pub columns: Vec<ColumnMeta>,
    pub rows: VecDeque<Vec<Value>>,
    pub affected_rows: u64,
    pub warning_count: u64,
}

impl ResultBlock {
    pub fn has_data(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Everything a statement produced; always at least one block.
#[derive(Debug, Default)]
pub struct StatementReply {
    pub blocks: Vec<ResultBlock>,
}

impl StatementReply {
    pub fn single(block: ResultBlock) -> Self {
        Self {
            blocks: vec![block],
        }
    }

    pub fn ok(affected_rows: u64, warning_count: u64) -> Self {
        Self::single(ResultBlock {
            affected_rows,
            warning_count,
            ..ResultBlock::default()
        })
    }
}

// ----------------------------------------------------------------------
// CRUD requests, produced by the fluent builders
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ModifyOperation {
    Set(String, Value),
    Unset(Vec<String>),
    Merge(ValueMap),
    ArrayInsert(String, Value),
    ArrayAppend(String, Value),
    ArrayDelete(String, Value),
}

#[derive(Debug, Default, Clone)]
pub struct FindRequest {
    pub schema: String,
    pub collection: String,
    pub filter: Option<String>,
    pub fields: Vec<String>,
    pub group_by: Vec<String>,
    pub having: Option<String>,
    pub sort: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub binds: Vec<(String, Value)>,
}

#[derive(Debug, Default, Clone)]
pub struct AddRequest {
    pub schema: String,
    pub collection: String,
    pub documents: Vec<ValueMap>,
}

#[derive(Debug, Default, Clone)]
pub struct ModifyRequest {
    pub schema: String,
    pub collection: String,
    pub filter: String,
    pub operations: Vec<ModifyOperation>,
    pub sort: Vec<String>,
    pub limit: Option<u64>,
    pub binds: Vec<(String, Value)>,
}

#[derive(Debug, Default, Clone)]
pub struct RemoveRequest {
    pub schema: String,
    pub collection: String,
    pub filter: String,
    pub sort: Vec<String>,
    pub limit: Option<u64>,
    pub binds: Vec<(String, Value)>,
}

#[derive(Debug, Default, Clone)]
pub struct SelectRequest {
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
    pub condition: Option<String>,
    pub group_by: Vec<String>,
    pub having: Option<String>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub binds: Vec<(String, Value)>,
}

#[derive(Debug, Default, Clone)]
pub struct InsertRequest {
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<TableValue>>,
}

#[derive(Debug, Default, Clone)]
pub struct UpdateRequest {
    pub schema: String,
    pub table: String,
    pub assignments: Vec<(String, TableValue)>,
    pub condition: Option<String>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub binds: Vec<(String, Value)>,
}

#[derive(Debug, Default, Clone)]
pub struct DeleteRequest {
    pub schema: String,
    pub table: String,
    pub condition: Option<String>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub binds: Vec<(String, Value)>,
}

#[derive(Debug, Clone)]
pub enum CrudRequest {
    Find(FindRequest),
    Add(AddRequest),
    Modify(ModifyRequest),
    Remove(RemoveRequest),
    Select(SelectRequest),
    Insert(InsertRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
}

// ----------------------------------------------------------------------
// Driver traits
// ----------------------------------------------------------------------

/// A live server connection. Calls block; `cancel` interrupts the current
/// blocking request at whatever granularity the protocol offers.
pub trait ServerConnection {
    fn execute(&mut self, sql: &str) -> ShellResult<StatementReply>;

    fn execute_crud(&mut self, request: &CrudRequest) -> ShellResult<StatementReply>;

    fn cancel(&mut self) -> ShellResult<()> {
        Ok(())
    }

    fn close(&mut self);
}

/// Connection factory for one URI scheme.
pub trait ServerDriver {
    fn scheme(&self) -> &str;

    fn connect(
        &self,
        data: &ConnectionData,
        default_port: u16,
    ) -> ShellResult<Box<dyn ServerConnection>>;
}

/// Scheme-keyed driver registry.
pub struct DriverRegistry {
    drivers: RefCell<HashMap<String, Rc<dyn ServerDriver>>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            drivers: RefCell::new(HashMap::new()),
        }
    }

    /// Registers a driver under a scheme, replacing any previous one.
    pub fn register(&self, scheme: &str, driver: Rc<dyn ServerDriver>) {
        debug!(scheme, driver = driver.scheme(), "registering server driver");
        self.drivers
            .borrow_mut()
            .insert(scheme.to_string(), driver);
    }

    pub fn get(&self, scheme: &str) -> ShellResult<Rc<dyn ServerDriver>> {
        self.drivers
            .borrow()
            .get(scheme)
            .cloned()
            .ok_or_else(|| {
                ShellError::ProtocolError(format!("No driver registered for scheme '{}'", scheme))
            })
    }

    pub fn has(&self, scheme: &str) -> bool {
        self.drivers.borrow().contains_key(scheme)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------
// Classic parameter expansion
// ----------------------------------------------------------------------

/// Expands `?` positionals (array) or `:name` markers (map) into SQL
/// literals, skipping quoted runs. Wrong parameter variants fail before
/// anything reaches the driver.
pub fn expand_placeholders(api: &str, sql: &str, params: &Value) -> ShellResult<String> {
    match params {
        Value::Undefined | Value::Null => Ok(sql.to_string()),
        Value::Array(items) => {
            let items = items.borrow();
            let mut iter = items.iter();
            let mut out = String::with_capacity(sql.len());
            let mut chars = sql.chars().peekable();
            let mut quote: Option<char> = None;
            while let Some(c) = chars.next() {
                match quote {
                    Some(q) => {
                        out.push(c);
                        if c == q {
                            quote = None;
                        }
                    }
                    None if c == '\'' || c == '"' => {
                        out.push(c);
                        quote = Some(c);
                    }
                    None if c == '?' => {
                        let value = iter.next().ok_or_else(|| {
                            ShellError::argument(api, "Too few values bound for the statement")
                        })?;
                        out.push_str(&sql_literal(api, value)?);
                    }
                    None => out.push(c),
                }
            }
            if iter.next().is_some() {
                return Err(ShellError::argument(
                    api,
                    "Too many values bound for the statement",
                ));
            }
            Ok(out)
        }
        Value::Map(map) => {
            let map = map.borrow();
            let mut out = String::with_capacity(sql.len());
            let mut chars = sql.char_indices().peekable();
            let mut quote: Option<char> = None;
            while let Some((_, c)) = chars.next() {
                match quote {
                    Some(q) => {
                        out.push(c);
                        if c == q {
                            quote = None;
                        }
                    }
                    None if c == '\'' || c == '"' => {
                        out.push(c);
                        quote = Some(c);
                    }
                    None if c == ':' => {
                        let mut name = String::new();
                        while let Some((_, n)) = chars.peek() {
                            if n.is_ascii_alphanumeric() || *n == '_' {
                                name.push(*n);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        if name.is_empty() {
                            out.push(':');
                            continue;
                        }
                        let value = map.get(&name).ok_or_else(|| {
                            ShellError::UnboundParameter(format!(
                                "{}: No value bound for placeholder {}",
                                api, name
                            ))
                        })?;
                        out.push_str(&sql_literal(api, value)?);
                    }
                    None => out.push(c),
                }
            }
            Ok(out)
        }
        other => Err(ShellError::argument(
            api,
            format!(
                "Argument #2 is expected to be a map or array, got {}",
                other.type_name()
            ),
        )),
    }
}

fn sql_literal(api: &str, value: &Value) -> ShellResult<String> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::Bool(true) => Ok("TRUE".to_string()),
        Value::Bool(false) => Ok("FALSE".to_string()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::UInteger(u) => Ok(u.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::String(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        other => Err(ShellError::argument(
            api,
            format!("Unsupported value received: {}", other.descr()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_positional() {
        let params = Value::array_from(vec![Value::Integer(42), Value::from("it's")]);
        let sql = expand_placeholders("S.sql", "select ? as a, ? as b", &params).unwrap();
        assert_eq!(sql, "select 42 as a, 'it''s' as b");
    }

    #[test]
    fn test_expand_named() {
        let map = Value::new_map();
        map.as_map()
            .unwrap()
            .borrow_mut()
            .insert("first", Value::Integer(1));
        let sql = expand_placeholders("S.sql", "select :first as a", &map).unwrap();
        assert_eq!(sql, "select 1 as a");
    }

    #[test]
    fn test_expand_skips_quoted_text() {
        let params = Value::array_from(vec![Value::Integer(1)]);
        let sql = expand_placeholders("S.sql", "select '?' as q, ? as a", &params).unwrap();
        assert_eq!(sql, "select '?' as q, 1 as a");
    }

    #[test]
    fn test_expand_errors() {
        let err = expand_placeholders(
            "S.sql",
            "select ? as a",
            &Value::array_from(vec![]),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "ArgumentError");

        let err =
            expand_placeholders("S.sql", "select :a", &Value::new_map()).unwrap_err();
        assert_eq!(err.kind(), "UnboundParameter");

        let err = expand_placeholders("S.sql", "select 1", &Value::Integer(1)).unwrap_err();
        assert_eq!(err.kind(), "ArgumentError");
    }

    #[test]
    fn test_metadata_value_keys() {
        let meta = ColumnMeta {
            catalog: "def".into(),
            db: "shell_tests".into(),
            table: "alpha".into(),
            org_table: "alpha".into(),
            name: "idalpha".into(),
            org_name: "idalpha".into(),
            charset: 63,
            length: 11,
            type_code: 3,
            flags: 0,
            decimal: 0,
        };
        let value = meta.to_value();
        let map = value.as_map().unwrap();
        assert_eq!(map.borrow().len(), 11);
        for key in [
            "catalog", "db", "table", "org_table", "name", "org_name", "charset", "length",
            "type", "flags", "decimal",
        ] {
            assert!(map.borrow().contains_key(key), "missing {}", key);
        }
    }
}
