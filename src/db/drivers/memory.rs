// Memory driver
// A self-contained server good enough for the statement and CRUD surface
// the shell exercises. All connections made through one driver instance
// share the same server state.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use tracing::debug;

use crate::db::backend::{
    ColumnMeta, CrudRequest, ModifyOperation, ResultBlock, ServerConnection, ServerDriver,
    StatementReply,
};
use crate::error::{ShellError, ShellResult};
use crate::uri::ConnectionData;
use crate::value::{TableValue, Value, ValueMap};

const TYPE_LONGLONG: u64 = 8;
const TYPE_DOUBLE: u64 = 5;
const TYPE_VAR_STRING: u64 = 253;
const TYPE_JSON: u64 = 245;
const CHARSET_UTF8: u64 = 33;
const CHARSET_BINARY: u64 = 63;
const FLAG_NOT_NULL: u64 = 1;
const FLAG_PRI_KEY: u64 = 2;

#[derive(Debug, Clone)]
struct MemColumn {
    name: String,
    type_code: u64,
    charset: u64,
    length: u64,
    flags: u64,
    decimal: u64,
}

#[derive(Debug, Default)]
struct MemTable {
    columns: Vec<MemColumn>,
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Default)]
struct MemCollection {
    documents: Vec<ValueMap>,
}

#[derive(Debug, Default)]
struct MemSchema {
    tables: BTreeMap<String, MemTable>,
    collections: BTreeMap<String, MemCollection>,
}

/// Shared server state behind every connection of one driver instance.
#[derive(Debug, Default)]
pub struct MemoryServer {
    schemas: BTreeMap<String, MemSchema>,
}

pub struct MemoryDriver {
    server: Rc<RefCell<MemoryServer>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self {
            server: Rc::new(RefCell::new(MemoryServer::default())),
        }
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerDriver for MemoryDriver {
    fn scheme(&self) -> &str {
        "memory"
    }

    fn connect(
        &self,
        data: &ConnectionData,
        default_port: u16,
    ) -> ShellResult<Box<dyn ServerConnection>> {
        debug!(
            host = %data.host,
            port = data.effective_port(default_port),
            "memory driver connection"
        );
        Ok(Box::new(MemoryConnection {
            server: Rc::clone(&self.server),
            current_schema: data.schema.clone(),
            cancelled: false,
        }))
    }
}

struct MemoryConnection {
    server: Rc<RefCell<MemoryServer>>,
    current_schema: Option<String>,
    cancelled: bool,
}

impl ServerConnection for MemoryConnection {
    fn execute(&mut self, sql: &str) -> ShellResult<StatementReply> {
        if self.cancelled {
            self.cancelled = false;
            return Err(ShellError::Interrupted(
                "Query execution was interrupted".to_string(),
            ));
        }
        // Compound input yields one block per statement.
        let statements = split_statements(sql);
        if statements.is_empty() {
            return Err(syntax_error(sql));
        }
        let mut reply = StatementReply::default();
        for statement in statements {
            let mut partial = self.execute_single(&statement)?;
            reply.blocks.append(&mut partial.blocks);
        }
        Ok(reply)
    }

    fn execute_crud(&mut self, request: &CrudRequest) -> ShellResult<StatementReply> {
        if self.cancelled {
            self.cancelled = false;
            return Err(ShellError::Interrupted(
                "Query execution was interrupted".to_string(),
            ));
        }
        match request {
            CrudRequest::Find(find) => self.crud_find(find),
            CrudRequest::Add(add) => self.crud_add(add),
            CrudRequest::Modify(modify) => self.crud_modify(modify),
            CrudRequest::Remove(remove) => self.crud_remove(remove),
            CrudRequest::Select(select) => self.crud_select(select),
            CrudRequest::Insert(insert) => self.crud_insert(insert),
            CrudRequest::Update(update) => self.crud_update(update),
            CrudRequest::Delete(delete) => self.crud_delete(delete),
        }
    }

    fn cancel(&mut self) -> ShellResult<()> {
        self.cancelled = true;
        Ok(())
    }

    fn close(&mut self) {}
}

impl MemoryConnection {
    fn execute_single(&mut self, sql: &str) -> ShellResult<StatementReply> {
        let trimmed = sql.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower == "show databases" {
            return self.show_databases();
        }
        if let Some(rest) = strip_keywords(trimmed, &["create", "schema"])
            .or_else(|| strip_keywords(trimmed, &["create", "database"]))
        {
            return self.create_schema(rest.trim());
        }
        if let Some(rest) = strip_keywords(trimmed, &["drop", "schema"])
            .or_else(|| strip_keywords(trimmed, &["drop", "database"]))
        {
            return self.drop_schema(rest.trim());
        }
        if let Some(rest) = strip_keywords(trimmed, &["create", "table"]) {
            return self.create_table(rest.trim());
        }
        if let Some(rest) = strip_keywords(trimmed, &["insert", "into"]) {
            return self.insert_rows(rest.trim());
        }
        if let Some(rest) = strip_keywords(trimmed, &["use"]) {
            return self.use_schema(rest.trim());
        }
        if let Some(rest) = strip_keywords(trimmed, &["select"]) {
            return self.select(rest.trim());
        }
        Err(syntax_error(trimmed))
    }

    fn show_databases(&self) -> ShellResult<StatementReply> {
        let server = self.server.borrow();
        let rows: VecDeque<Vec<Value>> = server
            .schemas
            .keys()
            .map(|name| vec![Value::from(name.clone())])
            .collect();
        Ok(StatementReply::single(ResultBlock {
            columns: vec![text_column("SCHEMATA", "Database", 192)],
            rows,
            affected_rows: 0,
            warning_count: 0,
        }))
    }

    fn create_schema(&mut self, name: &str) -> ShellResult<StatementReply> {
        let name = unquote_ident(name);
        let mut server = self.server.borrow_mut();
        if server.schemas.contains_key(&name) {
            return Err(ShellError::sql(
                1007,
                "HY000",
                format!("Can't create database '{}'; database exists", name),
            ));
        }
        server.schemas.insert(name, MemSchema::default());
        Ok(StatementReply::ok(1, 0))
    }

    fn drop_schema(&mut self, rest: &str) -> ShellResult<StatementReply> {
        let lower = rest.to_ascii_lowercase();
        let (if_exists, name) = match lower.strip_prefix("if exists") {
            Some(_) => (true, rest[9..].trim()),
            None => (false, rest),
        };
        let name = unquote_ident(name);
        let mut server = self.server.borrow_mut();
        if server.schemas.remove(&name).is_some() {
            Ok(StatementReply::ok(0, 0))
        } else if if_exists {
            // The schema was already gone; the server only warns.
            Ok(StatementReply::ok(0, 1))
        } else {
            Err(ShellError::sql(
                1008,
                "HY000",
                format!("Can't drop database '{}'; database doesn't exist", name),
            ))
        }
    }

    fn use_schema(&mut self, name: &str) -> ShellResult<StatementReply> {
        let name = unquote_ident(name);
        let server = self.server.borrow();
        if !server.schemas.contains_key(&name) {
            return Err(unknown_database(&name));
        }
        drop(server);
        self.current_schema = Some(name);
        Ok(StatementReply::ok(0, 0))
    }

    fn create_table(&mut self, rest: &str) -> ShellResult<StatementReply> {
        let open = rest.find('(').ok_or_else(|| syntax_error(rest))?;
        let target = rest[..open].trim();
        let body = rest[open + 1..]
            .trim_end()
            .trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '=');
        let body = body.strip_suffix(')').unwrap_or(body);
        let (schema_name, table_name) = self.resolve_target(target)?;

        let mut columns = Vec::new();
        for definition in split_top_level(body, ',') {
            let definition = definition.trim();
            let upper = definition.to_ascii_uppercase();
            if upper.starts_with("PRIMARY")
                || upper.starts_with("UNIQUE")
                || upper.starts_with("KEY")
                || upper.starts_with("CONSTRAINT")
                || upper.starts_with("INDEX")
            {
                // Key definitions only adjust column flags.
                if let Some(open) = definition.find('(') {
                    let inner = definition[open + 1..].trim_end_matches(')');
                    for key in split_top_level(inner, ',') {
                        let key = unquote_ident(key.trim());
                        if let Some(col) = columns
                            .iter_mut()
                            .find(|c: &&mut MemColumn| c.name == key)
                        {
                            col.flags |= FLAG_PRI_KEY | FLAG_NOT_NULL;
                        }
                    }
                }
                continue;
            }
            columns.push(parse_column_definition(definition)?);
        }
        if columns.is_empty() {
            return Err(syntax_error(rest));
        }

        let mut server = self.server.borrow_mut();
        let schema = server
            .schemas
            .get_mut(&schema_name)
            .ok_or_else(|| unknown_database(&schema_name))?;
        if schema.tables.contains_key(&table_name) {
            return Err(ShellError::sql(
                1050,
                "42S01",
                format!("Table '{}' already exists", table_name),
            ));
        }
        schema.tables.insert(
            table_name,
            MemTable {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(StatementReply::ok(0, 0))
    }

    fn insert_rows(&mut self, rest: &str) -> ShellResult<StatementReply> {
        let lower = rest.to_ascii_lowercase();
        let values_at = find_keyword(&lower, "values").ok_or_else(|| syntax_error(rest))?;
        let head = rest[..values_at].trim();
        let tail = rest[values_at + "values".len()..].trim();

        // Optional explicit column list after the target.
        let (target, explicit_columns) = match head.find('(') {
            Some(open) => {
                let names = head[open + 1..].trim_end().trim_end_matches(')');
                let list = split_top_level(names, ',')
                    .into_iter()
                    .map(|n| unquote_ident(n.trim()))
                    .collect::<Vec<_>>();
                (head[..open].trim(), Some(list))
            }
            None => (head, None),
        };
        let (schema_name, table_name) = self.resolve_target(target)?;

        let mut server = self.server.borrow_mut();
        let table = server
            .schemas
            .get_mut(&schema_name)
            .ok_or_else(|| unknown_database(&schema_name))?
            .tables
            .get_mut(&table_name)
            .ok_or_else(|| unknown_table(&schema_name, &table_name))?;

        let column_order: Vec<usize> = match &explicit_columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    table
                        .columns
                        .iter()
                        .position(|c| &c.name == name)
                        .ok_or_else(|| unknown_column(name))
                })
                .collect::<ShellResult<_>>()?,
            None => (0..table.columns.len()).collect(),
        };

        let mut inserted = 0u64;
        for tuple in split_top_level(tail, ',') {
            let tuple = tuple.trim();
            let inner = tuple
                .strip_prefix('(')
                .and_then(|t| t.strip_suffix(')'))
                .ok_or_else(|| syntax_error(tuple))?;
            let values: Vec<Value> = split_top_level(inner, ',')
                .into_iter()
                .map(|item| parse_literal(item.trim()))
                .collect::<ShellResult<_>>()?;
            if values.len() != column_order.len() {
                return Err(ShellError::sql(
                    1136,
                    "21S01",
                    "Column count doesn't match value count",
                ));
            }
            let mut row = vec![Value::Null; table.columns.len()];
            for (value, index) in values.into_iter().zip(&column_order) {
                row[*index] = value;
            }
            table.rows.push(row);
            inserted += 1;
        }
        Ok(StatementReply::ok(inserted, 0))
    }

    fn select(&mut self, rest: &str) -> ShellResult<StatementReply> {
        let lower = rest.to_ascii_lowercase();
        match find_keyword(&lower, "from") {
            Some(from_at) => {
                let projection = rest[..from_at].trim();
                let tail = rest[from_at + "from".len()..].trim();
                self.select_from(projection, tail)
            }
            None => select_literals(rest),
        }
    }

    fn select_from(&mut self, projection: &str, tail: &str) -> ShellResult<StatementReply> {
        let lower = tail.to_ascii_lowercase();
        let where_at = find_keyword(&lower, "where");
        let order_at = find_keyword(&lower, "order by");
        let limit_at = find_keyword(&lower, "limit");
        let target_end = [where_at, order_at, limit_at]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(tail.len());

        let target = tail[..target_end].trim();
        let condition = where_at.map(|at| {
            let end = [order_at, limit_at]
                .into_iter()
                .flatten()
                .filter(|p| *p > at)
                .min()
                .unwrap_or(tail.len());
            tail[at + "where".len()..end].trim().to_string()
        });
        let order_by = order_at.map(|at| {
            let end = limit_at.filter(|p| *p > at).unwrap_or(tail.len());
            tail[at + "order by".len()..end].trim().to_string()
        });
        let limit_clause = limit_at.map(|at| tail[at + "limit".len()..].trim().to_string());

        let (schema_name, table_name) = self.resolve_target(target)?;
        let server = self.server.borrow();
        let table = server
            .schemas
            .get(&schema_name)
            .ok_or_else(|| unknown_database(&schema_name))?
            .tables
            .get(&table_name)
            .ok_or_else(|| unknown_table(&schema_name, &table_name))?;

        // Resolve the projection to column indexes.
        let indexes: Vec<usize> = if projection.trim() == "*" {
            (0..table.columns.len()).collect()
        } else {
            split_top_level(projection, ',')
                .into_iter()
                .map(|name| {
                    let name = unquote_ident(name.trim());
                    table
                        .columns
                        .iter()
                        .position(|c| c.name == name)
                        .ok_or_else(|| unknown_column(&name))
                })
                .collect::<ShellResult<_>>()?
        };

        let lookup_columns = table.columns.clone();
        let mut selected: Vec<Vec<Value>> = Vec::new();
        for row in &table.rows {
            let matches = match &condition {
                Some(cond) => eval_condition(cond, &[], &|name| {
                    lookup_columns
                        .iter()
                        .position(|c| c.name == name)
                        .map(|i| row[i].clone())
                })?,
                None => true,
            };
            if matches {
                selected.push(row.clone());
            }
        }

        if let Some(order) = order_by {
            sort_rows(&mut selected, &order, &lookup_columns)?;
        }
        if let Some(limit) = limit_clause {
            apply_limit_clause(&mut selected, &limit)?;
        }

        let columns: Vec<ColumnMeta> = indexes
            .iter()
            .map(|&i| column_meta(&schema_name, &table_name, &table.columns[i]))
            .collect();
        let rows: VecDeque<Vec<Value>> = selected
            .into_iter()
            .map(|row| indexes.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(StatementReply::single(ResultBlock {
            columns,
            rows,
            affected_rows: 0,
            warning_count: 0,
        }))
    }

    fn resolve_target(&self, target: &str) -> ShellResult<(String, String)> {
        let target = target.trim();
        match split_qualified(target) {
            (Some(schema), name) => Ok((schema, name)),
            (None, name) => {
                let schema = self.current_schema.clone().ok_or_else(|| {
                    ShellError::sql(1046, "3D000", "No database selected")
                })?;
                Ok((schema, name))
            }
        }
    }

    // ------------------------------------------------------------------
    // CRUD requests
    // ------------------------------------------------------------------

    fn crud_find(
        &mut self,
        request: &crate::db::backend::FindRequest,
    ) -> ShellResult<StatementReply> {
        if !request.group_by.is_empty() {
            return Err(ShellError::ProtocolError(
                "groupBy is not supported by the memory driver".to_string(),
            ));
        }
        let server = self.server.borrow();
        let collection = server
            .schemas
            .get(&request.schema)
            .ok_or_else(|| unknown_database(&request.schema))?
            .collections
            .get(&request.collection)
            .ok_or_else(|| unknown_table(&request.schema, &request.collection))?;

        let mut docs: Vec<ValueMap> = Vec::new();
        for doc in &collection.documents {
            if match_document(request.filter.as_deref(), doc, &request.binds)? {
                docs.push(doc.clone());
            }
        }
        sort_documents(&mut docs, &request.sort)?;
        apply_window(&mut docs, request.offset, request.limit);

        let projected: Vec<ValueMap> = if request.fields.is_empty() {
            docs
        } else {
            docs.into_iter()
                .map(|doc| {
                    let mut out = ValueMap::new();
                    for field in &request.fields {
                        if let Some(value) = doc.get(field) {
                            out.insert(field.clone(), value.clone());
                        }
                    }
                    out
                })
                .collect()
        };

        let rows: VecDeque<Vec<Value>> = projected
            .into_iter()
            .map(|doc| vec![Value::map_from(doc)])
            .collect();
        Ok(StatementReply::single(ResultBlock {
            columns: vec![doc_column(&request.collection)],
            rows,
            affected_rows: 0,
            warning_count: 0,
        }))
    }

    fn crud_add(&mut self, request: &crate::db::backend::AddRequest) -> ShellResult<StatementReply> {
        let mut server = self.server.borrow_mut();
        let schema = server
            .schemas
            .get_mut(&request.schema)
            .ok_or_else(|| unknown_database(&request.schema))?;
        let collection = schema
            .collections
            .entry(request.collection.clone())
            .or_default();
        for doc in &request.documents {
            collection.documents.push(doc.clone());
        }
        Ok(StatementReply::ok(request.documents.len() as u64, 0))
    }

    fn crud_modify(
        &mut self,
        request: &crate::db::backend::ModifyRequest,
    ) -> ShellResult<StatementReply> {
        let mut server = self.server.borrow_mut();
        let collection = server
            .schemas
            .get_mut(&request.schema)
            .ok_or_else(|| unknown_database(&request.schema))?
            .collections
            .get_mut(&request.collection)
            .ok_or_else(|| unknown_table(&request.schema, &request.collection))?;

        let mut affected = 0u64;
        let limit = request.limit.unwrap_or(u64::MAX);
        for doc in collection.documents.iter_mut() {
            if affected >= limit {
                break;
            }
            if !match_document(Some(&request.filter), doc, &request.binds)? {
                continue;
            }
            for operation in &request.operations {
                apply_modify_operation(doc, operation)?;
            }
            affected += 1;
        }
        Ok(StatementReply::ok(affected, 0))
    }

    fn crud_remove(
        &mut self,
        request: &crate::db::backend::RemoveRequest,
    ) -> ShellResult<StatementReply> {
        let mut server = self.server.borrow_mut();
        let collection = server
            .schemas
            .get_mut(&request.schema)
            .ok_or_else(|| unknown_database(&request.schema))?
            .collections
            .get_mut(&request.collection)
            .ok_or_else(|| unknown_table(&request.schema, &request.collection))?;

        let limit = request.limit.unwrap_or(u64::MAX);
        let mut removed = 0u64;
        let mut kept = Vec::with_capacity(collection.documents.len());
        for doc in collection.documents.drain(..) {
            if removed < limit && match_document(Some(&request.filter), &doc, &request.binds)? {
                removed += 1;
            } else {
                kept.push(doc);
            }
        }
        collection.documents = kept;
        Ok(StatementReply::ok(removed, 0))
    }

    fn crud_select(
        &mut self,
        request: &crate::db::backend::SelectRequest,
    ) -> ShellResult<StatementReply> {
        let projection = if request.columns.is_empty() {
            "*".to_string()
        } else {
            request.columns.join(", ")
        };
        let mut tail = format!("`{}`.`{}`", request.schema, request.table);
        if let Some(condition) = &request.condition {
            tail.push_str(" where ");
            tail.push_str(&substitute_binds(condition, &request.binds)?);
        }
        if !request.order_by.is_empty() {
            tail.push_str(" order by ");
            tail.push_str(&request.order_by.join(", "));
        }
        if let Some(limit) = request.limit {
            tail.push_str(&format!(" limit {}", limit));
            if let Some(offset) = request.offset {
                tail.push_str(&format!(" offset {}", offset));
            }
        }
        self.select_from(&projection, &tail)
    }

    fn crud_insert(
        &mut self,
        request: &crate::db::backend::InsertRequest,
    ) -> ShellResult<StatementReply> {
        let mut server = self.server.borrow_mut();
        let table = server
            .schemas
            .get_mut(&request.schema)
            .ok_or_else(|| unknown_database(&request.schema))?
            .tables
            .get_mut(&request.table)
            .ok_or_else(|| unknown_table(&request.schema, &request.table))?;

        let order: Vec<usize> = if request.columns.is_empty() {
            (0..table.columns.len()).collect()
        } else {
            request
                .columns
                .iter()
                .map(|name| {
                    table
                        .columns
                        .iter()
                        .position(|c| &c.name == name)
                        .ok_or_else(|| unknown_column(name))
                })
                .collect::<ShellResult<_>>()?
        };

        let mut inserted = 0u64;
        for values in &request.rows {
            if values.len() != order.len() {
                return Err(ShellError::sql(
                    1136,
                    "21S01",
                    "Column count doesn't match value count",
                ));
            }
            let mut row = vec![Value::Null; table.columns.len()];
            for (value, index) in values.iter().zip(&order) {
                row[*index] = table_value_to_value(value)?;
            }
            table.rows.push(row);
            inserted += 1;
        }
        Ok(StatementReply::ok(inserted, 0))
    }

    fn crud_update(
        &mut self,
        request: &crate::db::backend::UpdateRequest,
    ) -> ShellResult<StatementReply> {
        let condition = match &request.condition {
            Some(c) => Some(substitute_binds(c, &request.binds)?),
            None => None,
        };
        let mut server = self.server.borrow_mut();
        let table = server
            .schemas
            .get_mut(&request.schema)
            .ok_or_else(|| unknown_database(&request.schema))?
            .tables
            .get_mut(&request.table)
            .ok_or_else(|| unknown_table(&request.schema, &request.table))?;

        let assignments: Vec<(usize, Value)> = request
            .assignments
            .iter()
            .map(|(name, value)| {
                let index = table
                    .columns
                    .iter()
                    .position(|c| &c.name == name)
                    .ok_or_else(|| unknown_column(name))?;
                Ok((index, table_value_to_value(value)?))
            })
            .collect::<ShellResult<_>>()?;

        let columns = table.columns.clone();
        let limit = request.limit.unwrap_or(u64::MAX);
        let mut affected = 0u64;
        for row in table.rows.iter_mut() {
            if affected >= limit {
                break;
            }
            let matches = match &condition {
                Some(cond) => eval_condition(cond, &[], &|name| {
                    columns
                        .iter()
                        .position(|c| c.name == name)
                        .map(|i| row[i].clone())
                })?,
                None => true,
            };
            if matches {
                for (index, value) in &assignments {
                    row[*index] = value.clone();
                }
                affected += 1;
            }
        }
        Ok(StatementReply::ok(affected, 0))
    }

    fn crud_delete(
        &mut self,
        request: &crate::db::backend::DeleteRequest,
    ) -> ShellResult<StatementReply> {
        let condition = match &request.condition {
            Some(c) => Some(substitute_binds(c, &request.binds)?),
            None => None,
        };
        let mut server = self.server.borrow_mut();
        let table = server
            .schemas
            .get_mut(&request.schema)
            .ok_or_else(|| unknown_database(&request.schema))?
            .tables
            .get_mut(&request.table)
            .ok_or_else(|| unknown_table(&request.schema, &request.table))?;

        let columns = table.columns.clone();
        let limit = request.limit.unwrap_or(u64::MAX);
        let mut removed = 0u64;
        let mut kept = Vec::with_capacity(table.rows.len());
        for row in table.rows.drain(..) {
            let matches = removed < limit
                && match &condition {
                    Some(cond) => eval_condition(cond, &[], &|name| {
                        columns
                            .iter()
                            .position(|c| c.name == name)
                            .map(|i| row[i].clone())
                    })?,
                    None => true,
                };
            if matches {
                removed += 1;
            } else {
                kept.push(row);
            }
        }
        table.rows = kept;
        Ok(StatementReply::ok(removed, 0))
    }
}

// ----------------------------------------------------------------------
// Text helpers
// ----------------------------------------------------------------------

fn doc_column(collection: &str) -> ColumnMeta {
    ColumnMeta {
        catalog: "def".to_string(),
        db: String::new(),
        table: collection.to_string(),
        org_table: collection.to_string(),
        name: "doc".to_string(),
        org_name: "doc".to_string(),
        charset: CHARSET_BINARY,
        length: u32::MAX as u64,
        type_code: TYPE_JSON,
        flags: 0,
        decimal: 0,
    }
}

fn text_column(table: &str, name: &str, length: u64) -> ColumnMeta {
    ColumnMeta {
        catalog: "def".to_string(),
        db: "information_schema".to_string(),
        table: table.to_string(),
        org_table: table.to_string(),
        name: name.to_string(),
        org_name: name.to_string(),
        charset: CHARSET_UTF8,
        length,
        type_code: TYPE_VAR_STRING,
        flags: FLAG_NOT_NULL,
        decimal: 0,
    }
}

fn column_meta(schema: &str, table: &str, column: &MemColumn) -> ColumnMeta {
    ColumnMeta {
        catalog: "def".to_string(),
        db: schema.to_string(),
        table: table.to_string(),
        org_table: table.to_string(),
        name: column.name.clone(),
        org_name: column.name.clone(),
        charset: column.charset,
        length: column.length,
        type_code: column.type_code,
        flags: column.flags,
        decimal: column.decimal,
    }
}

fn parse_column_definition(definition: &str) -> ShellResult<MemColumn> {
    let mut parts = definition.split_whitespace();
    let name = unquote_ident(parts.next().ok_or_else(|| syntax_error(definition))?);
    let type_text = parts.next().unwrap_or("varchar").to_ascii_lowercase();
    let (base, declared_length) = match type_text.split_once('(') {
        Some((base, rest)) => {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            (base.to_string(), digits.parse::<u64>().ok())
        }
        None => (type_text.clone(), None),
    };
    let upper = definition.to_ascii_uppercase();
    let mut flags = 0;
    if upper.contains("NOT NULL") {
        flags |= FLAG_NOT_NULL;
    }
    if upper.contains("PRIMARY KEY") {
        flags |= FLAG_PRI_KEY | FLAG_NOT_NULL;
    }
    let column = match base.as_str() {
        "int" | "integer" | "bigint" | "smallint" | "tinyint" => MemColumn {
            name,
            type_code: TYPE_LONGLONG,
            charset: CHARSET_BINARY,
            length: declared_length.unwrap_or(11),
            flags,
            decimal: 0,
        },
        "double" | "float" | "decimal" | "real" => MemColumn {
            name,
            type_code: TYPE_DOUBLE,
            charset: CHARSET_BINARY,
            length: declared_length.unwrap_or(22),
            flags,
            decimal: 31,
        },
        _ => MemColumn {
            name,
            type_code: TYPE_VAR_STRING,
            charset: CHARSET_UTF8,
            length: declared_length.unwrap_or(45) * 3,
            flags,
            decimal: 0,
        },
    };
    Ok(column)
}

fn select_literals(projection: &str) -> ShellResult<StatementReply> {
    let mut columns = Vec::new();
    let mut row = Vec::new();
    for item in split_top_level(projection, ',') {
        let item = item.trim();
        let lower = item.to_ascii_lowercase();
        let (expr, alias) = match find_keyword(&lower, "as") {
            Some(at) => (
                item[..at].trim(),
                unquote_ident(item[at + 2..].trim()),
            ),
            None => (item, item.to_string()),
        };
        let value = parse_literal(expr)?;
        let (type_code, charset, length) = match value {
            Value::Integer(_) | Value::UInteger(_) => (TYPE_LONGLONG, CHARSET_BINARY, 21),
            Value::Float(_) => (TYPE_DOUBLE, CHARSET_BINARY, 22),
            _ => (TYPE_VAR_STRING, CHARSET_UTF8, 192),
        };
        columns.push(ColumnMeta {
            catalog: "def".to_string(),
            db: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: alias.clone(),
            org_name: String::new(),
            charset,
            length,
            type_code,
            flags: FLAG_NOT_NULL,
            decimal: match value {
                Value::Float(_) => 31,
                _ => 0,
            },
        });
        row.push(value);
    }
    let mut rows = VecDeque::new();
    rows.push_back(row);
    Ok(StatementReply::single(ResultBlock {
        columns,
        rows,
        affected_rows: 0,
        warning_count: 0,
    }))
}

/// Splits a compound input into statements on top-level semicolons.
fn split_statements(sql: &str) -> Vec<String> {
    split_top_level(sql, ';')
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Splits on a separator, honoring quotes and parentheses.
fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => {
                    current.push(c);
                    quote = Some(c);
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth -= 1;
                    current.push(c);
                }
                c if c == separator && depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                }
                c => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Case-insensitive keyword position, outside quotes, on word boundaries.
/// `lower` must be the lowercase form of the scanned text; matches are
/// ASCII so the returned offset is always a char boundary.
fn find_keyword(lower: &str, keyword: &str) -> Option<usize> {
    let bytes = lower.as_bytes();
    let needle = keyword.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if c == b'\'' || c == b'"' || c == b'`' {
            quote = Some(c);
            i += 1;
            continue;
        }
        if bytes[i..].starts_with(needle) {
            let before_ok = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
            let after = i + needle.len();
            let after_ok = after >= bytes.len() || !bytes[after].is_ascii_alphanumeric();
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

fn strip_keywords<'a>(text: &'a str, keywords: &[&str]) -> Option<&'a str> {
    let mut rest = text;
    for keyword in keywords {
        let trimmed = rest.trim_start();
        if trimmed.len() < keyword.len()
            || !trimmed[..keyword.len()].eq_ignore_ascii_case(keyword)
        {
            return None;
        }
        let after = &trimmed[keyword.len()..];
        if !after.is_empty() && after.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        rest = after;
    }
    Some(rest)
}

fn split_qualified(target: &str) -> (Option<String>, String) {
    match split_top_level(target, '.').as_slice() {
        [schema, name] => (
            Some(unquote_ident(schema.trim())),
            unquote_ident(name.trim()),
        ),
        _ => (None, unquote_ident(target.trim())),
    }
}

fn unquote_ident(ident: &str) -> String {
    ident.trim().trim_matches('`').to_string()
}

fn parse_literal(text: &str) -> ShellResult<Value> {
    let text = text.trim();
    let upper = text.to_ascii_uppercase();
    if upper == "NULL" {
        return Ok(Value::Null);
    }
    if upper == "TRUE" {
        return Ok(Value::Bool(true));
    }
    if upper == "FALSE" {
        return Ok(Value::Bool(false));
    }
    if (text.starts_with('\'') && text.ends_with('\'') && text.len() >= 2)
        || (text.starts_with('"') && text.ends_with('"') && text.len() >= 2)
    {
        let inner = &text[1..text.len() - 1];
        return Ok(Value::from(inner.replace("''", "'")));
    }
    if text.contains('.') || text.to_ascii_lowercase().contains('e') {
        if let Ok(f) = text.parse::<f64>() {
            return Ok(Value::Float(f));
        }
    }
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return Ok(Value::UInteger(u));
    }
    Err(syntax_error(text))
}

fn syntax_error(near: &str) -> ShellError {
    let snippet: String = near.chars().take(40).collect();
    ShellError::sql(
        1064,
        "42000",
        format!("You have an error in your SQL syntax near '{}'", snippet),
    )
}

fn unknown_database(name: &str) -> ShellError {
    ShellError::sql(1049, "42000", format!("Unknown database '{}'", name))
}

fn unknown_table(schema: &str, table: &str) -> ShellError {
    ShellError::sql(
        1146,
        "42S02",
        format!("Table '{}.{}' doesn't exist", schema, table),
    )
}

fn unknown_column(name: &str) -> ShellError {
    ShellError::sql(
        1054,
        "42S22",
        format!("Unknown column '{}' in 'field list'", name),
    )
}

// ----------------------------------------------------------------------
// Condition evaluation shared by SQL and CRUD paths
// ----------------------------------------------------------------------

/// Evaluates `ident op operand [and ...]` against a field lookup. Operands
/// are literals or `:name` placeholders resolved from `binds`.
fn eval_condition(
    condition: &str,
    binds: &[(String, Value)],
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> ShellResult<bool> {
    let condition = condition.trim();
    if condition.is_empty() || condition.eq_ignore_ascii_case("true") || condition == "1" {
        return Ok(true);
    }
    let lower = condition.to_ascii_lowercase();
    let mut start = 0;
    loop {
        let end = find_keyword(&lower[start..], "and").map(|at| start + at);
        let term = match end {
            Some(at) => &condition[start..at],
            None => &condition[start..],
        };
        if !eval_term(term.trim(), binds, lookup)? {
            return Ok(false);
        }
        match end {
            Some(at) => start = at + "and".len(),
            None => return Ok(true),
        }
    }
}

fn eval_term(
    term: &str,
    binds: &[(String, Value)],
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> ShellResult<bool> {
    for op in ["==", "!=", "<>", ">=", "<=", "=", ">", "<"] {
        if let Some(at) = find_operator(term, op) {
            let field = unquote_ident(term[..at].trim());
            let operand = term[at + op.len()..].trim();
            let right = resolve_operand(operand, binds)?;
            let left = lookup(&field).unwrap_or(Value::Null);
            let ordering = compare_values(&left, &right);
            return Ok(match op {
                "=" | "==" => ordering == Some(Ordering::Equal),
                "!=" | "<>" => ordering.is_some() && ordering != Some(Ordering::Equal),
                ">" => ordering == Some(Ordering::Greater),
                "<" => ordering == Some(Ordering::Less),
                ">=" => matches!(ordering, Some(Ordering::Greater) | Some(Ordering::Equal)),
                "<=" => matches!(ordering, Some(Ordering::Less) | Some(Ordering::Equal)),
                _ => false,
            });
        }
    }
    Err(syntax_error(term))
}

fn find_operator(term: &str, op: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let chars: Vec<char> = term.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if c == '\'' || c == '"' || c == '`' {
            quote = Some(c);
            i += 1;
            continue;
        }
        if term[byte_index(term, i)..].starts_with(op) {
            return Some(byte_index(term, i));
        }
        i += 1;
    }
    None
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

fn resolve_operand(operand: &str, binds: &[(String, Value)]) -> ShellResult<Value> {
    if let Some(name) = operand.strip_prefix(':') {
        return binds
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                ShellError::UnboundParameter(format!(
                    "No value bound for placeholder {}",
                    name
                ))
            });
    }
    parse_literal(operand)
}

fn substitute_binds(condition: &str, binds: &[(String, Value)]) -> ShellResult<String> {
    let mut out = String::with_capacity(condition.len());
    let mut chars = condition.chars().peekable();
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
            None if c == ':' => {
                let mut name = String::new();
                while let Some(n) = chars.peek() {
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
                let value = binds
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| {
                        ShellError::UnboundParameter(format!(
                            "No value bound for placeholder {}",
                            name
                        ))
                    })?;
                match value {
                    Value::String(s) => out.push_str(&format!("'{}'", s.replace('\'', "''"))),
                    other => out.push_str(&other.descr()),
                }
            }
            None => out.push(c),
        }
    }
    Ok(out)
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::UInteger(x), Value::UInteger(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => {
            let x = numeric(a)?;
            let y = numeric(b)?;
            x.partial_cmp(&y)
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::UInteger(u) => Some(*u as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn match_document(
    filter: Option<&str>,
    doc: &ValueMap,
    binds: &[(String, Value)],
) -> ShellResult<bool> {
    match filter {
        None => Ok(true),
        Some(filter) => eval_condition(filter, binds, &|name| doc.get(name).cloned()),
    }
}

fn sort_documents(docs: &mut [ValueMap], sort: &[String]) -> ShellResult<()> {
    if sort.is_empty() {
        return Ok(());
    }
    let keys = parse_sort_keys(sort)?;
    docs.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = a.get(field).cloned().unwrap_or(Value::Null);
            let right = b.get(field).cloned().unwrap_or(Value::Null);
            let ordering = compare_values(&left, &right).unwrap_or(Ordering::Equal);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

fn sort_rows(rows: &mut [Vec<Value>], order: &str, columns: &[MemColumn]) -> ShellResult<()> {
    let entries: Vec<String> = split_top_level(order, ',')
        .into_iter()
        .map(|s| s.trim().to_string())
        .collect();
    let keys = parse_sort_keys(&entries)?;
    let mut resolved = Vec::new();
    for (field, descending) in keys {
        let index = columns
            .iter()
            .position(|c| c.name == field)
            .ok_or_else(|| unknown_column(&field))?;
        resolved.push((index, descending));
    }
    rows.sort_by(|a, b| {
        for (index, descending) in &resolved {
            let ordering = compare_values(&a[*index], &b[*index]).unwrap_or(Ordering::Equal);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

fn parse_sort_keys(entries: &[String]) -> ShellResult<Vec<(String, bool)>> {
    let mut keys = Vec::new();
    for entry in entries {
        let mut parts = entry.split_whitespace();
        let field = unquote_ident(parts.next().ok_or_else(|| syntax_error(entry))?);
        let descending = match parts.next() {
            None => false,
            Some(direction) if direction.eq_ignore_ascii_case("asc") => false,
            Some(direction) if direction.eq_ignore_ascii_case("desc") => true,
            Some(other) => return Err(syntax_error(other)),
        };
        keys.push((field, descending));
    }
    Ok(keys)
}

fn apply_window(docs: &mut Vec<ValueMap>, offset: Option<u64>, limit: Option<u64>) {
    if let Some(offset) = offset {
        let offset = offset.min(docs.len() as u64) as usize;
        docs.drain(..offset);
    }
    if let Some(limit) = limit {
        docs.truncate(limit as usize);
    }
}

fn apply_limit_clause(rows: &mut Vec<Vec<Value>>, clause: &str) -> ShellResult<()> {
    let lower = clause.to_ascii_lowercase();
    let (limit_text, offset_text) = match find_keyword(&lower, "offset") {
        Some(at) => (
            clause[..at].trim(),
            Some(clause[at + "offset".len()..].trim()),
        ),
        None => (clause.trim(), None),
    };
    let limit: usize = limit_text.parse().map_err(|_| syntax_error(clause))?;
    if let Some(offset_text) = offset_text {
        let offset: usize = offset_text.parse().map_err(|_| syntax_error(clause))?;
        let offset = offset.min(rows.len());
        rows.drain(..offset);
    }
    rows.truncate(limit);
    Ok(())
}

fn apply_modify_operation(doc: &mut ValueMap, operation: &ModifyOperation) -> ShellResult<()> {
    match operation {
        ModifyOperation::Set(field, value) => {
            doc.insert(field.clone(), value.clone());
        }
        ModifyOperation::Unset(fields) => {
            for field in fields {
                doc.remove(field);
            }
        }
        ModifyOperation::Merge(other) => {
            for (key, value) in other.iter() {
                doc.insert(key.to_string(), value.clone());
            }
        }
        ModifyOperation::ArrayAppend(field, value) => {
            let array = array_field(doc, field)?;
            array.borrow_mut().push(value.clone());
        }
        ModifyOperation::ArrayInsert(field, value) => {
            // `field[index]` addresses the insertion point.
            let (name, index) = match field.split_once('[') {
                Some((name, rest)) => {
                    let digits = rest.trim_end_matches(']');
                    let index: usize = digits.parse().map_err(|_| {
                        ShellError::ArgumentError(format!("Invalid document path: {}", field))
                    })?;
                    (name.to_string(), index)
                }
                None => (field.clone(), 0),
            };
            let array = array_field(doc, &name)?;
            let mut items = array.borrow_mut();
            let index = index.min(items.len());
            items.insert(index, value.clone());
        }
        ModifyOperation::ArrayDelete(field, value) => {
            let array = array_field(doc, field)?;
            array.borrow_mut().retain(|item| item != value);
        }
    }
    Ok(())
}

fn array_field(doc: &mut ValueMap, field: &str) -> ShellResult<crate::value::ArrayRef> {
    match doc.get(field) {
        Some(Value::Array(a)) => Ok(Rc::clone(a)),
        Some(other) => Err(ShellError::ArgumentError(format!(
            "Field {} is not an array: {}",
            field,
            other.descr()
        ))),
        None => {
            let value = Value::new_array();
            let array = value.as_array()?;
            doc.insert(field.to_string(), value);
            Ok(array)
        }
    }
}

fn table_value_to_value(value: &TableValue) -> ShellResult<Value> {
    match value {
        TableValue::Null => Ok(Value::Null),
        TableValue::Bool(b) => Ok(Value::Bool(*b)),
        TableValue::String(s) => Ok(Value::from(s.clone())),
        TableValue::SInt64(i) => Ok(Value::Integer(*i)),
        TableValue::UInt64(u) => Ok(Value::UInteger(*u)),
        TableValue::Double(f) => Ok(Value::Float(*f)),
        TableValue::Expression(text) => Err(ShellError::ProtocolError(format!(
            "Expressions are not evaluated by the memory driver: {}",
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> MemoryConnection {
        let driver = MemoryDriver::new();
        MemoryConnection {
            server: Rc::clone(&driver.server),
            current_schema: None,
            cancelled: false,
        }
    }

    #[test]
    fn test_select_literal_projection() {
        let mut conn = connection();
        let reply = conn.execute("select 1 as sample").unwrap();
        assert_eq!(reply.blocks.len(), 1);
        let block = &reply.blocks[0];
        assert_eq!(block.columns[0].name, "sample");
        assert_eq!(block.rows[0][0], Value::Integer(1));
    }

    #[test]
    fn test_schema_lifecycle() {
        let mut conn = connection();
        let reply = conn.execute("create schema shell_tests").unwrap();
        assert_eq!(reply.blocks[0].affected_rows, 1);

        let err = conn.execute("create schema shell_tests").unwrap_err();
        assert_eq!(err.kind(), "SqlError");

        let reply = conn.execute("drop schema if exists shell_tests").unwrap();
        assert_eq!(reply.blocks[0].affected_rows, 0);
        assert_eq!(reply.blocks[0].warning_count, 0);

        let reply = conn.execute("drop schema if exists shell_tests").unwrap();
        assert_eq!(reply.blocks[0].affected_rows, 0);
        assert_eq!(reply.blocks[0].warning_count, 1);
    }

    #[test]
    fn test_show_databases() {
        let mut conn = connection();
        conn.execute("create schema beta").unwrap();
        conn.execute("create schema alpha").unwrap();
        let reply = conn.execute("show databases").unwrap();
        let block = &reply.blocks[0];
        assert_eq!(block.columns[0].name, "Database");
        let names: Vec<String> = block
            .rows
            .iter()
            .map(|r| r[0].as_string().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_table_roundtrip() {
        let mut conn = connection();
        conn.execute("create schema shell_tests").unwrap();
        conn.execute(
            "CREATE TABLE `shell_tests`.`alpha` (`idalpha` int(11) NOT NULL, \
             `alphacol` varchar(45) DEFAULT NULL, PRIMARY KEY(`idalpha`))",
        )
        .unwrap();
        let reply = conn
            .execute(
                "INSERT INTO `shell_tests`.`alpha` VALUES(1, 'first'), (2, 'second'), (3, 'third')",
            )
            .unwrap();
        assert_eq!(reply.blocks[0].affected_rows, 3);

        let reply = conn.execute("select * from shell_tests.alpha").unwrap();
        let block = &reply.blocks[0];
        assert_eq!(block.columns.len(), 2);
        assert_eq!(block.columns[0].db, "shell_tests");
        assert_eq!(block.columns[0].name, "idalpha");
        assert_eq!(block.rows.len(), 3);
        assert_eq!(block.rows[0], vec![Value::Integer(1), Value::from("first")]);
    }

    #[test]
    fn test_select_where_order_limit() {
        let mut conn = connection();
        conn.execute("create schema s").unwrap();
        conn.execute("create table s.t (id int, name varchar(10))")
            .unwrap();
        conn.execute("insert into s.t values (1,'a'),(2,'b'),(3,'c')")
            .unwrap();

        let reply = conn.execute("select name from s.t where id > 1").unwrap();
        assert_eq!(reply.blocks[0].rows.len(), 2);

        let reply = conn
            .execute("select id from s.t order by id desc limit 2")
            .unwrap();
        let ids: Vec<i64> = reply.blocks[0]
            .rows
            .iter()
            .map(|r| r[0].as_int().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_use_and_unqualified_names() {
        let mut conn = connection();
        conn.execute("create schema s").unwrap();
        conn.execute("use s").unwrap();
        conn.execute("create table t (id int)").unwrap();
        conn.execute("insert into t values (7)").unwrap();
        let reply = conn.execute("select id from t").unwrap();
        assert_eq!(reply.blocks[0].rows[0][0], Value::Integer(7));

        let err = conn.execute("use missing").unwrap_err();
        assert_eq!(err.kind(), "SqlError");
    }

    #[test]
    fn test_compound_statement_multiple_blocks() {
        let mut conn = connection();
        let reply = conn
            .execute("select 1 as one; select 2 as two")
            .unwrap();
        assert_eq!(reply.blocks.len(), 2);
    }

    #[test]
    fn test_errors() {
        let mut conn = connection();
        let err = conn.execute("select * from hopefully.unexisting").unwrap_err();
        assert_eq!(err.kind(), "SqlError");
        let err = conn.execute("garbage statement").unwrap_err();
        assert_eq!(err.kind(), "SqlError");
    }

    #[test]
    fn test_cancel_interrupts_next_call() {
        let mut conn = connection();
        conn.cancel().unwrap();
        let err = conn.execute("select 1").unwrap_err();
        assert_eq!(err.kind(), "Interrupted");
        assert!(conn.execute("select 1").is_ok());
    }

    #[test]
    fn test_crud_document_flow() {
        let mut conn = connection();
        conn.execute("create schema s").unwrap();
        let mut doc1 = ValueMap::new();
        doc1.insert("_id", Value::from("a"));
        doc1.insert("age", Value::Integer(17));
        let mut doc2 = ValueMap::new();
        doc2.insert("_id", Value::from("b"));
        doc2.insert("age", Value::Integer(30));
        let reply = conn
            .execute_crud(&CrudRequest::Add(crate::db::backend::AddRequest {
                schema: "s".into(),
                collection: "people".into(),
                documents: vec![doc1, doc2],
            }))
            .unwrap();
        assert_eq!(reply.blocks[0].affected_rows, 2);

        let reply = conn
            .execute_crud(&CrudRequest::Find(crate::db::backend::FindRequest {
                schema: "s".into(),
                collection: "people".into(),
                filter: Some("age > :min".into()),
                binds: vec![("min".into(), Value::Integer(20))],
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(reply.blocks[0].rows.len(), 1);

        let reply = conn
            .execute_crud(&CrudRequest::Remove(crate::db::backend::RemoveRequest {
                schema: "s".into(),
                collection: "people".into(),
                filter: "age = 17".into(),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(reply.blocks[0].affected_rows, 1);
    }
}
