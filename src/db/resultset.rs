// Result set bridge
// Cursor over the blocks of one executed statement. Holds only a weak
// reference back to its session; the session owns the connection.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::bridge::{ensure_count, opt_bool_arg, Member, ObjectBridge};
use crate::db::backend::{ResultBlock, StatementReply};
use crate::db::session::Session;
use crate::error::{ShellError, ShellResult};
use crate::value::{Value, ValueMap};

#[derive(Debug)]
pub struct ResultSet {
    session: Weak<Session>,
    current: RefCell<Option<ResultBlock>>,
    pending: RefCell<VecDeque<ResultBlock>>,
    fetched: Cell<u64>,
}

impl ResultSet {
    pub fn new(session: Weak<Session>, reply: StatementReply) -> Rc<ResultSet> {
        let mut blocks: VecDeque<ResultBlock> = reply.blocks.into();
        let current = blocks.pop_front();
        Rc::new(ResultSet {
            session,
            current: RefCell::new(current),
            pending: RefCell::new(blocks),
            fetched: Cell::new(0),
        })
    }

    pub fn session(&self) -> Option<Rc<Session>> {
        self.session.upgrade()
    }

    /// Next row as a map (column name to value), or as a plain array when
    /// `raw`. `Null` past the end.
    pub fn next_row(&self, raw: bool) -> Value {
        let mut current = self.current.borrow_mut();
        let block = match current.as_mut() {
            Some(block) => block,
            None => return Value::Null,
        };
        let row = match block.rows.pop_front() {
            Some(row) => row,
            None => return Value::Null,
        };
        self.fetched.set(self.fetched.get() + 1);
        if raw {
            Value::array_from(row)
        } else {
            let mut map = ValueMap::new();
            for (column, value) in block.columns.iter().zip(row) {
                map.insert(column.name.clone(), value);
            }
            Value::map_from(map)
        }
    }

    /// Remaining rows of the current block.
    pub fn fetch_all(&self, raw: bool) -> Value {
        let mut items = Vec::new();
        loop {
            let row = self.next_row(raw);
            if row.is_null() {
                break;
            }
            items.push(row);
        }
        Value::array_from(items)
    }

    /// Advances to the next block; `false` when none remains.
    pub fn next_result(&self) -> bool {
        match self.pending.borrow_mut().pop_front() {
            Some(block) => {
                *self.current.borrow_mut() = Some(block);
                self.fetched.set(0);
                true
            }
            None => false,
        }
    }

    pub fn has_data(&self) -> bool {
        self.current
            .borrow()
            .as_ref()
            .map(|b| b.has_data())
            .unwrap_or(false)
    }

    pub fn affected_rows(&self) -> u64 {
        self.current
            .borrow()
            .as_ref()
            .map(|b| b.affected_rows)
            .unwrap_or(0)
    }

    pub fn warning_count(&self) -> u64 {
        self.current
            .borrow()
            .as_ref()
            .map(|b| b.warning_count)
            .unwrap_or(0)
    }

    pub fn fetched_row_count(&self) -> u64 {
        self.fetched.get()
    }

    /// Field metadata for the current block, one map per column.
    pub fn column_metadata(&self) -> Value {
        let items = self
            .current
            .borrow()
            .as_ref()
            .map(|block| {
                block
                    .columns
                    .iter()
                    .map(|column| column.to_value())
                    .collect()
            })
            .unwrap_or_default();
        Value::array_from(items)
    }

    /// Drops every unread row; a later read sees the end of the result.
    pub fn invalidate(&self) {
        if let Some(block) = self.current.borrow_mut().as_mut() {
            block.rows.clear();
        }
        self.pending.borrow_mut().clear();
    }
}

impl ObjectBridge for ResultSet {
    fn class_name(&self) -> &str {
        "Result"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::property("affected_rows"),
            Member::property("warning_count"),
            Member::property("fetched_row_count"),
            Member::method("next"),
            Member::method("all"),
            Member::method("nextResult"),
            Member::method("getColumnMetadata"),
        ]
    }

    fn get_property(&self, name: &str) -> ShellResult<Value> {
        match name {
            "affected_rows" => Ok(Value::Integer(self.affected_rows() as i64)),
            "warning_count" => Ok(Value::Integer(self.warning_count() as i64)),
            "fetched_row_count" => Ok(Value::Integer(self.fetched_row_count() as i64)),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        match name {
            "next" => {
                let raw = opt_bool_arg("Result.next", &args, 0, false)?;
                Ok(self.next_row(raw))
            }
            "all" => {
                let raw = opt_bool_arg("Result.all", &args, 0, false)?;
                Ok(self.fetch_all(raw))
            }
            "nextResult" => {
                ensure_count("Result.nextResult", &args, 0)?;
                Ok(Value::Bool(self.next_result()))
            }
            "getColumnMetadata" => {
                ensure_count("Result.getColumnMetadata", &args, 0)?;
                Ok(self.column_metadata())
            }
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
