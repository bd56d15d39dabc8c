// Schema, collection and table bridges
// Navigation objects of the developer API. Ownership is one-way: a
// builder holds its collection, the collection holds its schema, the
// schema only weakly references the session.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::bridge::{ensure_count, string_arg, Member, ObjectBridge};
use crate::crud::collection::{CollectionAdd, CollectionFind, CollectionModify, CollectionRemove};
use crate::crud::table::{TableDelete, TableInsert, TableSelect, TableUpdate};
use crate::db::session::Session;
use crate::error::{ShellError, ShellResult};
use crate::value::Value;

pub struct Schema {
    session: Weak<Session>,
    name: String,
    me: RefCell<Weak<Schema>>,
}

impl Schema {
    pub fn new(session: Weak<Session>, name: &str) -> Rc<Schema> {
        let schema = Rc::new(Schema {
            session,
            name: name.to_string(),
            me: RefCell::new(Weak::new()),
        });
        *schema.me.borrow_mut() = Rc::downgrade(&schema);
        schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning session, if it is still around.
    pub fn session(&self) -> ShellResult<Rc<Session>> {
        self.session
            .upgrade()
            .ok_or_else(|| ShellError::session_closed("Schema"))
    }

    fn me(&self) -> ShellResult<Rc<Schema>> {
        self.me
            .borrow()
            .upgrade()
            .ok_or_else(|| ShellError::Internal("Schema handle expired".to_string()))
    }

    pub fn get_collection(&self, name: &str) -> ShellResult<Rc<Collection>> {
        Ok(Collection::new(self.me()?, name))
    }

    pub fn get_table(&self, name: &str) -> ShellResult<Rc<Table>> {
        Ok(Table::new(self.me()?, name))
    }
}

impl ObjectBridge for Schema {
    fn class_name(&self) -> &str {
        "Schema"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::property("name"),
            Member::method("getName"),
            Member::method("getCollection"),
            Member::method("getTable"),
        ]
    }

    fn get_property(&self, name: &str) -> ShellResult<Value> {
        match name {
            "name" => Ok(Value::from(self.name.clone())),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        match name {
            "getName" => {
                ensure_count("Schema.getName", &args, 0)?;
                Ok(Value::from(self.name.clone()))
            }
            "getCollection" => {
                ensure_count("Schema.getCollection", &args, 1)?;
                let target = string_arg("Schema.getCollection", &args, 0)?;
                Ok(Value::Object(self.get_collection(&target)?))
            }
            "getTable" => {
                ensure_count("Schema.getTable", &args, 1)?;
                let target = string_arg("Schema.getTable", &args, 0)?;
                Ok(Value::Object(self.get_table(&target)?))
            }
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn append_descr(&self) -> String {
        format!("<Schema:{}>", self.name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct Collection {
    schema: Rc<Schema>,
    name: String,
    me: RefCell<Weak<Collection>>,
}

impl Collection {
    pub fn new(schema: Rc<Schema>, name: &str) -> Rc<Collection> {
        let collection = Rc::new(Collection {
            schema,
            name: name.to_string(),
            me: RefCell::new(Weak::new()),
        });
        *collection.me.borrow_mut() = Rc::downgrade(&collection);
        collection
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    pub fn session(&self) -> ShellResult<Rc<Session>> {
        self.schema.session()
    }

    fn me(&self) -> ShellResult<Rc<Collection>> {
        self.me
            .borrow()
            .upgrade()
            .ok_or_else(|| ShellError::Internal("Collection handle expired".to_string()))
    }
}

impl ObjectBridge for Collection {
    fn class_name(&self) -> &str {
        "Collection"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::property("name"),
            Member::method("getName"),
            Member::method("add"),
            Member::method("find"),
            Member::method("modify"),
            Member::method("remove"),
        ]
    }

    fn get_property(&self, name: &str) -> ShellResult<Value> {
        match name {
            "name" => Ok(Value::from(self.name.clone())),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        match name {
            "getName" => {
                ensure_count("Collection.getName", &args, 0)?;
                Ok(Value::from(self.name.clone()))
            }
            // Each operation starts a fresh builder chain.
            "add" => CollectionAdd::new(self.me()?).call("add", args),
            "find" => CollectionFind::new(self.me()?).call("find", args),
            "modify" => CollectionModify::new(self.me()?).call("modify", args),
            "remove" => CollectionRemove::new(self.me()?).call("remove", args),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn append_descr(&self) -> String {
        format!("<Collection:{}>", self.name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct Table {
    schema: Rc<Schema>,
    name: String,
    me: RefCell<Weak<Table>>,
}

impl Table {
    pub fn new(schema: Rc<Schema>, name: &str) -> Rc<Table> {
        let table = Rc::new(Table {
            schema,
            name: name.to_string(),
            me: RefCell::new(Weak::new()),
        });
        *table.me.borrow_mut() = Rc::downgrade(&table);
        table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    pub fn session(&self) -> ShellResult<Rc<Session>> {
        self.schema.session()
    }

    fn me(&self) -> ShellResult<Rc<Table>> {
        self.me
            .borrow()
            .upgrade()
            .ok_or_else(|| ShellError::Internal("Table handle expired".to_string()))
    }
}

impl ObjectBridge for Table {
    fn class_name(&self) -> &str {
        "Table"
    }

    fn members(&self) -> Vec<Member> {
        vec![
            Member::property("name"),
            Member::method("getName"),
            Member::method("select"),
            Member::method("insert"),
            Member::method("update"),
            Member::method("delete"),
        ]
    }

    fn get_property(&self, name: &str) -> ShellResult<Value> {
        match name {
            "name" => Ok(Value::from(self.name.clone())),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        match name {
            "getName" => {
                ensure_count("Table.getName", &args, 0)?;
                Ok(Value::from(self.name.clone()))
            }
            "select" => TableSelect::new(self.me()?).call("select", args),
            "insert" => TableInsert::new(self.me()?).call("insert", args),
            "update" => TableUpdate::new(self.me()?).call("update", args),
            "delete" => TableDelete::new(self.me()?).call("delete", args),
            other => Err(ShellError::unknown_member(self.class_name(), other)),
        }
    }

    fn append_descr(&self) -> String {
        format!("<Table:{}>", self.name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
