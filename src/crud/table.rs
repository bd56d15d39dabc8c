// Table CRUD builders
// select / insert / update / delete chains over a table. Row and
// assignment values are narrowed to typed table values before they reach
// the driver.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::bridge::{ensure_count, string_arg, uint_arg, Member, ObjectBridge};
use crate::crud::{string_list_args, BindLedger, DynamicFunctions};
use crate::db::backend::{
    CrudRequest, DeleteRequest, InsertRequest, SelectRequest, UpdateRequest,
};
use crate::db::schema::Table;
use crate::error::{ShellError, ShellResult};
use crate::value::{map_table_value, Value};

pub struct TableSelect {
    owner: Rc<Table>,
    dynamic: RefCell<DynamicFunctions>,
    request: RefCell<SelectRequest>,
    binds: RefCell<BindLedger>,
    me: RefCell<Weak<TableSelect>>,
}

impl TableSelect {
    pub fn new(owner: Rc<Table>) -> Rc<TableSelect> {
        let mut dynamic = DynamicFunctions::new();
        dynamic.register("select", &[""]);
        dynamic.register("where", &["select"]);
        dynamic.register("groupBy", &["select", "where"]);
        dynamic.register("having", &["groupBy"]);
        dynamic.register("orderBy", &["select", "where", "groupBy", "having"]);
        dynamic.register("limit", &["select", "where", "groupBy", "having", "orderBy"]);
        dynamic.register("offset", &["limit"]);
        dynamic.register(
            "bind",
            &[
                "select", "where", "groupBy", "having", "orderBy", "limit", "offset", "bind",
            ],
        );
        dynamic.register(
            "execute",
            &[
                "select", "where", "groupBy", "having", "orderBy", "limit", "offset", "bind",
            ],
        );
        let builder = Rc::new(TableSelect {
            owner,
            dynamic: RefCell::new(dynamic),
            request: RefCell::new(SelectRequest::default()),
            binds: RefCell::new(BindLedger::default()),
            me: RefCell::new(Weak::new()),
        });
        *builder.me.borrow_mut() = Rc::downgrade(&builder);
        builder
    }

    fn this(&self) -> ShellResult<Value> {
        self.me
            .borrow()
            .upgrade()
            .map(|rc| Value::Object(rc))
            .ok_or_else(|| ShellError::Internal("Builder handle expired".to_string()))
    }
}

impl ObjectBridge for TableSelect {
    fn class_name(&self) -> &str {
        "TableSelect"
    }

    fn members(&self) -> Vec<Member> {
        self.dynamic.borrow().enabled_members()
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        self.dynamic.borrow().check_call(self.class_name(), name)?;
        let api = format!("{}.{}", self.class_name(), name);
        match name {
            "select" => {
                if !args.is_empty() {
                    self.request.borrow_mut().columns = string_list_args(&api, &args)?;
                }
            }
            "where" => {
                ensure_count(&api, &args, 1)?;
                let condition = string_arg(&api, &args, 0)?;
                self.binds.borrow_mut().declare_from(&condition);
                self.request.borrow_mut().condition = Some(condition);
            }
            "groupBy" => {
                let grouping = string_list_args(&api, &args)?;
                if grouping.is_empty() {
                    return Err(ShellError::argument(&api, "Grouping criteria can not be empty"));
                }
                self.request.borrow_mut().group_by = grouping;
            }
            "having" => {
                ensure_count(&api, &args, 1)?;
                let condition = string_arg(&api, &args, 0)?;
                self.binds.borrow_mut().declare_from(&condition);
                self.request.borrow_mut().having = Some(condition);
            }
            "orderBy" => {
                let ordering = string_list_args(&api, &args)?;
                if ordering.is_empty() {
                    return Err(ShellError::argument(&api, "Order criteria can not be empty"));
                }
                self.request.borrow_mut().order_by = ordering;
            }
            "limit" => {
                ensure_count(&api, &args, 1)?;
                self.request.borrow_mut().limit = Some(uint_arg(&api, &args, 0)?);
            }
            "offset" => {
                ensure_count(&api, &args, 1)?;
                self.request.borrow_mut().offset = Some(uint_arg(&api, &args, 0)?);
            }
            "bind" => {
                ensure_count(&api, &args, 2)?;
                let placeholder = string_arg(&api, &args, 0)?;
                self.binds
                    .borrow_mut()
                    .bind(&api, &placeholder, args[1].clone())?;
            }
            "execute" => {
                ensure_count(&api, &args, 0)?;
                self.binds.borrow().ensure_all_bound(&api)?;
                let session = self.owner.session()?;
                let mut request = self.request.borrow().clone();
                request.schema = self.owner.schema().name().to_string();
                request.table = self.owner.name().to_string();
                request.binds = self.binds.borrow().bound_values();
                let result = session.execute_crud(&api, &CrudRequest::Select(request))?;
                self.dynamic.borrow_mut().update(name);
                return Ok(Value::Object(result));
            }
            other => return Err(ShellError::unknown_member(self.class_name(), other)),
        }
        self.dynamic.borrow_mut().update(name);
        self.this()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct TableInsert {
    owner: Rc<Table>,
    dynamic: RefCell<DynamicFunctions>,
    request: RefCell<InsertRequest>,
    me: RefCell<Weak<TableInsert>>,
}

impl TableInsert {
    pub fn new(owner: Rc<Table>) -> Rc<TableInsert> {
        let mut dynamic = DynamicFunctions::new();
        dynamic.register("insert", &[""]);
        dynamic.register("values", &["insert", "values"]);
        dynamic.register("execute", &["values"]);
        let builder = Rc::new(TableInsert {
            owner,
            dynamic: RefCell::new(dynamic),
            request: RefCell::new(InsertRequest::default()),
            me: RefCell::new(Weak::new()),
        });
        *builder.me.borrow_mut() = Rc::downgrade(&builder);
        builder
    }

    fn this(&self) -> ShellResult<Value> {
        self.me
            .borrow()
            .upgrade()
            .map(|rc| Value::Object(rc))
            .ok_or_else(|| ShellError::Internal("Builder handle expired".to_string()))
    }
}

impl ObjectBridge for TableInsert {
    fn class_name(&self) -> &str {
        "TableInsert"
    }

    fn members(&self) -> Vec<Member> {
        self.dynamic.borrow().enabled_members()
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        self.dynamic.borrow().check_call(self.class_name(), name)?;
        let api = format!("{}.{}", self.class_name(), name);
        match name {
            "insert" => {
                if !args.is_empty() {
                    self.request.borrow_mut().columns = string_list_args(&api, &args)?;
                }
            }
            "values" => {
                if args.is_empty() {
                    return Err(ShellError::argument_count(&api, 1, 0));
                }
                let declared = self.request.borrow().columns.len();
                if declared > 0 && args.len() != declared {
                    return Err(ShellError::argument(
                        &api,
                        format!(
                            "Unexpected number of values, expected {} but got {}",
                            declared,
                            args.len()
                        ),
                    ));
                }
                let row = args
                    .iter()
                    .map(map_table_value)
                    .collect::<ShellResult<Vec<_>>>()?;
                self.request.borrow_mut().rows.push(row);
            }
            "execute" => {
                ensure_count(&api, &args, 0)?;
                let session = self.owner.session()?;
                let mut request = self.request.borrow().clone();
                request.schema = self.owner.schema().name().to_string();
                request.table = self.owner.name().to_string();
                let result = session.execute_crud(&api, &CrudRequest::Insert(request))?;
                self.dynamic.borrow_mut().update(name);
                return Ok(Value::Object(result));
            }
            other => return Err(ShellError::unknown_member(self.class_name(), other)),
        }
        self.dynamic.borrow_mut().update(name);
        self.this()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct TableUpdate {
    owner: Rc<Table>,
    dynamic: RefCell<DynamicFunctions>,
    request: RefCell<UpdateRequest>,
    binds: RefCell<BindLedger>,
    me: RefCell<Weak<TableUpdate>>,
}

impl TableUpdate {
    pub fn new(owner: Rc<Table>) -> Rc<TableUpdate> {
        let mut dynamic = DynamicFunctions::new();
        dynamic.register("update", &[""]);
        dynamic.register("set", &["update", "set"]);
        dynamic.register("where", &["set"]);
        dynamic.register("orderBy", &["set", "where"]);
        dynamic.register("limit", &["set", "where", "orderBy"]);
        dynamic.register("bind", &["set", "where", "orderBy", "limit", "bind"]);
        dynamic.register("execute", &["set", "where", "orderBy", "limit", "bind"]);
        let builder = Rc::new(TableUpdate {
            owner,
            dynamic: RefCell::new(dynamic),
            request: RefCell::new(UpdateRequest::default()),
            binds: RefCell::new(BindLedger::default()),
            me: RefCell::new(Weak::new()),
        });
        *builder.me.borrow_mut() = Rc::downgrade(&builder);
        builder
    }

    fn this(&self) -> ShellResult<Value> {
        self.me
            .borrow()
            .upgrade()
            .map(|rc| Value::Object(rc))
            .ok_or_else(|| ShellError::Internal("Builder handle expired".to_string()))
    }
}

impl ObjectBridge for TableUpdate {
    fn class_name(&self) -> &str {
        "TableUpdate"
    }

    fn members(&self) -> Vec<Member> {
        self.dynamic.borrow().enabled_members()
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        self.dynamic.borrow().check_call(self.class_name(), name)?;
        let api = format!("{}.{}", self.class_name(), name);
        match name {
            "update" => {
                ensure_count(&api, &args, 0)?;
            }
            "set" => {
                ensure_count(&api, &args, 2)?;
                let column = string_arg(&api, &args, 0)?;
                let value = map_table_value(&args[1])?;
                self.request.borrow_mut().assignments.push((column, value));
            }
            "where" => {
                ensure_count(&api, &args, 1)?;
                let condition = string_arg(&api, &args, 0)?;
                self.binds.borrow_mut().declare_from(&condition);
                self.request.borrow_mut().condition = Some(condition);
            }
            "orderBy" => {
                let ordering = string_list_args(&api, &args)?;
                if ordering.is_empty() {
                    return Err(ShellError::argument(&api, "Order criteria can not be empty"));
                }
                self.request.borrow_mut().order_by = ordering;
            }
            "limit" => {
                ensure_count(&api, &args, 1)?;
                self.request.borrow_mut().limit = Some(uint_arg(&api, &args, 0)?);
            }
            "bind" => {
                ensure_count(&api, &args, 2)?;
                let placeholder = string_arg(&api, &args, 0)?;
                self.binds
                    .borrow_mut()
                    .bind(&api, &placeholder, args[1].clone())?;
            }
            "execute" => {
                ensure_count(&api, &args, 0)?;
                self.binds.borrow().ensure_all_bound(&api)?;
                let session = self.owner.session()?;
                let mut request = self.request.borrow().clone();
                request.schema = self.owner.schema().name().to_string();
                request.table = self.owner.name().to_string();
                request.binds = self.binds.borrow().bound_values();
                let result = session.execute_crud(&api, &CrudRequest::Update(request))?;
                self.dynamic.borrow_mut().update(name);
                return Ok(Value::Object(result));
            }
            other => return Err(ShellError::unknown_member(self.class_name(), other)),
        }
        self.dynamic.borrow_mut().update(name);
        self.this()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct TableDelete {
    owner: Rc<Table>,
    dynamic: RefCell<DynamicFunctions>,
    request: RefCell<DeleteRequest>,
    binds: RefCell<BindLedger>,
    me: RefCell<Weak<TableDelete>>,
}

impl TableDelete {
    pub fn new(owner: Rc<Table>) -> Rc<TableDelete> {
        let mut dynamic = DynamicFunctions::new();
        dynamic.register("delete", &[""]);
        dynamic.register("where", &["delete"]);
        dynamic.register("orderBy", &["delete", "where"]);
        dynamic.register("limit", &["delete", "where", "orderBy"]);
        dynamic.register("bind", &["delete", "where", "orderBy", "limit", "bind"]);
        dynamic.register("execute", &["delete", "where", "orderBy", "limit", "bind"]);
        let builder = Rc::new(TableDelete {
            owner,
            dynamic: RefCell::new(dynamic),
            request: RefCell::new(DeleteRequest::default()),
            binds: RefCell::new(BindLedger::default()),
            me: RefCell::new(Weak::new()),
        });
        *builder.me.borrow_mut() = Rc::downgrade(&builder);
        builder
    }

    fn this(&self) -> ShellResult<Value> {
        self.me
            .borrow()
            .upgrade()
            .map(|rc| Value::Object(rc))
            .ok_or_else(|| ShellError::Internal("Builder handle expired".to_string()))
    }
}

impl ObjectBridge for TableDelete {
    fn class_name(&self) -> &str {
        "TableDelete"
    }

    fn members(&self) -> Vec<Member> {
        self.dynamic.borrow().enabled_members()
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        self.dynamic.borrow().check_call(self.class_name(), name)?;
        let api = format!("{}.{}", self.class_name(), name);
        match name {
            "delete" => {
                ensure_count(&api, &args, 0)?;
            }
            "where" => {
                ensure_count(&api, &args, 1)?;
                let condition = string_arg(&api, &args, 0)?;
                self.binds.borrow_mut().declare_from(&condition);
                self.request.borrow_mut().condition = Some(condition);
            }
            "orderBy" => {
                let ordering = string_list_args(&api, &args)?;
                if ordering.is_empty() {
                    return Err(ShellError::argument(&api, "Order criteria can not be empty"));
                }
                self.request.borrow_mut().order_by = ordering;
            }
            "limit" => {
                ensure_count(&api, &args, 1)?;
                self.request.borrow_mut().limit = Some(uint_arg(&api, &args, 0)?);
            }
            "bind" => {
                ensure_count(&api, &args, 2)?;
                let placeholder = string_arg(&api, &args, 0)?;
                self.binds
                    .borrow_mut()
                    .bind(&api, &placeholder, args[1].clone())?;
            }
            "execute" => {
                ensure_count(&api, &args, 0)?;
                self.binds.borrow().ensure_all_bound(&api)?;
                let session = self.owner.session()?;
                let mut request = self.request.borrow().clone();
                request.schema = self.owner.schema().name().to_string();
                request.table = self.owner.name().to_string();
                request.binds = self.binds.borrow().bound_values();
                let result = session.execute_crud(&api, &CrudRequest::Delete(request))?;
                self.dynamic.borrow_mut().update(name);
                return Ok(Value::Object(result));
            }
            other => return Err(ShellError::unknown_member(self.class_name(), other)),
        }
        self.dynamic.borrow_mut().update(name);
        self.this()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
