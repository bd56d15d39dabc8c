// Collection CRUD builders
// find / add / modify / remove chains over a collection. Every chain is
// one object whose legal methods follow the dynamic-function table; the
// actual work happens at execute().

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::bridge::{
    ensure_count, ensure_count_range, map_arg, string_arg, uint_arg, Expression, Member,
    ObjectBridge,
};
use crate::crud::{string_list_args, BindLedger, DynamicFunctions};
use crate::db::backend::{
    AddRequest, CrudRequest, FindRequest, ModifyOperation, ModifyRequest, RemoveRequest,
};
use crate::db::schema::Collection;
use crate::error::{ShellError, ShellResult};
use crate::value::{Value, ValueMap};

const MODIFY_OPS: [&str; 6] = [
    "set",
    "unset",
    "merge",
    "arrayInsert",
    "arrayAppend",
    "arrayDelete",
];

/// A string argument that may also arrive as an `Expression` bridge.
fn expr_or_string_arg(api: &str, args: &[Value], index: usize) -> ShellResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Object(object)) => match Expression::from_bridge(object) {
            Some(expression) => Ok(expression.data().to_string()),
            None => Err(ShellError::argument_kind(api, index + 1, "string or expression")),
        },
        _ => Err(ShellError::argument_kind(api, index + 1, "string or expression")),
    }
}

// ----------------------------------------------------------------------
// find
// ----------------------------------------------------------------------

pub struct CollectionFind {
    owner: Rc<Collection>,
    dynamic: RefCell<DynamicFunctions>,
    request: RefCell<FindRequest>,
    binds: RefCell<BindLedger>,
    me: RefCell<Weak<CollectionFind>>,
}

impl CollectionFind {
    pub fn new(owner: Rc<Collection>) -> Rc<CollectionFind> {
        let mut dynamic = DynamicFunctions::new();
        dynamic.register("find", &[""]);
        dynamic.register("fields", &["find"]);
        dynamic.register("groupBy", &["find", "fields"]);
        dynamic.register("having", &["groupBy"]);
        dynamic.register("sort", &["find", "fields", "groupBy", "having"]);
        dynamic.register("limit", &["find", "fields", "groupBy", "having", "sort"]);
        dynamic.register("offset", &["limit"]);
        dynamic.register("skip", &["limit"]);
        dynamic.register(
            "bind",
            &[
                "find", "fields", "groupBy", "having", "sort", "limit", "offset", "skip", "bind",
            ],
        );
        dynamic.register(
            "execute",
            &[
                "find", "fields", "groupBy", "having", "sort", "limit", "offset", "skip", "bind",
            ],
        );
        let builder = Rc::new(CollectionFind {
            owner,
            dynamic: RefCell::new(dynamic),
            request: RefCell::new(FindRequest::default()),
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

impl ObjectBridge for CollectionFind {
    fn class_name(&self) -> &str {
        "CollectionFind"
    }

    fn members(&self) -> Vec<Member> {
        self.dynamic.borrow().enabled_members()
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        self.dynamic.borrow().check_call(self.class_name(), name)?;
        let api = format!("{}.{}", self.class_name(), name);
        match name {
            "find" => {
                ensure_count_range(&api, &args, 0, 1)?;
                if !args.is_empty() {
                    let filter = expr_or_string_arg(&api, &args, 0)?;
                    self.binds.borrow_mut().declare_from(&filter);
                    self.request.borrow_mut().filter = Some(filter);
                }
            }
            "fields" => {
                let fields = string_list_args(&api, &args)?;
                if fields.is_empty() {
                    return Err(ShellError::argument(
                        &api,
                        "Field selection criteria can not be empty",
                    ));
                }
                self.request.borrow_mut().fields = fields;
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
                let condition = expr_or_string_arg(&api, &args, 0)?;
                self.binds.borrow_mut().declare_from(&condition);
                self.request.borrow_mut().having = Some(condition);
            }
            "sort" => {
                let sort = string_list_args(&api, &args)?;
                if sort.is_empty() {
                    return Err(ShellError::argument(&api, "Sort criteria can not be empty"));
                }
                self.request.borrow_mut().sort = sort;
            }
            "limit" => {
                ensure_count(&api, &args, 1)?;
                self.request.borrow_mut().limit = Some(uint_arg(&api, &args, 0)?);
            }
            "offset" | "skip" => {
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
                request.collection = self.owner.name().to_string();
                request.binds = self.binds.borrow().bound_values();
                let result = session.execute_crud(&api, &CrudRequest::Find(request))?;
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

// ----------------------------------------------------------------------
// add
// ----------------------------------------------------------------------

pub struct CollectionAdd {
    owner: Rc<Collection>,
    dynamic: RefCell<DynamicFunctions>,
    documents: RefCell<Vec<ValueMap>>,
    binds: RefCell<BindLedger>,
    me: RefCell<Weak<CollectionAdd>>,
}

impl CollectionAdd {
    pub fn new(owner: Rc<Collection>) -> Rc<CollectionAdd> {
        let mut dynamic = DynamicFunctions::new();
        dynamic.register("add", &["", "add", "bind"]);
        dynamic.register("bind", &["add", "bind"]);
        dynamic.register("execute", &["add", "bind"]);
        let builder = Rc::new(CollectionAdd {
            owner,
            dynamic: RefCell::new(dynamic),
            documents: RefCell::new(Vec::new()),
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

    /// Stages one document, assigning a fresh `_id` into the shared map
    /// when the caller did not provide one. Strings are accepted as JSON
    /// documents.
    fn stage(&self, api: &str, value: &Value) -> ShellResult<()> {
        let handle = match value {
            Value::Map(map) => Rc::clone(map),
            Value::String(text) => {
                let json: serde_json::Value = serde_json::from_str(text).map_err(|_| {
                    ShellError::argument(
                        api,
                        "Argument is expected to be a document or a list of documents",
                    )
                })?;
                match Value::from_json(&json) {
                    Value::Map(map) => map,
                    _ => {
                        return Err(ShellError::argument(
                            api,
                            "Argument is expected to be a document or a list of documents",
                        ))
                    }
                }
            }
            _ => {
                return Err(ShellError::argument(
                    api,
                    "Argument is expected to be a document or a list of documents",
                ))
            }
        };
        if !handle.borrow().contains_key("_id") {
            let id = self.owner.session()?.generate_document_id()?;
            handle.borrow_mut().insert("_id", Value::from(id));
        }
        self.documents.borrow_mut().push(handle.borrow().clone());
        Ok(())
    }
}

impl ObjectBridge for CollectionAdd {
    fn class_name(&self) -> &str {
        "CollectionAdd"
    }

    fn members(&self) -> Vec<Member> {
        self.dynamic.borrow().enabled_members()
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        self.dynamic.borrow().check_call(self.class_name(), name)?;
        let api = format!("{}.{}", self.class_name(), name);
        match name {
            "add" => {
                ensure_count(&api, &args, 1)?;
                match &args[0] {
                    Value::Array(items) => {
                        for item in items.borrow().iter() {
                            self.stage(&api, item)?;
                        }
                    }
                    other => self.stage(&api, other)?,
                }
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
                let request = AddRequest {
                    schema: self.owner.schema().name().to_string(),
                    collection: self.owner.name().to_string(),
                    documents: self.documents.borrow().clone(),
                };
                let result = session.execute_crud(&api, &CrudRequest::Add(request))?;
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

// ----------------------------------------------------------------------
// modify
// ----------------------------------------------------------------------

pub struct CollectionModify {
    owner: Rc<Collection>,
    dynamic: RefCell<DynamicFunctions>,
    request: RefCell<ModifyRequest>,
    binds: RefCell<BindLedger>,
    me: RefCell<Weak<CollectionModify>>,
}

impl CollectionModify {
    pub fn new(owner: Rc<Collection>) -> Rc<CollectionModify> {
        let mut dynamic = DynamicFunctions::new();
        let after_ops: Vec<&str> = MODIFY_OPS.to_vec();
        let mut after_ops_sort = after_ops.clone();
        after_ops_sort.push("sort");
        let mut after_ops_limit = after_ops_sort.clone();
        after_ops_limit.push("limit");
        let mut after_ops_bind = after_ops_limit.clone();
        after_ops_bind.push("bind");

        dynamic.register("modify", &[""]);
        let mut op_sources: Vec<&str> = vec!["modify"];
        op_sources.extend(MODIFY_OPS);
        for op in MODIFY_OPS {
            dynamic.register(op, &op_sources);
        }
        dynamic.register("sort", &after_ops);
        dynamic.register("limit", &after_ops_sort);
        dynamic.register("bind", &after_ops_bind);
        dynamic.register("execute", &after_ops_bind);

        let builder = Rc::new(CollectionModify {
            owner,
            dynamic: RefCell::new(dynamic),
            request: RefCell::new(ModifyRequest::default()),
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

impl ObjectBridge for CollectionModify {
    fn class_name(&self) -> &str {
        "CollectionModify"
    }

    fn members(&self) -> Vec<Member> {
        self.dynamic.borrow().enabled_members()
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        self.dynamic.borrow().check_call(self.class_name(), name)?;
        let api = format!("{}.{}", self.class_name(), name);
        match name {
            "modify" => {
                ensure_count_range(&api, &args, 0, 1)?;
                if !args.is_empty() {
                    let filter = expr_or_string_arg(&api, &args, 0)?;
                    self.binds.borrow_mut().declare_from(&filter);
                    self.request.borrow_mut().filter = filter;
                }
            }
            "set" => {
                ensure_count(&api, &args, 2)?;
                let field = string_arg(&api, &args, 0)?;
                self.request
                    .borrow_mut()
                    .operations
                    .push(ModifyOperation::Set(field, args[1].clone()));
            }
            "unset" => {
                let fields = string_list_args(&api, &args)?;
                if fields.is_empty() {
                    return Err(ShellError::argument(&api, "Unset criteria can not be empty"));
                }
                self.request
                    .borrow_mut()
                    .operations
                    .push(ModifyOperation::Unset(fields));
            }
            "merge" => {
                ensure_count(&api, &args, 1)?;
                let document = map_arg(&api, &args, 0)?;
                let document = document.borrow().clone();
                self.request
                    .borrow_mut()
                    .operations
                    .push(ModifyOperation::Merge(document));
            }
            "arrayInsert" | "arrayAppend" | "arrayDelete" => {
                ensure_count(&api, &args, 2)?;
                let path = string_arg(&api, &args, 0)?;
                let value = args[1].clone();
                let operation = match name {
                    "arrayInsert" => ModifyOperation::ArrayInsert(path, value),
                    "arrayAppend" => ModifyOperation::ArrayAppend(path, value),
                    _ => ModifyOperation::ArrayDelete(path, value),
                };
                self.request.borrow_mut().operations.push(operation);
            }
            "sort" => {
                let sort = string_list_args(&api, &args)?;
                if sort.is_empty() {
                    return Err(ShellError::argument(&api, "Sort criteria can not be empty"));
                }
                self.request.borrow_mut().sort = sort;
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
                request.collection = self.owner.name().to_string();
                request.binds = self.binds.borrow().bound_values();
                let result = session.execute_crud(&api, &CrudRequest::Modify(request))?;
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

// ----------------------------------------------------------------------
// remove
// ----------------------------------------------------------------------

pub struct CollectionRemove {
    owner: Rc<Collection>,
    dynamic: RefCell<DynamicFunctions>,
    request: RefCell<RemoveRequest>,
    binds: RefCell<BindLedger>,
    me: RefCell<Weak<CollectionRemove>>,
}

impl CollectionRemove {
    pub fn new(owner: Rc<Collection>) -> Rc<CollectionRemove> {
        let mut dynamic = DynamicFunctions::new();
        dynamic.register("remove", &[""]);
        dynamic.register("sort", &["remove"]);
        dynamic.register("limit", &["remove", "sort"]);
        dynamic.register("bind", &["remove", "sort", "limit", "bind"]);
        dynamic.register("execute", &["remove", "sort", "limit", "bind"]);
        let builder = Rc::new(CollectionRemove {
            owner,
            dynamic: RefCell::new(dynamic),
            request: RefCell::new(RemoveRequest::default()),
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

impl ObjectBridge for CollectionRemove {
    fn class_name(&self) -> &str {
        "CollectionRemove"
    }

    fn members(&self) -> Vec<Member> {
        self.dynamic.borrow().enabled_members()
    }

    fn call(&self, name: &str, args: Vec<Value>) -> ShellResult<Value> {
        self.dynamic.borrow().check_call(self.class_name(), name)?;
        let api = format!("{}.{}", self.class_name(), name);
        match name {
            "remove" => {
                ensure_count_range(&api, &args, 0, 1)?;
                if !args.is_empty() {
                    let filter = expr_or_string_arg(&api, &args, 0)?;
                    self.binds.borrow_mut().declare_from(&filter);
                    self.request.borrow_mut().filter = filter;
                }
            }
            "sort" => {
                let sort = string_list_args(&api, &args)?;
                if sort.is_empty() {
                    return Err(ShellError::argument(&api, "Sort criteria can not be empty"));
                }
                self.request.borrow_mut().sort = sort;
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
                request.collection = self.owner.name().to_string();
                request.binds = self.binds.borrow().bound_values();
                let result = session.execute_crud(&api, &CrudRequest::Remove(request))?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::get_member;
    use crate::db::drivers::default_registry;
    use crate::db::resultset::ResultSet;
    use crate::db::session::{Session, SessionKind};
    use crate::uri::ConnectionData;
    use crate::value::BridgeRef;

    // The session must stay alive beside the collection; schemas only hold
    // a weak reference to it.
    fn fixture() -> (Rc<Session>, Rc<Collection>) {
        let registry = default_registry();
        let data = ConnectionData::parse("root@localhost").unwrap();
        let session = Session::connect(SessionKind::X, data, &registry).unwrap();
        session.sql("create schema docs", &Value::Undefined).unwrap();
        let collection = session
            .get_schema("docs")
            .unwrap()
            .get_collection("people")
            .unwrap();
        (session, collection)
    }

    fn doc(pairs: &[(&str, Value)]) -> Value {
        let mut map = ValueMap::new();
        for (key, value) in pairs {
            map.insert(*key, value.clone());
        }
        Value::map_from(map)
    }

    fn affected(result: &Value) -> i64 {
        let object = result.as_object().unwrap();
        object.get_property("affected_rows").unwrap().as_int().unwrap()
    }

    fn seed(collection: &Rc<Collection>) {
        let add = CollectionAdd::new(Rc::clone(collection));
        add.call(
            "add",
            vec![Value::array_from(vec![
                doc(&[("name", Value::from("jack")), ("age", Value::Integer(17))]),
                doc(&[("name", Value::from("adam")), ("age", Value::Integer(15))]),
                doc(&[("name", Value::from("alma")), ("age", Value::Integer(13))]),
            ])],
        )
        .unwrap();
        let result = add.call("execute", vec![]).unwrap();
        assert_eq!(affected(&result), 3);
    }

    #[test]
    fn test_add_assigns_document_ids() {
        let (_session, collection) = fixture();
        let document = doc(&[("name", Value::from("solo"))]);
        let add = CollectionAdd::new(Rc::clone(&collection));
        add.call("add", vec![document.clone()]).unwrap();
        add.call("execute", vec![]).unwrap();
        // The caller's shared document got the generated id.
        assert!(document.as_map().unwrap().borrow().contains_key("_id"));
    }

    #[test]
    fn test_add_on_closed_session() {
        let (session, collection) = fixture();
        session.close();
        // The missing _id would need the session's id generator.
        let add = CollectionAdd::new(Rc::clone(&collection));
        let err = add
            .call("add", vec![doc(&[("name", Value::from("late"))])])
            .unwrap_err();
        assert_eq!(err.kind(), "SessionClosed");
    }

    #[test]
    fn test_add_accepts_json_strings() {
        let (_session, collection) = fixture();
        let add = CollectionAdd::new(Rc::clone(&collection));
        add.call("add", vec![Value::from("{\"name\": \"nut\", \"qty\": 4}")])
            .unwrap();
        let result = add.call("execute", vec![]).unwrap();
        assert_eq!(affected(&result), 1);

        let bad = CollectionAdd::new(Rc::clone(&collection));
        let err = bad.call("add", vec![Value::from("not json")]).unwrap_err();
        assert!(err
            .to_string()
            .contains("expected to be a document or a list of documents"));
    }

    #[test]
    fn test_find_chain_with_bind() {
        let (_session, collection) = fixture();
        seed(&collection);
        let find = CollectionFind::new(Rc::clone(&collection));
        find.call("find", vec![Value::from("age > :min")]).unwrap();
        find.call("sort", vec![Value::from("age desc")]).unwrap();
        find.call("limit", vec![Value::Integer(2)]).unwrap();
        find.call("bind", vec![Value::from("min"), Value::Integer(14)])
            .unwrap();
        let result = find.call("execute", vec![]).unwrap();
        let object = result.as_object().unwrap();
        let rows = object.call("all", vec![]).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.borrow().len(), 2);
        // Documents come back under the doc column, sorted by age.
        let first = rows.borrow()[0].clone();
        assert!(first.descr().contains("\"jack\""));
    }

    #[test]
    fn test_unbound_placeholder_fails_execute() {
        let (_session, collection) = fixture();
        seed(&collection);
        let find = CollectionFind::new(Rc::clone(&collection));
        find.call("find", vec![Value::from("age > :min")]).unwrap();
        let err = find.call("execute", vec![]).unwrap_err();
        assert_eq!(err.kind(), "UnboundParameter");
        assert!(err.to_string().contains("min"));
    }

    #[test]
    fn test_invalid_chaining() {
        let (_session, collection) = fixture();
        let find = CollectionFind::new(Rc::clone(&collection));
        find.call("find", vec![]).unwrap();

        // offset before limit is out of order.
        let err = find.call("offset", vec![Value::Integer(1)]).unwrap_err();
        assert_eq!(err.kind(), "InvalidCallOrder");

        find.call("limit", vec![Value::Integer(1)]).unwrap();
        find.call("offset", vec![Value::Integer(1)]).unwrap();

        // limit may not repeat.
        let err = find.call("limit", vec![Value::Integer(2)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CollectionFind.limit: Invalid chaining of method limit"
        );
    }

    #[test]
    fn test_having_requires_group_by() {
        let (_session, collection) = fixture();
        let find = CollectionFind::new(Rc::clone(&collection));
        find.call("find", vec![]).unwrap();
        let err = find
            .call("having", vec![Value::from("count > 1")])
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidCallOrder");
    }

    #[test]
    fn test_members_follow_state() {
        let (_session, collection) = fixture();
        let find = CollectionFind::new(Rc::clone(&collection));
        find.call("find", vec![]).unwrap();
        let bridge: BridgeRef = find;
        let names: Vec<String> = bridge.members().into_iter().map(|m| m.name).collect();
        assert!(names.contains(&"limit".to_string()));
        assert!(!names.contains(&"offset".to_string()));
        // Reading a state-disabled method is an unknown member.
        let err = get_member(&bridge, "offset").unwrap_err();
        assert_eq!(err.kind(), "UnknownMember");
    }

    #[test]
    fn test_modify_and_remove_flow() {
        let (_session, collection) = fixture();
        seed(&collection);

        let modify = CollectionModify::new(Rc::clone(&collection));
        modify
            .call("modify", vec![Value::from("name = 'jack'")])
            .unwrap();
        modify
            .call("set", vec![Value::from("age"), Value::Integer(18)])
            .unwrap();
        modify
            .call("arrayAppend", vec![Value::from("tags"), Value::from("adult")])
            .unwrap();
        let result = modify.call("execute", vec![]).unwrap();
        assert_eq!(affected(&result), 1);

        let remove = CollectionRemove::new(Rc::clone(&collection));
        remove
            .call("remove", vec![Value::from("age < :cap")])
            .unwrap();
        remove
            .call("bind", vec![Value::from("cap"), Value::Integer(16)])
            .unwrap();
        let result = remove.call("execute", vec![]).unwrap();
        assert_eq!(affected(&result), 2);
    }

    #[test]
    fn test_modify_requires_operation_before_execute() {
        let (_session, collection) = fixture();
        let modify = CollectionModify::new(Rc::clone(&collection));
        modify.call("modify", vec![Value::from("age > 1")]).unwrap();
        let err = modify.call("execute", vec![]).unwrap_err();
        assert_eq!(err.kind(), "InvalidCallOrder");
        let err = modify.call("sort", vec![Value::from("age")]).unwrap_err();
        assert_eq!(err.kind(), "InvalidCallOrder");
    }

    #[test]
    fn test_expression_filter() {
        let (_session, collection) = fixture();
        seed(&collection);
        let find = CollectionFind::new(Rc::clone(&collection));
        let filter = Expression::create(vec![Value::from("age > 14")]).unwrap();
        find.call("find", vec![filter]).unwrap();
        let result = find.call("execute", vec![]).unwrap();
        let object = result.as_object().unwrap();
        let rows = object.call("all", vec![]).unwrap();
        assert_eq!(rows.as_array().unwrap().borrow().len(), 2);
    }

    #[test]
    fn test_result_bridge_from_execute() {
        let (_session, collection) = fixture();
        seed(&collection);
        let find = CollectionFind::new(Rc::clone(&collection));
        find.call("find", vec![]).unwrap();
        let result = find.call("execute", vec![]).unwrap();
        let object = result.as_object().unwrap();
        assert!(object.as_any().downcast_ref::<ResultSet>().is_some());
    }
}
