// End-to-end scenarios over the shell core: SQL surface, result sets,
// script runtimes, modules and the dba façade, all against the built-in
// memory driver (or the server named by MYSQL_URI when a matching driver
// is registered by the embedding application).

use std::rc::Rc;

use mysh::{
    default_registry, get_member, ConnectionData, Mode, ObjectBridge, Session, SessionKind,
    Shell, Value,
};

fn test_uri() -> String {
    match std::env::var("MYSQL_URI") {
        Ok(uri) => {
            let mut uri = uri;
            if let Ok(pwd) = std::env::var("MYSQL_PWD") {
                if !uri.contains(':') {
                    if let Some(at) = uri.find('@') {
                        uri = format!("{}:{}{}", &uri[..at], pwd, &uri[at..]);
                    }
                }
            }
            uri
        }
        Err(_) => "root@localhost".to_string(),
    }
}

fn open_session(kind: SessionKind) -> Rc<Session> {
    let registry = default_registry();
    let data = ConnectionData::parse(&test_uri()).unwrap();
    Session::connect(kind, data, &registry).unwrap()
}

fn prepare_alpha(session: &Rc<Session>) {
    session
        .sql("create schema shell_tests", &Value::Undefined)
        .unwrap();
    session
        .sql(
            "CREATE TABLE `shell_tests`.`alpha` (`idalpha` int(11) NOT NULL, \
             `alphacol` varchar(45) DEFAULT NULL, PRIMARY KEY(`idalpha`)) \
             ENGINE = InnoDB DEFAULT CHARSET = utf8",
            &Value::Undefined,
        )
        .unwrap();
    session
        .sql(
            "INSERT INTO `shell_tests`.`alpha` VALUES(1, 'first'), (2, 'second'), (3, 'third')",
            &Value::Undefined,
        )
        .unwrap();
}

#[test]
fn sql_one_returns_single_row_map() {
    let session = open_session(SessionKind::X);
    let row = session.sql_one("select 1 as sample").unwrap();
    assert_eq!(row.descr(), "{\"sample\": 1}");
}

#[test]
fn show_databases_has_single_result_block() {
    let session = open_session(SessionKind::X);
    let result = session.sql("show databases", &Value::Undefined).unwrap();
    assert!(!session.next_result(&result).unwrap());
    // The member-method alias agrees.
    let result = session.sql("show databases", &Value::Undefined).unwrap();
    let via_member = result.call("nextResult", vec![]).unwrap();
    assert_eq!(via_member, Value::Bool(false));
}

#[test]
fn schema_lifecycle_affected_rows() {
    let session = open_session(SessionKind::X);
    let result = session
        .sql("create schema shell_tests", &Value::Undefined)
        .unwrap();
    assert_eq!(result.affected_rows(), 1);
    assert_eq!(result.warning_count(), 0);

    let result = session
        .sql("drop schema if exists shell_tests", &Value::Undefined)
        .unwrap();
    assert_eq!(result.affected_rows(), 0);

    let result = session
        .sql("drop schema if exists shell_tests", &Value::Undefined)
        .unwrap();
    assert_eq!(result.affected_rows(), 0);
}

#[test]
fn fetch_one_formats_and_counter() {
    let session = open_session(SessionKind::X);
    prepare_alpha(&session);

    let result = session
        .sql("select * from shell_tests.alpha", &Value::Undefined)
        .unwrap();

    let row = result.call("next", vec![]).unwrap();
    assert_eq!(row.descr(), "{\"alphacol\": \"first\", \"idalpha\": 1}");
    assert_eq!(result.fetched_row_count(), 1);

    let row = result.call("next", vec![Value::Bool(false)]).unwrap();
    assert_eq!(row.descr(), "{\"alphacol\": \"second\", \"idalpha\": 2}");
    assert_eq!(result.fetched_row_count(), 2);

    let row = result.call("next", vec![Value::Bool(true)]).unwrap();
    assert_eq!(row.descr(), "[3,\"third\"]");
    assert_eq!(result.fetched_row_count(), 3);

    let row = result.call("next", vec![Value::Bool(true)]).unwrap();
    assert_eq!(row.descr(), "null");
    assert_eq!(result.fetched_row_count(), 3);
}

#[test]
fn fetch_all_formats() {
    let session = open_session(SessionKind::X);
    prepare_alpha(&session);

    let expected = "[{\"alphacol\": \"first\", \"idalpha\": 1},\
                    {\"alphacol\": \"second\", \"idalpha\": 2},\
                    {\"alphacol\": \"third\", \"idalpha\": 3}]";

    let result = session
        .sql("select * from shell_tests.alpha", &Value::Undefined)
        .unwrap();
    let rows = result.call("all", vec![]).unwrap();
    assert_eq!(rows.descr(), expected);
    assert_eq!(result.fetched_row_count(), 3);

    let result = session
        .sql("select * from shell_tests.alpha", &Value::Undefined)
        .unwrap();
    let rows = result.call("all", vec![Value::Bool(true)]).unwrap();
    assert_eq!(rows.descr(), "[[1,\"first\"],[2,\"second\"],[3,\"third\"]]");
}

#[test]
fn column_metadata_has_exactly_eleven_keys() {
    let session = open_session(SessionKind::X);
    prepare_alpha(&session);

    let result = session
        .sql("select * from shell_tests.alpha", &Value::Undefined)
        .unwrap();
    let metadata = result.call("getColumnMetadata", vec![]).unwrap();
    let array = metadata.as_array().unwrap();
    assert_eq!(array.borrow().len(), 2);

    for entry in array.borrow().iter() {
        let map = entry.as_map().unwrap();
        assert_eq!(map.borrow().len(), 11);
        for key in [
            "catalog", "db", "table", "org_table", "name", "org_name", "charset", "length",
            "type", "flags", "decimal",
        ] {
            assert!(map.borrow().contains_key(key), "missing key {}", key);
        }
    }

    let first = array.borrow()[0].clone();
    let first = first.as_map().unwrap();
    assert_eq!(
        first.borrow().get("catalog").unwrap().descr(),
        "\"def\""
    );
    assert_eq!(
        first.borrow().get("db").unwrap().descr(),
        "\"shell_tests\""
    );
    assert_eq!(first.borrow().get("name").unwrap().descr(), "\"idalpha\"");
    assert_eq!(
        first.borrow().get("org_name").unwrap().descr(),
        "\"idalpha\""
    );
}

#[test]
fn multiple_result_blocks_advance_and_stop() {
    let session = open_session(SessionKind::Node);
    let result = session
        .sql("select 1 as one; select 2 as two", &Value::Undefined)
        .unwrap();
    assert_eq!(result.call("next", vec![]).unwrap().descr(), "{\"one\": 1}");
    assert!(session.next_result(&result).unwrap());
    assert_eq!(result.call("next", vec![]).unwrap().descr(), "{\"two\": 2}");
    assert!(!session.next_result(&result).unwrap());
}

#[test]
fn dir_lists_module_members_in_both_runtimes() {
    let mut shell = Shell::with_default_drivers();
    for mode in [Mode::JavaScript, Mode::Python] {
        shell.switch_mode(mode);
        let exports = shell.execute("dir(mysql)").unwrap();
        let exports = exports.as_array().unwrap();
        let names: Vec<String> = exports
            .borrow()
            .iter()
            .map(|v| v.as_string().unwrap().to_string())
            .collect();
        assert!(names.contains(&"getClassicSession".to_string()));
        assert!(names.contains(&"help".to_string()));
    }
}

#[test]
fn dir_of_dba_has_fourteen_members() {
    let mut shell = Shell::with_default_drivers();
    shell.switch_mode(Mode::Python);
    let exports = shell.execute("dir(dba)").unwrap();
    let exports = exports.as_array().unwrap();
    assert_eq!(exports.borrow().len(), 14);
    for name in [
        "checkInstanceConfiguration",
        "configureLocalInstance",
        "createCluster",
        "deleteSandboxInstance",
        "deploySandboxInstance",
        "dropMetadataSchema",
        "getCluster",
        "help",
        "killSandboxInstance",
        "rebootClusterFromCompleteOutage",
        "resetSession",
        "startSandboxInstance",
        "stopSandboxInstance",
        "verbose",
    ] {
        assert!(
            exports
                .borrow()
                .iter()
                .any(|v| v.as_string().map(|s| s == name).unwrap_or(false)),
            "missing member {}",
            name
        );
    }
}

#[test]
fn create_cluster_validation_messages() {
    let mut shell = Shell::with_default_drivers();

    let err = shell.execute("dba.createCluster('')").unwrap_err();
    assert_eq!(err.kind, "ArgumentError");
    assert_eq!(
        err.message,
        "Dba.createCluster: The Cluster name cannot be empty"
    );

    let err = shell
        .execute("dba.createCluster('c', {memberSslMode: 'BAD'})")
        .unwrap_err();
    assert_eq!(
        err.message,
        "Invalid value for memberSslMode option. Supported values: AUTO,DISABLED,REQUIRED."
    );

    let err = shell
        .execute("dba.createCluster('c', {memberSslMode: 'AUTO', adoptFromGR: true})")
        .unwrap_err();
    assert_eq!(
        err.message,
        "Cannot use memberSslMode option if adoptFromGR is set to true."
    );

    let cluster = shell.execute("dba.createCluster('prod')").unwrap();
    assert_eq!(
        cluster.as_object().unwrap().append_descr(),
        "<Cluster:prod>"
    );
}

#[test]
fn expression_prints_canonically() {
    let mut shell = Shell::with_default_drivers();
    shell.execute("e = mysqlx.expr('5+6')").unwrap();
    shell.execute("print(e)").unwrap();
    assert_eq!(shell.take_output(), vec!["<Expression>".to_string()]);
}

#[test]
fn session_prints_canonically_from_scripts() {
    let mut shell = Shell::with_default_drivers();
    shell
        .execute("session = mysqlx.getSession('root:secret@localhost:33060')")
        .unwrap();
    shell.execute("print(session)").unwrap();
    assert_eq!(
        shell.take_output(),
        vec!["<XSession:root@localhost:33060>".to_string()]
    );

    shell.switch_mode(Mode::Python);
    shell
        .execute("session = mysqlx.getNodeSession({'host': 'localhost', 'port': 33060, 'schema': 'world', 'dbUser': 'root', 'dbPassword': 'secret'})")
        .unwrap();
    shell.execute("print(session)").unwrap();
    assert_eq!(
        shell.take_output(),
        vec!["<NodeSession:root@localhost:33060/world>".to_string()]
    );
}

#[test]
fn document_crud_through_javascript() {
    let mut shell = Shell::with_default_drivers();
    shell
        .execute("session = mysqlx.getNodeSession('root@localhost')")
        .unwrap();
    shell.execute("session.sql('create schema shop')").unwrap();
    shell.execute("db = session.getSchema('shop')").unwrap();
    shell.execute("items = db.getCollection('items')").unwrap();
    shell
        .execute("items.add([{name: 'nut', qty: 4}, {name: 'bolt', qty: 1}]).execute()")
        .unwrap();

    let rows = shell
        .execute("items.find('qty > 2').execute().all()")
        .unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.borrow().len(), 1);
    assert!(rows.borrow()[0].descr().contains("\"nut\""));

    // Out-of-order chaining surfaces as an error in the script.
    let err = shell
        .execute("items.find().offset(1)")
        .unwrap_err();
    assert_eq!(err.kind, "InvalidCallOrder");
}

#[test]
fn table_crud_through_javascript() {
    let mut shell = Shell::with_default_drivers();
    shell
        .execute("session = mysqlx.getNodeSession('root@localhost')")
        .unwrap();
    shell.execute("session.sql('create schema s')").unwrap();
    shell
        .execute("session.sql('create table s.people (name varchar(50), age int)')")
        .unwrap();
    shell.execute("t = session.getSchema('s').getTable('people')").unwrap();
    shell
        .execute("t.insert('name', 'age').values('jack', 17).values('adam', 15).execute()")
        .unwrap();

    let row = shell
        .execute("t.select().where('age > 16').execute().next()")
        .unwrap();
    assert_eq!(row.descr(), "{\"age\": 17, \"name\": \"jack\"}");

    shell
        .execute("t.update().set('age', 18).where(\"name = 'jack'\").execute()")
        .unwrap();
    let row = shell
        .execute("t.select('age').where(\"name = 'jack'\").execute().next()")
        .unwrap();
    assert_eq!(row.descr(), "{\"age\": 18}");
}

#[test]
fn unknown_members_fail_uniformly() {
    let session = open_session(SessionKind::X);
    let bridge: mysh::BridgeRef = session;
    let err = get_member(&bridge, "no_such_member").unwrap_err();
    assert_eq!(err.kind(), "UnknownMember");
}

#[test]
fn close_is_idempotent_and_final() {
    let mut shell = Shell::with_default_drivers();
    shell
        .execute("session = mysqlx.getSession('root@localhost')")
        .unwrap();
    shell.execute("session.close()").unwrap();
    shell.execute("session.close()").unwrap();
    let err = shell.execute("session.sql('select 1')").unwrap_err();
    assert_eq!(err.kind, "SessionClosed");
}

#[test]
fn session_members_banner() {
    let session = open_session(SessionKind::Classic);
    assert_eq!(session.members_banner(), "<Session Members: 7>");
}
