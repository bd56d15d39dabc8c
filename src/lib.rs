// mysh core library
// The cross-language heart of an interactive MySQL-family shell: one
// tagged value model, an object-bridge protocol over it, sessions and
// result sets on pluggable drivers, fluent CRUD builders, and the
// JavaScript / Python runtime adapters.

// Module declarations
pub mod bridge;
pub mod crud;
pub mod db;
pub mod error;
pub mod modules;
pub mod runtime;
pub mod shell;
pub mod uri;
pub mod uuid_gen;
pub mod value;

// ============================================================================
// Core value and bridge surface
// ============================================================================

pub use bridge::{get_member, has_member, Expression, Member, MemberKind, ObjectBridge};
pub use error::{ShellError, ShellResult};
pub use value::{
    map_table_value, BridgeRef, FunctionRef, NativeFunction, TableValue, Value, ValueMap,
    ValueType,
};

// ============================================================================
// Sessions, drivers and CRUD
// ============================================================================

pub use db::{
    default_registry, Collection, DriverRegistry, MemoryDriver, ResultSet, Schema, ServerConnection,
    ServerDriver, Session, SessionKind, SessionTracker, Table,
};
pub use uri::{strip_password, ConnectionData, DEFAULT_CLASSIC_PORT, DEFAULT_X_PORT};
pub use uuid_gen::UuidGenerator;

// ============================================================================
// Shell and runtimes
// ============================================================================

pub use modules::{ClusterAdmin, Dba, MysqlModule, MysqlxModule, NoopClusterAdmin};
pub use runtime::{JsRuntime, Mode, PyRuntime, ScriptError, ScriptRuntime};
pub use shell::Shell;
