// Script-visible modules
// The globals installed into every runtime: mysql, mysqlx and dba.

pub mod dba;
pub mod mysql;
pub mod mysqlx;

pub use dba::{ClusterAdmin, Dba, NoopClusterAdmin};
pub use mysql::MysqlModule;
pub use mysqlx::MysqlxModule;
