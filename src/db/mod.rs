// Database layer
// Sessions and result sets over pluggable server drivers, plus the
// navigation objects of the developer API.

pub mod backend;
pub mod drivers;
pub mod resultset;
pub mod schema;
pub mod session;

pub use backend::{
    expand_placeholders, ColumnMeta, CrudRequest, DriverRegistry, ResultBlock, ServerConnection,
    ServerDriver, StatementReply,
};
pub use drivers::{default_registry, MemoryDriver};
pub use resultset::ResultSet;
pub use schema::{Collection, Schema, Table};
pub use session::{connection_data_from_args, Session, SessionKind, SessionTracker};
