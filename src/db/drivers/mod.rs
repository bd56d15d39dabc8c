// Server drivers
// Only the memory driver ships with the crate; wire-protocol drivers are
// provided by the embedding application through the same traits.

pub mod memory;

use std::rc::Rc;

use crate::db::backend::DriverRegistry;

pub use memory::{MemoryDriver, MemoryServer};

/// Registry with the memory driver claiming both connection schemes.
pub fn default_registry() -> Rc<DriverRegistry> {
    let registry = Rc::new(DriverRegistry::new());
    let driver = Rc::new(MemoryDriver::new());
    registry.register("mysql", Rc::clone(&driver) as Rc<dyn crate::db::backend::ServerDriver>);
    registry.register("mysqlx", driver);
    registry
}
