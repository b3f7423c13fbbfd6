//! Database backends for the provisioner.
//!
//! [`MongoAdmin`] talks to a live MongoDB instance through the official
//! driver; [`MemoryAdmin`] keeps an authentication namespace in process and
//! is what the test suites provision against.

pub mod memory;
pub mod mongo;

pub use memory::MemoryAdmin;
pub use mongo::MongoAdmin;
