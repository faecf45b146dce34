// Persistence layer: transactional sessions over JSON row maps.
//
// The platform owns the actual database; this plugin only needs
// begin/commit/rollback plus row CRUD, so both backends implement the same
// narrow session pair of traits.

pub mod memory;
pub mod postgres;
pub mod session;

pub use memory::{MemorySessionFactory, MemoryStore};
pub use postgres::PgSessionFactory;
pub use session::{OrmSession, PersistenceError, SessionFactory, TupleRow};
