//! Database layer - record stores and data access

pub mod entities;
pub mod executor;
pub mod relationships;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use entities::{EntityStore, EntryLookup, Stores};
pub use executor::{create_pool, run_migrations, Executor, PgExecutor};
pub use relationships::resolve_relationships;
pub use store::RecordStore;
