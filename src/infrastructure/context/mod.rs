//! Agent context repository implementations

mod in_memory;
mod postgres;

pub use in_memory::InMemoryContextRepository;
pub use postgres::PostgresContextRepository;
