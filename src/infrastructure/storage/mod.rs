//! Storage infrastructure - PostgreSQL connection handling

mod postgres;

pub use postgres::{connect, is_connectivity_error, map_sqlx_error, PostgresConfig};
