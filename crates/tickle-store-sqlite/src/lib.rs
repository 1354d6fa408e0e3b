//! SQLite backend for the Tickle ticket store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Multi-statement operations (adding to a
//! cart, purchasing a cart, orchestra registration) run inside one SQLite
//! transaction each.

mod cart;
mod catalog;
mod encode;
mod orchestra;
mod people;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
