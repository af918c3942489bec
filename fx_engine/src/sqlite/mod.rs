//! SQLite backend for the exchange engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
