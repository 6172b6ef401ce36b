//! SQLite database module for the buy-back engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
