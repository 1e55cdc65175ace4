//! SQLite backend for the ledger store.
mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteLedger;
