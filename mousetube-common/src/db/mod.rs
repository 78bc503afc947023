//! Database access layer

pub mod init;

pub use init::{create_all_tables, init_database};
