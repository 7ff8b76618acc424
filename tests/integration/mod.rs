//! Integration tests for text2sql.

pub mod common;
pub mod pipeline_test;
pub mod server_test;
pub mod sqlite_test;
