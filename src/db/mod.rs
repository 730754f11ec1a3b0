//! Database module: DDL and the MySQL admin session it runs on.
//!
//! Layout:
//! - `statements.rs`: the fixed, idempotent provisioning statements
//! - `mysql.rs`: connector/session seams and their sqlx implementation

pub mod mysql;
pub mod statements;

pub use mysql::{MySqlConnector, SchemaConnector, SchemaSession};
pub use statements::Statement;
