//! DDL for provisioning and removing an application database on MySQL.
//!
//! Every statement is idempotent (`IF [NOT] EXISTS`), so a failed run can be
//! repaired by simply running the same lifecycle event again.

use std::fmt;

use crate::config::APP_DATABASE_CHARSET;

/// One SQL statement plus a short label for logs and errors.
///
/// `Debug` prints only the label; the `CREATE USER` text
/// contains the application password.
#[derive(Clone, PartialEq, Eq)]
pub struct Statement {
    pub label: &'static str,
    pub sql: String,
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement").field("label", &self.label).finish()
    }
}

/// Back-tick quote an identifier, doubling embedded back-ticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Single-quote a string literal, escaping backslashes and quotes.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("''"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// `'<user>'@'%'`
fn account(username: &str) -> String {
    format!("{}@'%'", quote_literal(username))
}

pub fn create_database(database: &str) -> Statement {
    Statement {
        label: "create database",
        sql: format!(
            "CREATE DATABASE IF NOT EXISTS {} CHARACTER SET {APP_DATABASE_CHARSET};",
            quote_identifier(database)
        ),
    }
}

pub fn create_user(username: &str, password: &str) -> Statement {
    Statement {
        label: "create user",
        sql: format!(
            "CREATE USER IF NOT EXISTS {} IDENTIFIED WITH caching_sha2_password BY {};",
            account(username),
            quote_literal(password)
        ),
    }
}

pub fn grant_database(database: &str, username: &str) -> Statement {
    Statement {
        label: "grant database privileges",
        sql: format!(
            "GRANT ALL ON {}.* TO {};",
            quote_identifier(database),
            account(username)
        ),
    }
}

/// Lets the app user provision per-tenant schemas and users on its own.
pub fn grant_create_user(username: &str) -> Statement {
    Statement {
        label: "grant create user",
        sql: format!(
            "GRANT CREATE USER ON *.* TO {} WITH GRANT OPTION;",
            account(username)
        ),
    }
}

pub fn drop_database(database: &str) -> Statement {
    Statement {
        label: "drop database",
        sql: format!("DROP DATABASE IF EXISTS {};", quote_identifier(database)),
    }
}

pub fn drop_user(username: &str) -> Statement {
    Statement {
        label: "drop user",
        sql: format!("DROP USER IF EXISTS {};", account(username)),
    }
}

/// Statements for Create and Update, in execution order.
pub fn create_schema(database: &str, username: &str, password: &str) -> Vec<Statement> {
    vec![
        create_database(database),
        create_user(username, password),
        grant_database(database, username),
        grant_create_user(username),
    ]
}

/// Statements for Delete, in execution order.
pub fn delete_schema(database: &str, username: &str) -> Vec<Statement> {
    vec![drop_database(database), drop_user(username)]
}
